use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
};
use serde::Serialize;

use crate::{
    api::AppState,
    error::ApiError,
    records::{ImageFilter, StoredImage},
    storage::ObjectStore,
};

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 200;

#[derive(Debug, Serialize)]
pub struct ImageItem {
    #[serde(flatten)]
    pub image: StoredImage,
    pub public_url: String,
}

impl ImageItem {
    pub fn new(image: StoredImage, store: &dyn ObjectStore) -> Self {
        let public_url = store.public_url(&image.image_url);
        Self { image, public_url }
    }
}

#[derive(Debug, Serialize)]
pub struct ImageList {
    pub images: Vec<ImageItem>,
    pub limit: usize,
    pub offset: usize,
}

/// Fills in the page defaults and clamps the page size.
pub fn page(mut filter: ImageFilter) -> ImageFilter {
    let limit = filter.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    filter.limit = Some(limit);
    filter.offset = Some(filter.offset.unwrap_or(0));
    filter
}

pub async fn list_images(
    State(state): State<AppState>,
    query: Result<Query<ImageFilter>, QueryRejection>,
) -> Result<Json<ImageList>, ApiError> {
    let Query(filter) = query?;
    let filter = page(filter);
    let rows = state.images.list(&filter).await?;
    let store = state.store();
    Ok(Json(ImageList {
        images: rows
            .into_iter()
            .map(|image| ImageItem::new(image, store.as_ref()))
            .collect(),
        limit: filter.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        offset: filter.offset.unwrap_or(0),
    }))
}

pub async fn get_image(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<ImageItem>, ApiError> {
    let Path(id) = id?;
    let image = state
        .images
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Image {id} not found")))?;
    Ok(Json(ImageItem::new(image, state.store().as_ref())))
}
