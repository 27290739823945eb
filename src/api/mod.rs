//! HTTP surface under `/api`.

pub mod generate;
pub mod images;
pub mod prompts;
pub mod providers;
pub mod stats;

use std::sync::Arc;

use axum::{
    Router,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    routing::{get, post, put},
};

use crate::{
    error::ApiError,
    records::{ImageRepository, PromptRepository},
    service::GenerationService,
    storage::ObjectStore,
};

#[derive(Clone)]
pub struct AppState {
    pub generation: GenerationService,
    pub images: Arc<dyn ImageRepository>,
    pub prompts: Arc<dyn PromptRepository>,
}

impl AppState {
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        self.generation.store()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/generate", post(generate::generate))
        .route("/api/images", get(images::list_images))
        .route("/api/images/{id}", get(images::get_image))
        .route("/api/stats", get(stats::stats))
        .route("/api/prompts", get(prompts::list_prompts).post(prompts::create_prompt))
        .route(
            "/api/prompts/{id}",
            put(prompts::update_prompt).delete(prompts::delete_prompt),
        )
        .route("/api/providers", get(providers::providers))
        .with_state(state)
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}
