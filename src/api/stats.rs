use axum::{Json, extract::State};

use crate::{
    api::AppState,
    error::ApiError,
    records::{ImageFilter, UsageSummary, usage_summary},
};

pub async fn stats(State(state): State<AppState>) -> Result<Json<UsageSummary>, ApiError> {
    let images = state.images.list(&ImageFilter::default()).await?;
    let prompts = state.prompts.list().await?;
    Ok(Json(usage_summary(&images, prompts.len())))
}
