use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    api::AppState,
    error::ApiError,
    records::{PromptDraft, SavedPrompt},
};

#[derive(Debug, Serialize)]
pub struct PromptList {
    pub prompts: Vec<SavedPrompt>,
}

pub async fn list_prompts(State(state): State<AppState>) -> Result<Json<PromptList>, ApiError> {
    let prompts = state.prompts.list().await?;
    Ok(Json(PromptList { prompts }))
}

pub async fn create_prompt(
    State(state): State<AppState>,
    body: Result<Json<PromptDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<SavedPrompt>), ApiError> {
    let Json(draft) = body?;
    let prompt = state.prompts.create(draft).await?;
    tracing::info!(id = %prompt.id, "saved prompt");
    Ok((StatusCode::CREATED, Json(prompt)))
}

pub async fn update_prompt(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<PromptDraft>, JsonRejection>,
) -> Result<Json<SavedPrompt>, ApiError> {
    let Path(id) = id?;
    let Json(draft) = body?;
    Ok(Json(state.prompts.update(id, draft).await?))
}

pub async fn delete_prompt(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    state.prompts.delete(id).await?;
    tracing::info!(%id, "deleted prompt");
    Ok(StatusCode::NO_CONTENT)
}
