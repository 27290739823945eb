use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Every failure a generation or browsing request can surface to a caller.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed fields the caller can fix.
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Provider '{0}' not supported yet.")]
    UnsupportedProvider(String),

    /// The caller has to supply a key in their settings.
    #[error("{0}")]
    MissingUserKey(String),

    /// The server environment lacks a credential it is expected to hold.
    #[error("{0}")]
    Misconfigured(String),

    #[error("Failed to generate image via {provider}: {message}")]
    Upstream {
        provider: &'static str,
        message: String,
    },

    #[error("Received unexpected response format or no images from {provider} API: {detail}")]
    UnexpectedResponse {
        provider: &'static str,
        detail: String,
    },

    /// Image download or storage upload after a successful generation.
    #[error("Failed to process images: {0}")]
    PostProcess(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Record(#[from] RecordError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_)
            | ApiError::UnsupportedProvider(_)
            | ApiError::MissingUserKey(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Record(RecordError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Record(RecordError::Invalid(_)) => StatusCode::BAD_REQUEST,
            ApiError::Misconfigured(_)
            | ApiError::Upstream { .. }
            | ApiError::UnexpectedResponse { .. }
            | ApiError::PostProcess(_)
            | ApiError::Record(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Failures of the relational store holding image rows and saved prompts.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("{0}")]
    Invalid(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Database Permission Error: {0}. Please ensure policies allow this operation.")]
    PermissionDenied(String),

    #[error("Database Error: {0}")]
    Backend(String),
}

impl From<std::io::Error> for RecordError {
    fn from(err: std::io::Error) -> Self {
        RecordError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for RecordError {
    fn from(err: serde_json::Error) -> Self {
        RecordError::Backend(err.to_string())
    }
}

impl From<reqwest::Error> for RecordError {
    fn from(err: reqwest::Error) -> Self {
        RecordError::Backend(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(ErrorResponse { error: message.to_string() })).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::info!(error = %self, "request rejected");
        }
        json_error(status, &self.to_string())
    }
}
