use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
};
use secrecy::SecretString;
use serde::Serialize;

use crate::{
    api::AppState,
    error::ApiError,
    params::{ApiKeyOverrides, GenerateBody},
};

pub const OPENAI_KEY_HEADER: &str = "x-openai-api-key";
pub const TOGETHER_KEY_HEADER: &str = "x-togetherai-api-key";

impl ApiKeyOverrides {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(|value| SecretString::from(value.to_string()))
        };
        Self {
            openai: read(OPENAI_KEY_HEADER),
            together: read(TOGETHER_KEY_HEADER),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub images: Vec<String>,
}

pub async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<GenerateBody>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let Json(body) = body?;
    let overrides = ApiKeyOverrides::from_headers(&headers);
    let outcome = state.generation.generate(body, &overrides).await?;
    Ok(Json(GenerateResponse {
        images: outcome.images,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use secrecy::ExposeSecret;

    #[test]
    fn blank_headers_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(OPENAI_KEY_HEADER, HeaderValue::from_static(" sk-user "));
        headers.insert(TOGETHER_KEY_HEADER, HeaderValue::from_static("  "));
        let overrides = ApiKeyOverrides::from_headers(&headers);
        assert_eq!(
            overrides.openai.as_ref().map(|key| key.expose_secret().to_string()),
            Some("sk-user".to_string())
        );
        assert!(overrides.together.is_none());
    }
}
