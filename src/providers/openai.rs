use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::{
    capabilities::OPENAI_SIZES,
    error::ApiError,
    params::GenerationRequest,
    providers::{
        ImageProvider, ImagesResponse, ProviderReply, ensure_success, redact_prompt,
        transport_error,
    },
};

pub const PROVIDER_NAME: &str = "OpenAI";
pub const OPENAI_MODEL: &str = "gpt-image-1";
const QUALITY: &str = "medium";

/// Outgoing body. Negative prompt, steps, guidance and seed have no slot here.
#[derive(Debug, Serialize)]
pub struct OpenAiImageRequest<'a> {
    pub model: &'static str,
    pub prompt: &'a str,
    pub n: u32,
    pub size: String,
    pub quality: &'static str,
}

pub fn build_request(request: &GenerationRequest) -> Result<OpenAiImageRequest<'_>, ApiError> {
    let size = format!("{}x{}", request.width, request.height);
    if !OPENAI_SIZES.iter().any(|allowed| *allowed == size) {
        tracing::warn!(%size, "rejected size for OpenAI image generation");
        return Err(ApiError::InvalidRequest(format!(
            "Invalid dimensions {size} for OpenAI. Use {}.",
            OPENAI_SIZES.join(", ")
        )));
    }
    Ok(OpenAiImageRequest {
        model: OPENAI_MODEL,
        prompt: &request.prompt,
        n: request.num_outputs.max(1),
        size,
        quality: QUALITY,
    })
}

pub struct OpenAiProvider {
    client: Client,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ImageProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<ProviderReply, ApiError> {
        let body = build_request(request)?;
        let payload = serde_json::to_value(&body).map_err(|err| ApiError::Upstream {
            provider: PROVIDER_NAME,
            message: err.to_string(),
        })?;
        tracing::info!(payload = %redact_prompt(&payload), "calling OpenAI image API");

        let response = self
            .client
            .post(format!("{}/v1/images/generations", self.base_url))
            .bearer_auth(request.api_key.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|err| transport_error(PROVIDER_NAME, err))?;
        let response = ensure_success(PROVIDER_NAME, response).await?;
        let parsed: ImagesResponse = response.json().await.map_err(|err| {
            ApiError::UnexpectedResponse {
                provider: PROVIDER_NAME,
                detail: err.to_string(),
            }
        })?;

        let images = parsed.into_sources();
        if images.is_empty() {
            return Err(ApiError::UnexpectedResponse {
                provider: PROVIDER_NAME,
                detail: "response contained no images".to_string(),
            });
        }
        tracing::info!(count = images.len(), "OpenAI returned images");
        Ok(ProviderReply {
            images,
            model: OPENAI_MODEL.to_string(),
            steps: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderTarget;
    use secrecy::SecretString;

    fn request(width: u32, height: u32) -> GenerationRequest {
        GenerationRequest {
            prompt: "a cat".into(),
            negative_prompt: Some("dogs".into()),
            width,
            height,
            num_outputs: 1,
            style: None,
            seed: Some(7),
            steps: Some(30),
            guidance_scale: Some(7.0),
            target: ProviderTarget::OpenAi,
            api_key: SecretString::from("sk-test"),
        }
    }

    #[test]
    fn payload_never_carries_unsupported_fields() {
        let req = request(1024, 1024);
        let body = build_request(&req).unwrap();
        let payload = serde_json::to_value(&body).unwrap();
        let object = payload.as_object().unwrap();
        let mut keys: Vec<_> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["model", "n", "prompt", "quality", "size"]);
        assert_eq!(payload["size"], "1024x1024");
        assert_eq!(payload["model"], OPENAI_MODEL);
    }

    #[test]
    fn sizes_outside_allow_list_are_rejected() {
        let err = build_request(&request(1024, 768)).unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
        assert!(err.to_string().contains("1024x768"));
        assert!(build_request(&request(1792, 1024)).is_ok());
        assert!(build_request(&request(1024, 1792)).is_ok());
    }
}
