use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::{
    error::ApiError,
    params::GenerationRequest,
    providers::{
        ImageProvider, ImagesResponse, ProviderReply, ensure_success, redact_prompt,
        transport_error,
    },
};

pub const PROVIDER_NAME: &str = "Together AI";
pub const FLUX_SCHNELL_FREE: &str = "black-forest-labs/FLUX.1-schnell-Free";
pub const FLUX_PRO: &str = "black-forest-labs/FLUX.1.1-pro";

const FAST_MARKERS: &[&str] = &["schnell", "turbo", "lightning"];
const FAST_MAX_STEPS: u32 = 4;
const FAST_DEFAULT_STEPS: u32 = 4;
const DEFAULT_STEPS: u32 = 25;

/// Distilled models that only run with a handful of steps.
pub fn is_fast_model(model: &str) -> bool {
    let lowered = model.to_ascii_lowercase();
    FAST_MARKERS.iter().any(|marker| lowered.contains(marker))
}

pub fn resolve_steps(model: &str, requested: Option<u32>) -> u32 {
    if is_fast_model(model) {
        match requested {
            Some(steps) if (1..=FAST_MAX_STEPS).contains(&steps) => steps,
            _ => FAST_DEFAULT_STEPS,
        }
    } else {
        requested.unwrap_or(DEFAULT_STEPS)
    }
}

#[derive(Debug, Serialize)]
pub struct TogetherImageRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub n: u32,
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance_scale: Option<f64>,
}

pub fn build_request<'a>(model: &'a str, request: &'a GenerationRequest) -> TogetherImageRequest<'a> {
    let fast = is_fast_model(model);
    let steps = resolve_steps(model, request.steps);
    if fast {
        tracing::info!(
            model,
            steps,
            requested = ?request.steps,
            "fast model detected, step count enforced"
        );
    }
    TogetherImageRequest {
        model,
        prompt: &request.prompt,
        n: request.num_outputs.max(1),
        width: request.width,
        height: request.height,
        steps,
        negative_prompt: request.negative_prompt.as_deref(),
        seed: request.seed,
        guidance_scale: if fast { None } else { request.guidance_scale },
    }
}

pub struct TogetherProvider {
    client: Client,
    base_url: String,
    model: String,
}

impl TogetherProvider {
    pub fn new(client: Client, base_url: &str, model: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl ImageProvider for TogetherProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<ProviderReply, ApiError> {
        let body = build_request(&self.model, request);
        let steps = body.steps;
        let payload = serde_json::to_value(&body).map_err(|err| ApiError::Upstream {
            provider: PROVIDER_NAME,
            message: err.to_string(),
        })?;
        tracing::info!(model = %self.model, payload = %redact_prompt(&payload), "calling Together AI image API");

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
                detail: "No valid images returned from API.".to_string(),
            });
        }
        Ok(ProviderReply {
            images,
            model: self.model.clone(),
            steps: Some(steps),
        })
    }
}
