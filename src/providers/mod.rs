//! Provider adapters and the dispatch table that selects them.

pub mod openai;
pub mod replicate;
pub mod togetherai;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::{config::ProviderEndpoints, error::ApiError, params::GenerationRequest};

pub use openai::OpenAiProvider;
pub use replicate::{ModelFamily, ReplicateModel, ReplicateProvider};
pub use togetherai::TogetherProvider;

/// Where a Together AI key may come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPolicy {
    /// Server key first, then the caller's.
    ServerFirst,
    /// Only the caller's key.
    UserOnly,
}

/// Backend selected by a request's `provider` key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderTarget {
    OpenAi,
    TogetherAi { model: String, key_policy: KeyPolicy },
    Replicate { model: ReplicateModel },
}

impl ProviderTarget {
    pub fn parse(provider: &str) -> Result<Self, ApiError> {
        let provider = provider.trim();
        match provider {
            "openai" => Ok(ProviderTarget::OpenAi),
            "togetherai" => Ok(ProviderTarget::TogetherAi {
                model: togetherai::FLUX_SCHNELL_FREE.to_string(),
                key_policy: KeyPolicy::ServerFirst,
            }),
            togetherai::FLUX_PRO => Ok(ProviderTarget::TogetherAi {
                model: togetherai::FLUX_PRO.to_string(),
                key_policy: KeyPolicy::UserOnly,
            }),
            other if other.contains('/') => Ok(ProviderTarget::Replicate {
                model: ReplicateModel::parse(other)?,
            }),
            other => Err(ApiError::UnsupportedProvider(other.to_string())),
        }
    }

    /// Provider name as stored on image rows.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderTarget::OpenAi => openai::PROVIDER_NAME,
            ProviderTarget::TogetherAi { .. } => togetherai::PROVIDER_NAME,
            ProviderTarget::Replicate { .. } => replicate::PROVIDER_NAME,
        }
    }

    /// Short lowercase tag used in storage paths.
    pub fn slug(&self) -> &'static str {
        match self {
            ProviderTarget::OpenAi => "openai",
            ProviderTarget::TogetherAi { .. } => "togetherai",
            ProviderTarget::Replicate { .. } => "replicate",
        }
    }

    pub fn adapter(&self, client: &Client, endpoints: &ProviderEndpoints) -> Box<dyn ImageProvider> {
        match self {
            ProviderTarget::OpenAi => Box::new(OpenAiProvider::new(client.clone(), &endpoints.openai)),
            ProviderTarget::TogetherAi { model, .. } => Box::new(TogetherProvider::new(
                client.clone(),
                &endpoints.together,
                model,
            )),
            ProviderTarget::Replicate { model } => Box::new(ReplicateProvider::new(
                client.clone(),
                &endpoints.replicate,
                model.clone(),
            )),
        }
    }
}

/// An image as handed back by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Url(String),
    Inline {
        b64: String,
        content_type: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct ProviderReply {
    pub images: Vec<ImageSource>,
    /// Model that produced the images, as recorded on the image row.
    pub model: String,
    /// Step count actually sent upstream.
    pub steps: Option<u32>,
}

#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, request: &GenerationRequest) -> Result<ProviderReply, ApiError>;
}

/// `{ data: [{ url | b64_json }] }`, shared by OpenAI and Together AI.
#[derive(Debug, Deserialize)]
pub(crate) struct ImagesResponse {
    data: Option<Vec<ImageDatum>>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    url: Option<String>,
    b64_json: Option<String>,
}

impl ImagesResponse {
    pub(crate) fn into_sources(self) -> Vec<ImageSource> {
        self.data
            .unwrap_or_default()
            .into_iter()
            .filter_map(|datum| match (datum.url, datum.b64_json) {
                (Some(url), _) if !url.trim().is_empty() => Some(ImageSource::Url(url)),
                (_, Some(b64)) if !b64.is_empty() => Some(ImageSource::Inline {
                    b64,
                    content_type: None,
                }),
                _ => None,
            })
            .collect()
    }
}

pub(crate) fn transport_error(provider: &'static str, err: reqwest::Error) -> ApiError {
    ApiError::Upstream {
        provider,
        message: err.to_string(),
    }
}

/// Passes 2xx responses through and turns anything else into an upstream error
/// carrying the provider's own message when it sent one.
pub(crate) async fn ensure_success(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ApiError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    Err(ApiError::Upstream {
        provider,
        message: format!("{} (HTTP {status})", upstream_message(&text)),
    })
}

fn upstream_message(text: &str) -> String {
    let Ok(payload) = serde_json::from_str::<Value>(text) else {
        return text.trim().to_string();
    };
    let candidates = [
        payload.pointer("/error/message"),
        payload.get("error"),
        payload.get("detail"),
        payload.get("message"),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(|value| value.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| text.trim().to_string())
}

/// Copy of an outgoing payload with prompt text removed, for logging.
pub(crate) fn redact_prompt(payload: &Value) -> Value {
    let mut redacted = payload.clone();
    for pointer in ["/prompt", "/input/prompt"] {
        if let Some(slot) = redacted.pointer_mut(pointer) {
            *slot = Value::String("[PROMPT REDACTED]".to_string());
        }
    }
    redacted
}
