use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    error::ApiError,
    params::GenerationRequest,
    providers::{ImageProvider, ImageSource, ProviderReply, ensure_success, redact_prompt, transport_error},
};

pub const PROVIDER_NAME: &str = "Replicate";
const LIGHTNING_STEPS: u32 = 4;
const ASPECT_TOLERANCE: f64 = 0.1;
const ASPECT_RATIOS: &[(&str, f64)] = &[
    ("16:9", 16.0 / 9.0),
    ("9:16", 9.0 / 16.0),
    ("3:2", 3.0 / 2.0),
    ("2:3", 2.0 / 3.0),
];

/// Model families with their own input naming on Replicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    SdxlLightning,
    Kandinsky22,
    StabilitySdxl,
    StableDiffusion,
    Imagen3,
    /// Anything unrecognized; sent with common parameter names.
    Generic,
}

const FAMILY_PREFIXES: &[(&str, ModelFamily)] = &[
    ("bytedance/sdxl-lightning-4step", ModelFamily::SdxlLightning),
    ("ai-forever/kandinsky-2.2", ModelFamily::Kandinsky22),
    ("stability-ai/sdxl", ModelFamily::StabilitySdxl),
    ("stability-ai/stable-diffusion", ModelFamily::StableDiffusion),
    ("google/imagen-3", ModelFamily::Imagen3),
];

impl ModelFamily {
    pub fn detect(model_id: &str) -> Self {
        FAMILY_PREFIXES
            .iter()
            .find(|(prefix, _)| model_id.starts_with(prefix))
            .map(|(_, family)| *family)
            .unwrap_or(ModelFamily::Generic)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicateModel {
    pub owner: String,
    pub name: String,
    pub version: Option<String>,
    pub family: ModelFamily,
}

impl ReplicateModel {
    /// Parses `owner/name[:version]`, with an optional `replicate/` prefix.
    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        let id = raw.trim().strip_prefix("replicate/").unwrap_or(raw.trim());
        let (path, version) = match id.split_once(':') {
            Some((path, version)) => (path, Some(version.to_string())),
            None => (id, None),
        };
        let invalid = || ApiError::InvalidRequest(format!("Invalid Replicate model id '{raw}'."));
        let (owner, name) = path.split_once('/').ok_or_else(invalid)?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(invalid());
        }
        if version.as_deref().is_some_and(str::is_empty) {
            return Err(invalid());
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
            version,
            family: ModelFamily::detect(id),
        })
    }

    pub fn id(&self) -> String {
        match &self.version {
            Some(version) => format!("{}/{}:{version}", self.owner, self.name),
            None => format!("{}/{}", self.owner, self.name),
        }
    }
}

/// Nearest supported aspect ratio, `1:1` when none is within tolerance.
pub fn aspect_ratio(width: u32, height: u32) -> &'static str {
    let ratio = width as f64 / height.max(1) as f64;
    ASPECT_RATIOS
        .iter()
        .map(|(label, target)| (*label, (ratio - target).abs()))
        .filter(|(_, distance)| *distance < ASPECT_TOLERANCE)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(label, _)| label)
        .unwrap_or("1:1")
}

/// Model input for a request, plus the step count it carries.
pub fn build_input(family: ModelFamily, request: &GenerationRequest) -> (Value, Option<u32>) {
    let mut input = json!({ "prompt": request.prompt });
    if let Some(negative) = request.negative_prompt.as_deref() {
        input["negative_prompt"] = json!(negative);
    }
    if let Some(seed) = request.seed {
        input["seed"] = json!(seed);
    }
    input["num_outputs"] = json!(request.num_outputs);

    let mut steps = request.steps;
    match family {
        ModelFamily::SdxlLightning => {
            input["width"] = json!(request.width);
            input["height"] = json!(request.height);
            input["num_inference_steps"] = json!(LIGHTNING_STEPS);
            steps = Some(LIGHTNING_STEPS);
            if let Some(scale) = request.guidance_scale {
                input["guidance_scale"] = json!(scale);
            }
        }
        ModelFamily::Kandinsky22 | ModelFamily::StableDiffusion | ModelFamily::Generic => {
            if family == ModelFamily::Generic {
                tracing::warn!("unknown Replicate model family, using default parameter names");
            }
            input["width"] = json!(request.width);
            input["height"] = json!(request.height);
            if let Some(value) = request.steps {
                input["num_inference_steps"] = json!(value);
            }
            if let Some(scale) = request.guidance_scale {
                input["guidance_scale"] = json!(scale);
            }
        }
        ModelFamily::StabilitySdxl => {
            input["width"] = json!(request.width);
            input["height"] = json!(request.height);
            if let Some(value) = request.steps {
                input["num_inference_steps"] = json!(value);
            }
            if let Some(scale) = request.guidance_scale {
                input["guidance_scale"] = json!(scale);
            }
            input["refine"] = json!("no_refiner");
            input["apply_watermark"] = json!(false);
        }
        ModelFamily::Imagen3 => {
            input["aspect_ratio"] = json!(aspect_ratio(request.width, request.height));
            steps = None;
        }
    }
    (input, steps)
}

#[derive(Debug, Deserialize)]
struct Prediction {
    status: Option<String>,
    output: Option<Value>,
    error: Option<Value>,
}

fn output_urls(prediction: Prediction) -> Result<Vec<ImageSource>, ApiError> {
    if let Some(status) = prediction.status.as_deref() {
        if status == "failed" || status == "canceled" {
            let message = prediction
                .error
                .as_ref()
                .and_then(Value::as_str)
                .unwrap_or(status)
                .to_string();
            return Err(ApiError::Upstream {
                provider: PROVIDER_NAME,
                message,
            });
        }
    }
    let unexpected = |detail: String| ApiError::UnexpectedResponse {
        provider: PROVIDER_NAME,
        detail,
    };
    let Some(Value::Array(items)) = prediction.output else {
        return Err(unexpected(format!(
            "prediction output is not a list (status: {})",
            prediction.status.unwrap_or_default()
        )));
    };
    let urls: Vec<ImageSource> = items
        .iter()
        .map(|item| item.as_str().map(|url| ImageSource::Url(url.to_string())))
        .collect::<Option<_>>()
        .ok_or_else(|| unexpected("prediction output contains non-string items".to_string()))?;
    if urls.is_empty() {
        return Err(unexpected("prediction output is empty".to_string()));
    }
    Ok(urls)
}

pub struct ReplicateProvider {
    client: Client,
    base_url: String,
    model: ReplicateModel,
}

impl ReplicateProvider {
    pub fn new(client: Client, base_url: &str, model: ReplicateModel) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    fn prediction_request(&self, input: Value) -> (String, Value) {
        match &self.model.version {
            Some(version) => (
                format!("{}/v1/predictions", self.base_url),
                json!({ "version": version, "input": input }),
            ),
            None => (
                format!(
                    "{}/v1/models/{}/{}/predictions",
                    self.base_url, self.model.owner, self.model.name
                ),
                json!({ "input": input }),
            ),
        }
    }
}

#[async_trait]
impl ImageProvider for ReplicateProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<ProviderReply, ApiError> {
        let (input, steps) = build_input(self.model.family, request);
        let (url, payload) = self.prediction_request(input);
        tracing::info!(model = %self.model.id(), payload = %redact_prompt(&payload), "running Replicate prediction");

        let response = self
            .client
            .post(url)
            .bearer_auth(request.api_key.expose_secret())
            .header("Prefer", "wait")
            .json(&payload)
            .send()
            .await
            .map_err(|err| transport_error(PROVIDER_NAME, err))?;
        let response = ensure_success(PROVIDER_NAME, response).await?;
        let prediction: Prediction =
            response
                .json()
                .await
                .map_err(|err| ApiError::UnexpectedResponse {
                    provider: PROVIDER_NAME,
                    detail: err.to_string(),
                })?;

        let images = output_urls(prediction)?;
        tracing::info!(count = images.len(), "Replicate prediction finished");
        Ok(ProviderReply {
            images,
            model: self.model.id(),
            steps,
        })
    }
}
