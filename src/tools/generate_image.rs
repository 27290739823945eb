use rmcp::{
    ErrorData as McpError,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content},
    schemars::JsonSchema,
};
use serde::{Deserialize, Serialize};

use crate::{
    params::{ApiKeyOverrides, GenerateBody},
    pipeline::PersistenceOutcome,
    service::GenerationService,
    tools::{to_json_text, to_mcp_error},
};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GenerateImageRequest {
    #[schemars(description = "Image description")]
    pub prompt: String,
    #[schemars(
        description = "Provider key: openai, togetherai, black-forest-labs/FLUX.1.1-pro, or a Replicate model id such as stability-ai/sdxl"
    )]
    pub provider: String,
    #[schemars(description = "Width in pixels, e.g. 1024")]
    pub width: u32,
    #[schemars(description = "Height in pixels, e.g. 1024")]
    pub height: u32,
    #[schemars(description = "Things the image should not contain")]
    pub negative_prompt: Option<String>,
    #[schemars(description = "Number of images, default 1")]
    pub num_outputs: Option<u32>,
    #[schemars(description = "Style id such as anime, cinematic or 3d-cartoon")]
    pub style: Option<String>,
    pub seed: Option<u64>,
    #[schemars(description = "Sampling steps")]
    pub steps: Option<u32>,
    pub guidance_scale: Option<f64>,
}

impl From<GenerateImageRequest> for GenerateBody {
    fn from(request: GenerateImageRequest) -> Self {
        GenerateBody {
            prompt: Some(request.prompt),
            provider: Some(request.provider),
            width: Some(request.width),
            height: Some(request.height),
            negative_prompt: request.negative_prompt,
            num_outputs: request.num_outputs,
            style: request.style,
            seed: request.seed,
            steps: request.steps,
            guidance_scale: request.guidance_scale,
        }
    }
}

#[derive(Debug, Serialize)]
struct GeneratedImage {
    url: String,
    storage_path: String,
    image_count: usize,
    persistence: PersistenceOutcome,
}

/// Generates with server-held credentials only; callers cannot pass keys.
pub async fn generate_image(
    service: &GenerationService,
    Parameters(request): Parameters<GenerateImageRequest>,
) -> Result<CallToolResult, McpError> {
    let outcome = service
        .generate(request.into(), &ApiKeyOverrides::default())
        .await
        .map_err(to_mcp_error)?;
    let response = GeneratedImage {
        url: service.store().public_url(&outcome.storage_path),
        storage_path: outcome.storage_path,
        image_count: outcome.images.len(),
        persistence: outcome.persistence,
    };
    Ok(CallToolResult::success(vec![Content::text(to_json_text(&response)?)]))
}
