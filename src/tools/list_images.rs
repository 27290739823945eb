use rmcp::{
    ErrorData as McpError,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content},
    schemars::JsonSchema,
};
use serde::Deserialize;

use crate::{
    api::images::{ImageItem, MAX_PAGE_SIZE},
    records::{ImageFilter, ImageRepository},
    storage::ObjectStore,
    tools::{to_json_text, to_mcp_error},
};

const DEFAULT_TOOL_LIMIT: usize = 10;

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListImagesRequest {
    #[schemars(description = "Provider name as stored, e.g. OpenAI, Together AI, Replicate")]
    pub provider: Option<String>,
    pub model: Option<String>,
    pub style: Option<String>,
    #[schemars(description = "Case-insensitive text to look for in the prompt")]
    pub query: Option<String>,
    #[schemars(description = "Maximum rows to return, default 10")]
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl From<ListImagesRequest> for ImageFilter {
    fn from(request: ListImagesRequest) -> Self {
        ImageFilter {
            provider: request.provider,
            model: request.model,
            style: request.style,
            search: request.query,
            limit: Some(request.limit.unwrap_or(DEFAULT_TOOL_LIMIT).clamp(1, MAX_PAGE_SIZE)),
            offset: request.offset,
        }
    }
}

pub async fn list_images(
    images: &dyn ImageRepository,
    store: &dyn ObjectStore,
    Parameters(request): Parameters<ListImagesRequest>,
) -> Result<CallToolResult, McpError> {
    let filter = ImageFilter::from(request);
    let rows = images
        .list(&filter)
        .await
        .map_err(|err| to_mcp_error(err.into()))?;
    let items: Vec<ImageItem> = rows
        .into_iter()
        .map(|image| ImageItem::new(image, store))
        .collect();
    Ok(CallToolResult::success(vec![Content::text(to_json_text(&items)?)]))
}
