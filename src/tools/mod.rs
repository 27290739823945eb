pub mod generate_image;
pub mod list_images;

use rmcp::ErrorData as McpError;
use serde::Serialize;

use crate::error::ApiError;

pub use generate_image::{GenerateImageRequest, generate_image};
pub use list_images::{ListImagesRequest, list_images};

/// Caller mistakes become invalid-params errors; everything else is internal.
pub fn to_mcp_error(err: ApiError) -> McpError {
    let message = err.to_string();
    if err.status().is_client_error() {
        McpError::invalid_params(message, None)
    } else {
        McpError::internal_error(message, None)
    }
}

pub fn to_json_text<T: Serialize>(value: &T) -> Result<String, McpError> {
    serde_json::to_string(value).map_err(|err| {
        McpError::internal_error(
            "serialize tool response failed",
            Some(serde_json::Value::String(err.to_string())),
        )
    })
}
