use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};

use crate::records::ImageRepository;
use crate::service::GenerationService;
use crate::tools::{GenerateImageRequest, ListImagesRequest};

#[derive(Clone)]
pub struct ImageGatewayServer {
    tool_router: ToolRouter<Self>,
    generation: GenerationService,
    images: Arc<dyn ImageRepository>,
}

impl ImageGatewayServer {
    pub fn new(generation: GenerationService, images: Arc<dyn ImageRepository>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            generation,
            images,
        }
    }
}

#[tool_router]
impl ImageGatewayServer {
    #[tool(
        description = "Generate an image with OpenAI, Together AI or a Replicate model, store it and return its public URL. Generation can take a while; show the result with ![](url)"
    )]
    async fn generate_image(
        &self,
        Parameters(request): Parameters<GenerateImageRequest>,
    ) -> Result<CallToolResult, McpError> {
        crate::tools::generate_image(&self.generation, Parameters(request)).await
    }

    #[tool(description = "List previously generated images, newest first, with optional filters")]
    async fn list_images(
        &self,
        Parameters(request): Parameters<ListImagesRequest>,
    ) -> Result<CallToolResult, McpError> {
        crate::tools::list_images(
            self.images.as_ref(),
            self.generation.store().as_ref(),
            Parameters(request),
        )
        .await
    }
}

#[tool_handler]
impl ServerHandler for ImageGatewayServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
