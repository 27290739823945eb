use std::sync::Arc;

use anyhow::Result;
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use tower_http::services::ServeDir;
use tracing_subscriber::EnvFilter;

use image_gen_gateway::{
    api::{self, AppState},
    config::{Backend, Config},
    mcp_server::ImageGatewayServer,
    records::{ImageRepository, LocalRecordStore, PromptRepository, SupabaseRecords},
    service::GenerationService,
    storage::{LocalFileStorage, ObjectStore, SupabaseStorage},
    supabase::SupabaseClient,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("image_gen_gateway=info")),
        )
        .init();

    let config = Config::from_env();
    let http = reqwest::Client::new();

    let (store, images, prompts, local_objects): (
        Arc<dyn ObjectStore>,
        Arc<dyn ImageRepository>,
        Arc<dyn PromptRepository>,
        Option<std::path::PathBuf>,
    ) = match &config.backend {
        Backend::Supabase {
            url,
            service_role_key,
            bucket,
        } => {
            tracing::info!(url, bucket, "using Supabase storage and database");
            let client = SupabaseClient::new(http.clone(), url, service_role_key.clone());
            let records = Arc::new(SupabaseRecords::new(client.clone()));
            let store: Arc<dyn ObjectStore> = Arc::new(SupabaseStorage::new(client, bucket));
            let images: Arc<dyn ImageRepository> = records.clone();
            let prompts: Arc<dyn PromptRepository> = records;
            (store, images, prompts, None)
        }
        Backend::Local {
            data_dir,
            public_base_url,
        } => {
            tracing::warn!(
                data_dir = %data_dir.display(),
                "Supabase is not configured; storing images and records on local disk"
            );
            let objects_dir = data_dir.join("objects");
            let records = Arc::new(LocalRecordStore::new(data_dir.join("records")));
            let store: Arc<dyn ObjectStore> = Arc::new(LocalFileStorage::new(
                objects_dir.clone(),
                public_base_url.clone(),
            ));
            let images: Arc<dyn ImageRepository> = records.clone();
            let prompts: Arc<dyn PromptRepository> = records;
            (store, images, prompts, Some(objects_dir))
        }
    };

    let generation = GenerationService::new(
        http,
        config.endpoints.clone(),
        config.credentials.clone(),
        store,
        images.clone(),
    );

    let mcp_generation = generation.clone();
    let mcp_images = images.clone();
    let mcp_service = StreamableHttpService::new(
        move || Ok(ImageGatewayServer::new(mcp_generation.clone(), mcp_images.clone())),
        LocalSessionManager::default().into(),
        Default::default(),
    );

    let mcp_path = config.mcp_path();
    let mut router = api::router(AppState {
        generation,
        images,
        prompts,
    })
    .nest_service(&mcp_path, mcp_service);
    if let Some(objects_dir) = local_objects {
        router = router.nest_service("/storage", ServeDir::new(objects_dir));
    }

    let tcp_listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    tracing::info!(
        "image generation gateway listening on http://{}, MCP at {}",
        config.bind_address,
        mcp_path
    );

    axum::serve(tcp_listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
