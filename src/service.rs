use std::sync::Arc;

use reqwest::Client;

use crate::{
    config::{Credentials, ProviderEndpoints},
    error::ApiError,
    params::{self, ApiKeyOverrides, GenerateBody, GenerationRequest},
    pipeline::{self, GenerationOutcome, PersistenceOutcome},
    records::{ImageRepository, NewImage, STATUS_COMPLETED},
    storage::ObjectStore,
};

/// Validate, generate, fetch, upload and record, in that order.
#[derive(Clone)]
pub struct GenerationService {
    http: Client,
    endpoints: ProviderEndpoints,
    credentials: Credentials,
    store: Arc<dyn ObjectStore>,
    images: Arc<dyn ImageRepository>,
}

impl GenerationService {
    pub fn new(
        http: Client,
        endpoints: ProviderEndpoints,
        credentials: Credentials,
        store: Arc<dyn ObjectStore>,
        images: Arc<dyn ImageRepository>,
    ) -> Self {
        Self {
            http,
            endpoints,
            credentials,
            store,
            images,
        }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub async fn generate(
        &self,
        body: GenerateBody,
        overrides: &ApiKeyOverrides,
    ) -> Result<GenerationOutcome, ApiError> {
        let request = params::normalize(body, overrides, &self.credentials)?;
        self.run(request).await
    }

    pub async fn run(&self, request: GenerationRequest) -> Result<GenerationOutcome, ApiError> {
        let provider = request.target.adapter(&self.http, &self.endpoints);
        tracing::info!(
            provider = provider.name(),
            width = request.width,
            height = request.height,
            num_outputs = request.num_outputs,
            "generating image"
        );
        let reply = provider.generate(&request).await?;

        let mut sources = reply.images.iter();
        let first = sources.next().ok_or_else(|| ApiError::UnexpectedResponse {
            provider: provider.name(),
            detail: "no images returned".to_string(),
        })?;
        let primary = pipeline::fetch_image(&self.http, first).await?;

        let mut images = vec![primary.data_uri()];
        for source in sources {
            match pipeline::fetch_image(&self.http, source).await {
                Ok(extra) => images.push(extra.data_uri()),
                Err(err) => tracing::warn!(error = %err, "skipping additional image"),
            }
        }

        let path = pipeline::storage_path(&request.target, &reply.model, &primary.content_type);
        let storage_path = self
            .store
            .upload(&path, &primary.bytes, &primary.content_type)
            .await
            .map_err(|err| ApiError::PostProcess(format!("storage upload failed: {err}")))?;
        tracing::info!(storage_path, "uploaded generated image");

        let row = NewImage {
            prompt_text: request.prompt.clone(),
            negative_prompt: request.negative_prompt.clone(),
            image_url: storage_path.clone(),
            provider: request.target.display_name().to_string(),
            model: reply.model.clone(),
            width: request.width,
            height: request.height,
            seed: request.seed,
            steps: reply.steps,
            guidance_scale: request.guidance_scale,
            style: request.style.clone(),
            status: STATUS_COMPLETED.to_string(),
        };
        let persistence = match self.images.insert(row).await {
            Ok(stored) => {
                tracing::info!(id = stored.id, "recorded image metadata");
                PersistenceOutcome::Saved { id: stored.id }
            }
            Err(err) => {
                tracing::error!(error = %err, storage_path, "failed to record image metadata");
                PersistenceOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        };

        Ok(GenerationOutcome {
            images,
            storage_path,
            persistence,
        })
    }
}
