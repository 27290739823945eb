//! Turns provider output into response payloads and stored blobs.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::Client;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::ApiError,
    providers::{ImageSource, ProviderTarget},
    storage::{detect_mime_type, get_extension_from_mime_type},
    url_validation::validate_http_url,
};

const FALLBACK_MIME: &str = "image/png";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl FetchedImage {
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.content_type, STANDARD.encode(&self.bytes))
    }
}

/// Result of writing the metadata row, reported apart from the generation
/// itself: a failed insert never fails the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PersistenceOutcome {
    Saved { id: i64 },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    /// Base64 data URIs, first image first.
    pub images: Vec<String>,
    pub storage_path: String,
    pub persistence: PersistenceOutcome,
}

fn content_type_for(header: Option<&str>, bytes: &[u8]) -> String {
    header
        .map(|value| value.split(';').next().unwrap_or(value).trim().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| detect_mime_type(bytes).map(str::to_string))
        .unwrap_or_else(|| FALLBACK_MIME.to_string())
}

/// Resolves one provider image into raw bytes and a MIME type.
pub async fn fetch_image(client: &Client, source: &ImageSource) -> Result<FetchedImage, ApiError> {
    match source {
        ImageSource::Inline { b64, content_type } => {
            let bytes = STANDARD
                .decode(b64.trim())
                .map_err(|err| ApiError::PostProcess(format!("invalid base64 image: {err}")))?;
            let content_type = content_type_for(content_type.as_deref(), &bytes);
            Ok(FetchedImage { bytes, content_type })
        }
        ImageSource::Url(raw) => {
            let url = validate_http_url(raw).map_err(|err| ApiError::PostProcess(err.to_string()))?;
            let response = client
                .get(url)
                .send()
                .await
                .map_err(|err| ApiError::PostProcess(format!("fetch image failed: {err}")))?;
            let status = response.status();
            if !status.is_success() {
                return Err(ApiError::PostProcess(format!(
                    "fetch image failed: HTTP {status}"
                )));
            }
            let header = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            let bytes = response
                .bytes()
                .await
                .map_err(|err| ApiError::PostProcess(format!("read image bytes failed: {err}")))?
                .to_vec();
            let content_type = content_type_for(header.as_deref(), &bytes);
            Ok(FetchedImage { bytes, content_type })
        }
    }
}

/// `public/<provider>-<model-slug>-<uuid>.<ext>`
pub fn storage_path(target: &ProviderTarget, model: &str, content_type: &str) -> String {
    let model_slug: String = model
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch.to_ascii_lowercase() } else { '-' })
        .collect();
    let model_slug = model_slug.trim_matches('-');
    let ext = match get_extension_from_mime_type(content_type) {
        "bin" => "png",
        ext => ext,
    };
    format!("public/{}-{}-{}.{ext}", target.slug(), model_slug, Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_parameters_are_stripped() {
        assert_eq!(content_type_for(Some("image/jpeg; charset=binary"), b""), "image/jpeg");
    }

    #[test]
    fn missing_header_falls_back_to_sniffing_then_png() {
        let gif = b"GIF89a....";
        assert_eq!(content_type_for(None, gif), "image/gif");
        assert_eq!(content_type_for(None, b"???"), "image/png");
    }

    #[tokio::test]
    async fn inline_images_decode_without_network() {
        let source = ImageSource::Inline {
            b64: STANDARD.encode(b"hello"),
            content_type: Some("image/webp".into()),
        };
        let fetched = fetch_image(&Client::new(), &source).await.unwrap();
        assert_eq!(fetched.bytes, b"hello");
        assert_eq!(fetched.data_uri(), "data:image/webp;base64,aGVsbG8=");
    }

    #[tokio::test]
    async fn non_http_urls_are_rejected() {
        let source = ImageSource::Url("file:///etc/passwd".into());
        let err = fetch_image(&Client::new(), &source).await.unwrap_err();
        assert!(matches!(err, ApiError::PostProcess(_)));
    }

    #[test]
    fn storage_paths_embed_provider_and_model() {
        let path = storage_path(&ProviderTarget::OpenAi, "gpt-image-1", "application/octet-stream");
        assert!(path.starts_with("public/openai-gpt-image-1-"));
        assert!(path.ends_with(".png"));

        let target = ProviderTarget::parse("stability-ai/sdxl").unwrap();
        let path = storage_path(&target, "stability-ai/sdxl", "image/jpeg");
        assert!(path.starts_with("public/replicate-stability-ai-sdxl-"));
        assert!(path.ends_with(".jpg"));
    }
}
