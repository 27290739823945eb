use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;

use crate::{storage::ObjectStore, supabase::SupabaseClient};

/// Supabase Storage bucket accessed over its REST API.
#[derive(Clone, Debug)]
pub struct SupabaseStorage {
    client: SupabaseClient,
    bucket: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(rename = "Key")]
    key: Option<String>,
}

impl SupabaseStorage {
    pub fn new(client: SupabaseClient, bucket: &str) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
        }
    }

    fn object_path(&self, path: &str) -> String {
        format!("object/{}/{}", self.bucket, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl ObjectStore for SupabaseStorage {
    async fn upload(&self, path: &str, data: &[u8], content_type: &str) -> Result<String> {
        let response = self
            .client
            .storage(Method::POST, &self.object_path(path))
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data.to_vec())
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Supabase storage upload failed: {status} {text}"));
        }
        let payload: UploadResponse = response.json().await?;
        let key = payload
            .key
            .ok_or_else(|| anyhow!("Supabase storage upload succeeded but returned no path."))?;
        // The returned key is bucket-qualified; rows store the in-bucket path.
        let bucket_prefix = format!("{}/", self.bucket);
        Ok(key
            .strip_prefix(&bucket_prefix)
            .unwrap_or(&key)
            .to_string())
    }

    async fn download(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let response = self
            .client
            .storage(Method::GET, &self.object_path(path))
            .send()
            .await?;
        match response.status() {
            status if status.is_success() => Ok(Some(response.bytes().await?.to_vec())),
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => Ok(None),
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(anyhow!("Supabase storage download failed: {status} {text}"))
            }
        }
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.client.url(),
            self.bucket,
            path.trim_start_matches('/')
        )
    }
}
