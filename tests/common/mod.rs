#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use image_gen_gateway::{
    config::{Credentials, ProviderEndpoints},
    error::RecordError,
    params::GenerateBody,
    records::{ImageFilter, ImageRepository, LocalRecordStore, NewImage, StoredImage},
    service::GenerationService,
    storage::{LocalFileStorage, ObjectStore},
};
use secrecy::SecretString;
use tempfile::TempDir;
use wiremock::MockServer;

pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3, 4];

pub struct Harness {
    pub server: MockServer,
    pub store: Arc<LocalFileStorage>,
    pub records: Arc<LocalRecordStore>,
    pub service: GenerationService,
    _dir: TempDir,
}

pub fn endpoints(server: &MockServer) -> ProviderEndpoints {
    ProviderEndpoints {
        openai: server.uri(),
        together: server.uri(),
        replicate: server.uri(),
    }
}

pub fn server_credentials() -> Credentials {
    Credentials {
        openai: Some(SecretString::from("sk-server")),
        together: Some(SecretString::from("together-server")),
        replicate: Some(SecretString::from("r8-server")),
    }
}

impl Harness {
    pub async fn new(credentials: Credentials) -> Self {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalFileStorage::new(
            dir.path().join("objects"),
            "http://localhost:3000/storage".into(),
        ));
        let records = Arc::new(LocalRecordStore::new(dir.path().join("records")));
        let service = GenerationService::new(
            reqwest::Client::new(),
            endpoints(&server),
            credentials,
            store.clone(),
            records.clone(),
        );
        Self {
            server,
            store,
            records,
            service,
            _dir: dir,
        }
    }

    pub fn image_url(&self, name: &str) -> String {
        format!("{}/files/{name}", self.server.uri())
    }

    pub async fn upstream_bodies(&self, path: &str) -> Vec<serde_json::Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|request| request.url.path() == path)
            .map(|request| serde_json::from_slice(&request.body).unwrap())
            .collect()
    }
}

pub fn body(prompt: &str, provider: &str, width: u32, height: u32) -> GenerateBody {
    GenerateBody {
        prompt: Some(prompt.into()),
        provider: Some(provider.into()),
        width: Some(width),
        height: Some(height),
        ..Default::default()
    }
}

/// Object store whose uploads always fail.
pub struct BrokenStore;

#[async_trait]
impl ObjectStore for BrokenStore {
    async fn upload(&self, _path: &str, _data: &[u8], _content_type: &str) -> Result<String> {
        Err(anyhow!("bucket unavailable"))
    }

    async fn download(&self, _path: &str) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    fn public_url(&self, path: &str) -> String {
        format!("http://broken/{path}")
    }
}

/// Image repository whose writes always fail.
pub struct BrokenRecords;

#[async_trait]
impl ImageRepository for BrokenRecords {
    async fn insert(&self, _image: NewImage) -> Result<StoredImage, RecordError> {
        Err(RecordError::PermissionDenied("new row violates row-level security policy".into()))
    }

    async fn list(&self, _filter: &ImageFilter) -> Result<Vec<StoredImage>, RecordError> {
        Ok(Vec::new())
    }

    async fn get(&self, _id: i64) -> Result<Option<StoredImage>, RecordError> {
        Ok(None)
    }
}
