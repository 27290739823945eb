use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::{Deserialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::error::RecordError;
use crate::records::{
    ImageFilter, ImageRepository, NewImage, PromptDraft, PromptRepository, SavedPrompt,
    StoredImage,
};
use crate::supabase::SupabaseClient;

const IMAGES_TABLE: &str = "images";
const PROMPTS_TABLE: &str = "prompts";
const PERMISSION_DENIED_CODE: &str = "42501";

/// `images` and `prompts` tables behind PostgREST.
#[derive(Clone, Debug)]
pub struct SupabaseRecords {
    client: SupabaseClient,
}

#[derive(Debug, Deserialize)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
}

impl SupabaseRecords {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    fn returning(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .rest(method, table)
            .header("Prefer", "return=representation")
    }
}

/// Builds the PostgREST query pairs for a browsing filter.
fn filter_query(filter: &ImageFilter) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("select", "*".to_string()),
        ("order", "created_at.desc".to_string()),
    ];
    if let Some(provider) = filter.provider.as_deref() {
        query.push(("provider", format!("eq.{provider}")));
    }
    if let Some(model) = filter.model.as_deref() {
        query.push(("model", format!("eq.{model}")));
    }
    if let Some(style) = filter.style.as_deref() {
        query.push(("style", format!("eq.{style}")));
    }
    if let Some(search) = filter.search.as_deref() {
        query.push(("prompt_text", format!("ilike.*{search}*")));
    }
    if let Some(limit) = filter.limit {
        query.push(("limit", limit.to_string()));
    }
    if let Some(offset) = filter.offset {
        query.push(("offset", offset.to_string()));
    }
    query
}

async fn rows<T: DeserializeOwned>(response: Response) -> Result<Vec<T>, RecordError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    let text = response.text().await.unwrap_or_default();
    let parsed = serde_json::from_str::<PostgrestError>(&text).ok();
    let message = parsed
        .as_ref()
        .and_then(|err| err.message.clone())
        .unwrap_or_else(|| format!("HTTP {status}: {text}"));
    match parsed.and_then(|err| err.code) {
        Some(code) if code == PERMISSION_DENIED_CODE => Err(RecordError::PermissionDenied(message)),
        _ => Err(RecordError::Backend(message)),
    }
}

fn first_row<T>(rows: Vec<T>, what: String) -> Result<T, RecordError> {
    rows.into_iter().next().ok_or(RecordError::NotFound(what))
}

#[async_trait]
impl ImageRepository for SupabaseRecords {
    async fn insert(&self, image: NewImage) -> Result<StoredImage, RecordError> {
        let response = self
            .returning(Method::POST, IMAGES_TABLE)
            .json(&image)
            .send()
            .await?;
        let inserted: Vec<StoredImage> = rows(response).await?;
        inserted
            .into_iter()
            .next()
            .ok_or_else(|| RecordError::Backend("insert returned no row".to_string()))
    }

    async fn list(&self, filter: &ImageFilter) -> Result<Vec<StoredImage>, RecordError> {
        let response = self
            .client
            .rest(Method::GET, IMAGES_TABLE)
            .query(&filter_query(filter))
            .send()
            .await?;
        rows(response).await
    }

    async fn get(&self, id: i64) -> Result<Option<StoredImage>, RecordError> {
        let response = self
            .client
            .rest(Method::GET, IMAGES_TABLE)
            .query(&[("select", "*".to_string()), ("id", format!("eq.{id}"))])
            .send()
            .await?;
        let found: Vec<StoredImage> = rows(response).await?;
        Ok(found.into_iter().next())
    }
}

#[async_trait]
impl PromptRepository for SupabaseRecords {
    async fn create(&self, draft: PromptDraft) -> Result<SavedPrompt, RecordError> {
        let draft = draft.validate()?;
        let response = self
            .returning(Method::POST, PROMPTS_TABLE)
            .json(&draft)
            .send()
            .await?;
        let created: Vec<SavedPrompt> = rows(response).await?;
        created
            .into_iter()
            .next()
            .ok_or_else(|| RecordError::Backend("insert returned no row".to_string()))
    }

    async fn list(&self) -> Result<Vec<SavedPrompt>, RecordError> {
        let response = self
            .client
            .rest(Method::GET, PROMPTS_TABLE)
            .query(&[("select", "*"), ("order", "created_at.desc")])
            .send()
            .await?;
        rows(response).await
    }

    async fn update(&self, id: Uuid, draft: PromptDraft) -> Result<SavedPrompt, RecordError> {
        let draft = draft.validate()?;
        let response = self
            .returning(Method::PATCH, PROMPTS_TABLE)
            .query(&[("id", format!("eq.{id}"))])
            .json(&draft)
            .send()
            .await?;
        first_row(rows(response).await?, format!("Prompt {id}"))
    }

    async fn delete(&self, id: Uuid) -> Result<(), RecordError> {
        let response = self
            .returning(Method::DELETE, PROMPTS_TABLE)
            .query(&[("id", format!("eq.{id}"))])
            .send()
            .await?;
        let deleted: Vec<SavedPrompt> = rows(response).await?;
        first_row(deleted, format!("Prompt {id}")).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn records(server: &MockServer) -> SupabaseRecords {
        SupabaseRecords::new(SupabaseClient::new(
            reqwest::Client::new(),
            &server.uri(),
            SecretString::from("service-role"),
        ))
    }

    #[test]
    fn filter_query_maps_fields_to_postgrest_operators() {
        let query = filter_query(&ImageFilter {
            provider: Some("OpenAI".into()),
            search: Some("fox".into()),
            limit: Some(10),
            offset: Some(20),
            ..Default::default()
        });
        assert!(query.contains(&("provider", "eq.OpenAI".to_string())));
        assert!(query.contains(&("prompt_text", "ilike.*fox*".to_string())));
        assert!(query.contains(&("limit", "10".to_string())));
        assert!(query.contains(&("offset", "20".to_string())));
        assert!(!query.iter().any(|(key, _)| *key == "model"));
    }

    #[tokio::test]
    async fn permission_errors_are_reported_distinctly() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/prompts"))
            .and(header("apikey", "service-role"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "code": "42501",
                "message": "new row violates row-level security policy"
            })))
            .mount(&server)
            .await;

        let err = records(&server)
            .create(PromptDraft {
                prompt_text: "a lake".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RecordError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn deleting_a_missing_prompt_is_not_found() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/prompts"))
            .and(query_param("id", format!("eq.{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let err = records(&server).delete(id).await.unwrap_err();
        assert!(matches!(err, RecordError::NotFound(_)));
    }
}
