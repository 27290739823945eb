//! Shared connection details for the Supabase REST surfaces.

use reqwest::{
    Client, RequestBuilder,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use secrecy::{ExposeSecret, SecretString};

#[derive(Clone, Debug)]
pub struct SupabaseClient {
    http: Client,
    url: String,
    service_role_key: SecretString,
}

impl SupabaseClient {
    pub fn new(http: Client, url: &str, service_role_key: SecretString) -> Self {
        Self {
            http,
            url: url.trim_end_matches('/').to_string(),
            service_role_key,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn auth_headers(&self) -> HeaderMap {
        let key = self.service_role_key.expose_secret();
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(key) {
            headers.insert("apikey", value);
        }
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {key}")) {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }

    /// `{url}/rest/v1/{table}` with service-role auth.
    pub fn rest(&self, method: reqwest::Method, table: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/rest/v1/{table}", self.url))
            .headers(self.auth_headers())
    }

    /// `{url}/storage/v1/{path}` with service-role auth.
    pub fn storage(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/storage/v1/{path}", self.url))
            .headers(self.auth_headers())
    }
}
