use std::env;
use std::path::PathBuf;

use secrecy::SecretString;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const TOGETHER_BASE_URL: &str = "https://api.together.xyz";
pub const REPLICATE_BASE_URL: &str = "https://api.replicate.com";
const DEFAULT_BUCKET: &str = "images";

/// Server-held provider keys. Requests may override some of them with
/// headers; see [`crate::params::resolve_api_key`].
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub openai: Option<SecretString>,
    pub together: Option<SecretString>,
    pub replicate: Option<SecretString>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self {
            openai: non_empty_var("OPENAI_API_KEY").map(SecretString::from),
            together: non_empty_var("TOGETHER_API_KEY").map(SecretString::from),
            replicate: non_empty_var("REPLICATE_API_TOKEN").map(SecretString::from),
        }
    }
}

/// Provider API roots, overridable for proxies and tests.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub openai: String,
    pub together: String,
    pub replicate: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            openai: OPENAI_BASE_URL.to_string(),
            together: TOGETHER_BASE_URL.to_string(),
            replicate: REPLICATE_BASE_URL.to_string(),
        }
    }
}

impl ProviderEndpoints {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            openai: non_empty_var("OPENAI_BASE_URL").unwrap_or(defaults.openai),
            together: non_empty_var("TOGETHER_BASE_URL").unwrap_or(defaults.together),
            replicate: non_empty_var("REPLICATE_BASE_URL").unwrap_or(defaults.replicate),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Backend {
    Supabase {
        url: String,
        service_role_key: SecretString,
        bucket: String,
    },
    Local {
        data_dir: PathBuf,
        public_base_url: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub secret_key: Option<String>,
    pub credentials: Credentials,
    pub endpoints: ProviderEndpoints,
    pub backend: Backend,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3000);
        let bind_address = format!("0.0.0.0:{port}");
        let backend = resolve_backend(&bind_address);
        Self {
            secret_key: non_empty_var("SECRET_KEY"),
            credentials: Credentials::from_env(),
            endpoints: ProviderEndpoints::from_env(),
            backend,
            bind_address,
        }
    }

    pub fn mcp_path(&self) -> String {
        match self.secret_key.as_deref() {
            Some(value) => format!("/{value}/mcp"),
            None => "/mcp".to_string(),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn resolve_backend(bind_address: &str) -> Backend {
    let url = non_empty_var("SUPABASE_URL").or_else(|| non_empty_var("NEXT_PUBLIC_SUPABASE_URL"));
    let key = non_empty_var("SUPABASE_SERVICE_ROLE_KEY");
    if let (Some(url), Some(key)) = (url, key) {
        return Backend::Supabase {
            url: url.trim_end_matches('/').to_string(),
            service_role_key: SecretString::from(key),
            bucket: non_empty_var("SUPABASE_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
        };
    }
    Backend::Local {
        data_dir: resolve_data_dir(),
        public_base_url: resolve_public_base_url(bind_address),
    }
}

fn resolve_data_dir() -> PathBuf {
    if let Some(dir) = non_empty_var("DATA_DIR") {
        return PathBuf::from(dir);
    }
    let mut base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    base.push("image-gen-gateway");
    base
}

/// Base URL under which locally stored objects are served.
pub fn resolve_public_base_url(bind_address: &str) -> String {
    if let Some(public_url) = non_empty_var("PUBLIC_URL") {
        return format!("{}/storage", public_url.trim_end_matches('/'));
    }
    let domain = non_empty_var("DOMAIN").unwrap_or_else(|| bind_address.to_string());
    format!("{}/storage", normalize_base(&domain))
}

fn normalize_base(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    let mut rest = trimmed;
    let mut scheme = "http";
    loop {
        if let Some(stripped) = rest.strip_prefix("https://") {
            scheme = "https";
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix("http://") {
            scheme = "http";
            rest = stripped;
        } else {
            break;
        }
    }
    format!("{scheme}://{rest}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_base_collapses_repeated_schemes() {
        assert_eq!(normalize_base("example.com/"), "http://example.com");
        assert_eq!(normalize_base("http://https://example.com"), "https://example.com");
        assert_eq!(normalize_base("https://http://example.com"), "http://example.com");
        assert_eq!(normalize_base("http://http://0.0.0.0:3000"), "http://0.0.0.0:3000");
    }

    #[test]
    fn mcp_path_is_nested_under_secret() {
        let config = Config {
            bind_address: "0.0.0.0:3000".into(),
            secret_key: Some("abc".into()),
            credentials: Credentials::default(),
            endpoints: ProviderEndpoints::default(),
            backend: Backend::Local {
                data_dir: PathBuf::from("."),
                public_base_url: "http://localhost/storage".into(),
            },
        };
        assert_eq!(config.mcp_path(), "/abc/mcp");
    }
}
