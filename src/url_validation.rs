use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("image URL is empty")]
    Empty,
    #[error("invalid image URL: {0}")]
    Malformed(String),
    #[error("only http or https image URLs are allowed, got {0}")]
    Scheme(String),
}

pub fn validate_http_url(raw: &str) -> Result<Url, UrlError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }
    let parsed = Url::parse(trimmed).map_err(|err| UrlError::Malformed(err.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(UrlError::Scheme(scheme.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https_only() {
        assert!(validate_http_url(" https://cdn.example.com/a.png ").is_ok());
        assert_eq!(
            validate_http_url("ftp://example.com/a.png"),
            Err(UrlError::Scheme("ftp".into()))
        );
        assert_eq!(validate_http_url("  "), Err(UrlError::Empty));
        assert!(matches!(validate_http_url("not a url"), Err(UrlError::Malformed(_))));
    }
}
