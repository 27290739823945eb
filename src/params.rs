//! Raw client input to a validated [`GenerationRequest`].

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::{
    capabilities,
    config::Credentials,
    error::ApiError,
    providers::{KeyPolicy, ProviderTarget},
};

/// JSON body of `POST /api/generate`, before any validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBody {
    pub prompt: Option<String>,
    pub provider: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub negative_prompt: Option<String>,
    pub num_outputs: Option<u32>,
    pub style: Option<String>,
    pub seed: Option<u64>,
    pub steps: Option<u32>,
    pub guidance_scale: Option<f64>,
}

/// Keys a caller supplied with the request.
#[derive(Debug, Default)]
pub struct ApiKeyOverrides {
    pub openai: Option<SecretString>,
    pub together: Option<SecretString>,
}

#[derive(Debug)]
pub struct GenerationRequest {
    /// Prompt text with the style suffix already applied.
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub width: u32,
    pub height: u32,
    pub num_outputs: u32,
    pub style: Option<String>,
    pub seed: Option<u64>,
    pub steps: Option<u32>,
    pub guidance_scale: Option<f64>,
    pub target: ProviderTarget,
    pub api_key: SecretString,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct StyleOption {
    pub id: &'static str,
    pub name: &'static str,
    pub suffix: &'static str,
}

pub const STYLES: &[StyleOption] = &[
    StyleOption { id: "cinematic", name: "Cinematic", suffix: ", cinematic style" },
    StyleOption { id: "photographic", name: "Photographic", suffix: ", photographic style" },
    StyleOption { id: "anime", name: "Anime", suffix: ", anime style" },
    StyleOption { id: "digital-art", name: "Digital Art", suffix: ", digital art style" },
    StyleOption { id: "cyberpunk", name: "Cyberpunk", suffix: ", cyberpunk style" },
    StyleOption { id: "sketch", name: "Sketch", suffix: ", sketch style" },
    StyleOption { id: "cartoon", name: "Cartoon", suffix: ", cartoon style" },
    StyleOption { id: "3d-cartoon", name: "3D Cartoon", suffix: ", Pixar-like 3D cartoon" },
    StyleOption { id: "ghibli-esque", name: "Ghibli-esque", suffix: ", in the style of Studio Ghibli" },
];

fn style_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Suffix for a style id; `digital-art` and `digitalArt` name the same style.
pub fn style_suffix(style: &str) -> Option<&'static str> {
    let key = style_key(style);
    STYLES
        .iter()
        .find(|option| style_key(option.id) == key)
        .map(|option| option.suffix)
}

pub fn apply_style(prompt: &str, style: Option<&str>) -> String {
    match style.and_then(style_suffix) {
        Some(suffix) => format!("{prompt}{suffix}"),
        None => prompt.to_string(),
    }
}

/// Picks the key a provider call will use.
pub fn resolve_api_key(
    target: &ProviderTarget,
    overrides: &ApiKeyOverrides,
    credentials: &Credentials,
) -> Result<SecretString, ApiError> {
    let pick = |first: &Option<SecretString>, second: &Option<SecretString>| {
        first
            .as_ref()
            .or(second.as_ref())
            .map(|key| SecretString::from(key.expose_secret()))
    };
    match target {
        ProviderTarget::Replicate { .. } => pick(&credentials.replicate, &None).ok_or_else(|| {
            ApiError::Misconfigured(
                "Replicate API key not configured on the server. Please set REPLICATE_API_TOKEN environment variable."
                    .to_string(),
            )
        }),
        ProviderTarget::OpenAi => pick(&overrides.openai, &credentials.openai).ok_or_else(|| {
            ApiError::MissingUserKey(
                "OpenAI API key not provided. Please add your OpenAI API key in Settings."
                    .to_string(),
            )
        }),
        ProviderTarget::TogetherAi { key_policy: KeyPolicy::ServerFirst, .. } => {
            pick(&credentials.together, &overrides.together).ok_or_else(|| {
                ApiError::MissingUserKey(
                    "Please provide a TogetherAI API key in Settings. You can get a free API key at together.ai"
                        .to_string(),
                )
            })
        }
        ProviderTarget::TogetherAi { key_policy: KeyPolicy::UserOnly, .. } => {
            pick(&overrides.together, &None).ok_or_else(|| {
                ApiError::MissingUserKey(
                    "TogetherAI API key not provided. Please add your TogetherAI API key in Settings."
                        .to_string(),
                )
            })
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Validates a request body against the capability table and resolves its key.
///
/// Runs before any network call; every error here is final for the request.
pub fn normalize(
    body: GenerateBody,
    overrides: &ApiKeyOverrides,
    credentials: &Credentials,
) -> Result<GenerationRequest, ApiError> {
    let missing = || ApiError::InvalidRequest("Missing required generation parameters.".to_string());
    let prompt = non_blank(body.prompt).ok_or_else(missing)?;
    let provider = non_blank(body.provider).ok_or_else(missing)?;
    let width = body.width.filter(|value| *value > 0).ok_or_else(missing)?;
    let height = body.height.filter(|value| *value > 0).ok_or_else(missing)?;

    let target = ProviderTarget::parse(&provider)?;
    let api_key = resolve_api_key(&target, overrides, credentials)?;
    let caps = capabilities::lookup(&provider);

    if !caps.supports_dimensions(width, height) {
        return Err(ApiError::InvalidRequest(format!(
            "Unsupported dimensions {width}x{height} for {}. Use one of: {}.",
            target.display_name(),
            caps.dimensions().join(", ")
        )));
    }

    let num_outputs = match body.num_outputs {
        Some(0) => {
            return Err(ApiError::InvalidRequest(
                "numOutputs must be a positive integer.".to_string(),
            ));
        }
        Some(count) => count.min(caps.max_image_count),
        None => 1,
    };

    let guidance_scale = match body.guidance_scale {
        Some(scale) if !(scale.is_finite() && scale > 0.0) => {
            return Err(ApiError::InvalidRequest(
                "guidanceScale must be a positive number.".to_string(),
            ));
        }
        Some(scale) if caps.supports_guidance_scale => Some(scale),
        _ => None,
    };

    let negative_prompt = non_blank(body.negative_prompt).filter(|_| caps.supports_negative_prompt);
    let style = non_blank(body.style);
    let prompt = apply_style(&prompt, style.as_deref());
    if let Some(style) = style.as_deref().filter(|id| style_suffix(id).is_some()) {
        tracing::info!(style, "applied style suffix to prompt");
    }

    Ok(GenerationRequest {
        prompt,
        negative_prompt,
        width,
        height,
        num_outputs,
        style,
        seed: body.seed.filter(|_| caps.supports_seed),
        steps: caps.constrain_steps(body.steps),
        guidance_scale,
        target,
        api_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(provider: &str) -> GenerateBody {
        GenerateBody {
            prompt: Some("a cat".into()),
            provider: Some(provider.into()),
            width: Some(1024),
            height: Some(1024),
            ..Default::default()
        }
    }

    fn server_keys() -> Credentials {
        Credentials {
            openai: Some(SecretString::from("sk-server")),
            together: Some(SecretString::from("tg-server")),
            replicate: Some(SecretString::from("r8-server")),
        }
    }

    #[test]
    fn missing_provider_is_rejected() {
        let mut raw = body("openai");
        raw.provider = None;
        let err = normalize(raw, &ApiKeyOverrides::default(), &server_keys()).unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
        assert_eq!(err.to_string(), "Missing required generation parameters.");
    }

    #[test]
    fn zero_width_counts_as_missing() {
        let mut raw = body("openai");
        raw.width = Some(0);
        assert!(normalize(raw, &ApiKeyOverrides::default(), &server_keys()).is_err());
    }

    #[test]
    fn style_suffix_is_appended() {
        let mut raw = body("openai");
        raw.style = Some("cinematic".into());
        let request = normalize(raw, &ApiKeyOverrides::default(), &server_keys()).unwrap();
        assert!(request.prompt.ends_with(", cinematic style"));
        assert_eq!(request.prompt, "a cat, cinematic style");
    }

    #[test]
    fn style_ids_accept_both_spellings() {
        assert_eq!(style_suffix("digitalArt"), style_suffix("digital-art"));
        assert_eq!(style_suffix("ghibliEsque"), Some(", in the style of Studio Ghibli"));
        assert_eq!(apply_style("a cat", Some("unknown")), "a cat");
    }

    #[test]
    fn openai_drops_unsupported_fields() {
        let mut raw = body("openai");
        raw.negative_prompt = Some("blurry".into());
        raw.steps = Some(30);
        raw.guidance_scale = Some(7.5);
        raw.seed = Some(42);
        let request = normalize(raw, &ApiKeyOverrides::default(), &server_keys()).unwrap();
        assert_eq!(request.seed, None);
        assert_eq!(request.negative_prompt, None);
        assert_eq!(request.steps, None);
        assert_eq!(request.guidance_scale, None);
    }

    #[test]
    fn image_count_is_capped_by_capability() {
        let mut raw = body("togetherai");
        raw.num_outputs = Some(8);
        let request = normalize(raw, &ApiKeyOverrides::default(), &server_keys()).unwrap();
        assert_eq!(request.num_outputs, 1);
    }

    #[test]
    fn unsupported_dimensions_are_rejected() {
        let mut raw = body("openai");
        raw.width = Some(512);
        raw.height = Some(512);
        let err = normalize(raw, &ApiKeyOverrides::default(), &server_keys()).unwrap_err();
        assert!(err.to_string().contains("Unsupported dimensions 512x512"));
    }

    #[test]
    fn non_positive_guidance_is_rejected() {
        let mut raw = body("stability-ai/stable-diffusion");
        raw.guidance_scale = Some(-1.0);
        assert!(normalize(raw, &ApiKeyOverrides::default(), &server_keys()).is_err());
    }

    #[test]
    fn header_key_wins_for_openai() {
        let overrides = ApiKeyOverrides {
            openai: Some(SecretString::from("sk-user")),
            together: None,
        };
        let request = normalize(body("openai"), &overrides, &server_keys()).unwrap();
        assert_eq!(request.api_key.expose_secret(), "sk-user");
    }

    #[test]
    fn free_together_model_prefers_server_key() {
        let overrides = ApiKeyOverrides {
            openai: None,
            together: Some(SecretString::from("tg-user")),
        };
        let request = normalize(body("togetherai"), &overrides, &server_keys()).unwrap();
        assert_eq!(request.api_key.expose_secret(), "tg-server");
    }

    #[test]
    fn paid_together_model_needs_user_key() {
        let err = normalize(
            body("black-forest-labs/FLUX.1.1-pro"),
            &ApiKeyOverrides::default(),
            &server_keys(),
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::MissingUserKey(_)));
    }

    #[test]
    fn replicate_without_server_token_is_misconfiguration() {
        let credentials = Credentials {
            replicate: None,
            ..server_keys()
        };
        let err = normalize(
            body("stability-ai/sdxl"),
            &ApiKeyOverrides::default(),
            &credentials,
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Misconfigured(_)));
        assert!(err.to_string().contains("REPLICATE_API_TOKEN"));
    }

    #[test]
    fn unknown_plain_provider_is_unsupported() {
        let err = normalize(body("midjourney"), &ApiKeyOverrides::default(), &server_keys())
            .unwrap_err();
        assert_eq!(err.to_string(), "Provider 'midjourney' not supported yet.");
    }
}
