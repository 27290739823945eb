//! Static description of what each provider/model accepts.
//!
//! Both request normalization and the `/api/providers` listing read from
//! [`PROVIDERS`], so the form constraints a client renders and the checks the
//! server applies come from the same table.

use serde::Serialize;

/// Sizes accepted by the OpenAI image endpoint.
pub const OPENAI_SIZES: &[&str] = &["1024x1024", "1792x1024", "1024x1792"];

/// Sizes assumed for entries that do not list their own.
pub const GENERIC_DIMENSIONS: &[&str] = &["1024x1024", "1024x1792", "1792x1024"];

const SDXL_DIMENSIONS: &[&str] = &[
    "1024x1024",
    "1152x896",
    "896x1152",
    "1216x832",
    "832x1216",
    "1344x768",
    "768x1344",
    "1536x640",
    "640x1536",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepRange {
    pub min: u32,
    pub max: u32,
    pub default: u32,
}

impl StepRange {
    pub fn contains(&self, steps: u32) -> bool {
        (self.min..=self.max).contains(&steps)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCapabilities {
    pub supports_negative_prompt: bool,
    pub supports_guidance_scale: bool,
    /// Whether a seed reaches the provider at all.
    pub supports_seed: bool,
    pub supported_steps: Option<StepRange>,
    pub supported_dimensions: Option<&'static [&'static str]>,
    pub max_image_count: u32,
}

impl ProviderCapabilities {
    pub fn dimensions(&self) -> &'static [&'static str] {
        self.supported_dimensions.unwrap_or(GENERIC_DIMENSIONS)
    }

    pub fn supports_dimensions(&self, width: u32, height: u32) -> bool {
        let size = format!("{width}x{height}");
        self.dimensions().iter().any(|candidate| *candidate == size)
    }

    /// Steps the provider should receive for a caller's request.
    ///
    /// Providers without step control drop the value. Values outside the
    /// declared range fall back to the range default; an absent value stays
    /// absent so the adapter can apply its own default.
    pub fn constrain_steps(&self, requested: Option<u32>) -> Option<u32> {
        let range = self.supported_steps?;
        let steps = requested?;
        if range.contains(steps) {
            Some(steps)
        } else {
            Some(range.default)
        }
    }
}

pub const DEFAULT_CAPABILITIES: ProviderCapabilities = ProviderCapabilities {
    supports_negative_prompt: true,
    supports_guidance_scale: true,
    supports_seed: true,
    supported_steps: Some(StepRange { min: 10, max: 50, default: 25 }),
    supported_dimensions: None,
    max_image_count: 4,
};

const OPENAI_CAPABILITIES: ProviderCapabilities = ProviderCapabilities {
    supports_negative_prompt: false,
    supports_guidance_scale: false,
    supports_seed: false,
    supported_steps: None,
    supported_dimensions: Some(OPENAI_SIZES),
    max_image_count: 10,
};

const FLUX_SCHNELL_CAPABILITIES: ProviderCapabilities = ProviderCapabilities {
    supports_negative_prompt: true,
    supports_guidance_scale: false,
    supports_seed: true,
    supported_steps: Some(StepRange { min: 1, max: 4, default: 4 }),
    supported_dimensions: Some(GENERIC_DIMENSIONS),
    max_image_count: 1,
};

const SDXL_CAPABILITIES: ProviderCapabilities = ProviderCapabilities {
    supports_negative_prompt: true,
    supports_guidance_scale: true,
    supports_seed: true,
    supported_steps: Some(StepRange { min: 1, max: 50, default: 20 }),
    supported_dimensions: Some(SDXL_DIMENSIONS),
    max_image_count: 4,
};

/// Output sizes covering every aspect ratio Imagen accepts.
const IMAGEN_DIMENSIONS: &[&str] = &[
    "1024x1024",
    "1408x768",
    "768x1408",
    "1536x1024",
    "1024x1536",
];

const IMAGEN_CAPABILITIES: ProviderCapabilities = ProviderCapabilities {
    supports_negative_prompt: true,
    supports_guidance_scale: false,
    supports_seed: false,
    supported_steps: None,
    supported_dimensions: Some(IMAGEN_DIMENSIONS),
    max_image_count: 1,
};

const SDXL_LIGHTNING_CAPABILITIES: ProviderCapabilities = ProviderCapabilities {
    supports_guidance_scale: false,
    supported_steps: Some(StepRange { min: 1, max: 8, default: 4 }),
    ..SDXL_CAPABILITIES
};

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProviderEntry {
    pub key: &'static str,
    pub name: &'static str,
    pub capabilities: ProviderCapabilities,
}

pub const PROVIDERS: &[ProviderEntry] = &[
    ProviderEntry {
        key: "togetherai",
        name: "Together AI (Flux Schnell - Free)",
        capabilities: FLUX_SCHNELL_CAPABILITIES,
    },
    ProviderEntry {
        key: "openai",
        name: "OpenAI (GPT Image)",
        capabilities: OPENAI_CAPABILITIES,
    },
    ProviderEntry {
        key: "replicate/stability-ai/sdxl:7762fd07cf82c948538e41f63f77d685e02b063e37e496e96eefd46c929f9bdc",
        name: "Replicate (SDXL)",
        capabilities: SDXL_CAPABILITIES,
    },
    ProviderEntry {
        key: "replicate/bytedance/sdxl-lightning-4step:6f7a773af6fc3e8de9d5a3c00be77c17308914bf67772726aff83496ba1e3bbe",
        name: "Replicate (SDXL Lightning)",
        capabilities: SDXL_LIGHTNING_CAPABILITIES,
    },
    ProviderEntry {
        key: "replicate/google/imagen-3",
        name: "Replicate (Imagen 3)",
        capabilities: IMAGEN_CAPABILITIES,
    },
];

/// Capabilities for a provider key, accepting Replicate ids with or without
/// the `replicate/` prefix. Unlisted keys get [`DEFAULT_CAPABILITIES`].
pub fn lookup(provider_key: &str) -> &'static ProviderCapabilities {
    let bare = provider_key.strip_prefix("replicate/").unwrap_or(provider_key);
    PROVIDERS
        .iter()
        .find(|entry| {
            entry.key == provider_key
                || entry.key.strip_prefix("replicate/") == Some(bare)
        })
        .map(|entry| &entry.capabilities)
        .unwrap_or(&DEFAULT_CAPABILITIES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replicate_entries_match_with_or_without_prefix() {
        let prefixed = lookup(PROVIDERS[2].key);
        let bare = lookup(
            "stability-ai/sdxl:7762fd07cf82c948538e41f63f77d685e02b063e37e496e96eefd46c929f9bdc",
        );
        assert_eq!(prefixed, bare);
        assert_eq!(bare.max_image_count, 4);
        assert!(bare.supports_dimensions(1216, 832));
    }

    #[test]
    fn unknown_keys_fall_back_to_defaults() {
        let caps = lookup("someone/some-model");
        assert_eq!(caps, &DEFAULT_CAPABILITIES);
        assert!(caps.supports_dimensions(1024, 1024));
        assert!(!caps.supports_dimensions(512, 512));
    }

    #[test]
    fn openai_dimensions_are_the_size_allow_list() {
        let caps = lookup("openai");
        assert_eq!(caps.dimensions(), OPENAI_SIZES);
        assert!(!caps.supports_dimensions(512, 512));
        assert_eq!(caps.constrain_steps(Some(30)), None);
        assert!(!caps.supports_seed);
    }

    #[test]
    fn imagen_lists_a_size_for_every_aspect_ratio() {
        let caps = lookup("google/imagen-3");
        assert_eq!(caps.dimensions(), IMAGEN_DIMENSIONS);
        for (width, height) in [(1024, 1024), (1408, 768), (768, 1408), (1536, 1024), (1024, 1536)] {
            assert!(caps.supports_dimensions(width, height), "{width}x{height}");
        }
        assert_eq!(caps.constrain_steps(Some(30)), None);
    }

    #[test]
    fn out_of_range_steps_use_the_range_default() {
        let caps = lookup("togetherai");
        assert_eq!(caps.constrain_steps(Some(50)), Some(4));
        assert_eq!(caps.constrain_steps(Some(0)), Some(4));
        assert_eq!(caps.constrain_steps(Some(2)), Some(2));
        assert_eq!(caps.constrain_steps(None), None);
    }

    #[test]
    fn lightning_inherits_sdxl_dimensions() {
        let caps = lookup(PROVIDERS[3].key);
        assert!(!caps.supports_guidance_scale);
        assert_eq!(caps.dimensions(), SDXL_DIMENSIONS);
        assert_eq!(caps.constrain_steps(Some(20)), Some(4));
    }
}
