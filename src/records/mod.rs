//! Image metadata rows and saved prompts.

pub mod local;
pub mod supabase;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RecordError;

pub use local::LocalRecordStore;
pub use supabase::SupabaseRecords;

pub const STATUS_COMPLETED: &str = "completed";

/// Insert shape of an `images` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewImage {
    pub prompt_text: String,
    pub negative_prompt: Option<String>,
    /// Storage path of the uploaded image, not a public URL.
    pub image_url: String,
    pub provider: String,
    pub model: String,
    pub width: u32,
    pub height: u32,
    pub seed: Option<u64>,
    pub steps: Option<u32>,
    pub guidance_scale: Option<f64>,
    pub style: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredImage {
    pub id: i64,
    pub prompt_text: String,
    pub negative_prompt: Option<String>,
    pub image_url: String,
    pub provider: String,
    pub model: String,
    pub width: u32,
    pub height: u32,
    pub seed: Option<u64>,
    pub steps: Option<u32>,
    pub guidance_scale: Option<f64>,
    pub style: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl StoredImage {
    pub fn from_new(id: i64, created_at: DateTime<Utc>, image: NewImage) -> Self {
        Self {
            id,
            prompt_text: image.prompt_text,
            negative_prompt: image.negative_prompt,
            image_url: image.image_url,
            provider: image.provider,
            model: image.model,
            width: image.width,
            height: image.height,
            seed: image.seed,
            steps: image.steps,
            guidance_scale: image.guidance_scale,
            style: image.style,
            status: image.status,
            created_at,
        }
    }
}

/// Browsing filter; `None` fields match everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageFilter {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub style: Option<String>,
    /// Case-insensitive substring of the prompt text.
    #[serde(rename = "q")]
    pub search: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ImageFilter {
    pub fn matches(&self, image: &StoredImage) -> bool {
        let eq = |wanted: &Option<String>, actual: Option<&str>| match wanted.as_deref() {
            Some(wanted) => actual == Some(wanted),
            None => true,
        };
        let search_hit = match self.search.as_deref() {
            Some(needle) => image
                .prompt_text
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            None => true,
        };
        eq(&self.provider, Some(&image.provider))
            && eq(&self.model, Some(&image.model))
            && eq(&self.style, image.style.as_deref())
            && search_hit
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPrompt {
    pub id: Uuid,
    pub name: Option<String>,
    pub prompt_text: String,
    pub negative_prompt: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields a user submits when saving or editing a prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptDraft {
    pub name: Option<String>,
    pub prompt_text: String,
    pub negative_prompt: Option<String>,
    pub notes: Option<String>,
}

impl PromptDraft {
    /// Trims every field, turning blank optionals into `None`.
    pub fn validate(self) -> Result<Self, RecordError> {
        let blank_to_none = |value: Option<String>| {
            value
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty())
        };
        let prompt_text = self.prompt_text.trim().to_string();
        if prompt_text.is_empty() {
            return Err(RecordError::Invalid("Prompt text cannot be empty".to_string()));
        }
        Ok(Self {
            name: blank_to_none(self.name),
            prompt_text,
            negative_prompt: blank_to_none(self.negative_prompt),
            notes: blank_to_none(self.notes),
        })
    }
}

#[async_trait]
pub trait ImageRepository: Send + Sync {
    async fn insert(&self, image: NewImage) -> Result<StoredImage, RecordError>;

    /// Matching rows, newest first.
    async fn list(&self, filter: &ImageFilter) -> Result<Vec<StoredImage>, RecordError>;

    async fn get(&self, id: i64) -> Result<Option<StoredImage>, RecordError>;
}

#[async_trait]
pub trait PromptRepository: Send + Sync {
    async fn create(&self, draft: PromptDraft) -> Result<SavedPrompt, RecordError>;

    /// All prompts, newest first.
    async fn list(&self) -> Result<Vec<SavedPrompt>, RecordError>;

    async fn update(&self, id: Uuid, draft: PromptDraft) -> Result<SavedPrompt, RecordError>;

    async fn delete(&self, id: Uuid) -> Result<(), RecordError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageSummary {
    pub image_count: usize,
    pub prompt_count: usize,
    pub by_provider: Vec<UsageCount>,
    pub by_model: Vec<UsageCount>,
}

fn count_by<'a>(values: impl Iterator<Item = &'a str>) -> Vec<UsageCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }
    let mut usage: Vec<UsageCount> = counts
        .into_iter()
        .map(|(name, count)| UsageCount {
            name: name.to_string(),
            count,
        })
        .collect();
    usage.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    usage
}

pub fn usage_summary(images: &[StoredImage], prompt_count: usize) -> UsageSummary {
    UsageSummary {
        image_count: images.len(),
        prompt_count,
        by_provider: count_by(images.iter().map(|image| image.provider.as_str())),
        by_model: count_by(images.iter().map(|image| image.model.as_str())),
    }
}

/// Applies offset and limit to an already ordered list.
pub(crate) fn paginate<T>(items: Vec<T>, filter: &ImageFilter) -> Vec<T> {
    let offset = filter.offset.unwrap_or(0);
    let limit = filter.limit.unwrap_or(usize::MAX);
    items.into_iter().skip(offset).take(limit).collect()
}
