use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};
use tokio::{fs, sync::Mutex};
use uuid::Uuid;

use crate::error::RecordError;
use crate::records::{
    ImageFilter, ImageRepository, NewImage, PromptDraft, PromptRepository, SavedPrompt,
    StoredImage, paginate,
};

const IMAGE_DIR: &str = "images";
const PROMPT_DIR: &str = "prompts";

/// Rows kept as one pretty-printed JSON file each under a data directory.
#[derive(Debug)]
pub struct LocalRecordStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl LocalRecordStore {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            write_lock: Mutex::new(()),
        }
    }

    fn image_file(&self, id: i64) -> PathBuf {
        // Zero-padded so lexical order matches numeric order.
        self.root.join(IMAGE_DIR).join(format!("{id:012}.json"))
    }

    fn prompt_file(&self, id: Uuid) -> PathBuf {
        self.root.join(PROMPT_DIR).join(format!("{id}.json"))
    }

    async fn next_image_id(&self) -> Result<i64, RecordError> {
        let images: Vec<StoredImage> = read_all(&self.root.join(IMAGE_DIR)).await?;
        Ok(images.iter().map(|image| image.id).max().unwrap_or(0) + 1)
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), RecordError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let payload = serde_json::to_vec_pretty(value)?;
    fs::write(path, payload).await?;
    Ok(())
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, RecordError> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

async fn read_all<T: DeserializeOwned>(dir_path: &Path) -> Result<Vec<T>, RecordError> {
    let mut dir = match fs::read_dir(dir_path).await {
        Ok(dir) => dir,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };
    let mut entries: Vec<PathBuf> = Vec::new();
    while let Some(entry) = dir.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
            entries.push(path);
        }
    }
    entries.sort();

    let mut rows = Vec::with_capacity(entries.len());
    for path in entries {
        let bytes = fs::read(&path).await?;
        match serde_json::from_slice::<T>(&bytes) {
            Ok(row) => rows.push(row),
            Err(err) => tracing::warn!(path = %path.display(), error = %err, "skipping unreadable record"),
        }
    }
    Ok(rows)
}

#[async_trait]
impl ImageRepository for LocalRecordStore {
    async fn insert(&self, image: NewImage) -> Result<StoredImage, RecordError> {
        let _guard = self.write_lock.lock().await;
        let id = self.next_image_id().await?;
        let stored = StoredImage::from_new(id, Utc::now(), image);
        write_json(&self.image_file(id), &stored).await?;
        Ok(stored)
    }

    async fn list(&self, filter: &ImageFilter) -> Result<Vec<StoredImage>, RecordError> {
        let mut images: Vec<StoredImage> = read_all(&self.root.join(IMAGE_DIR)).await?;
        images.retain(|image| filter.matches(image));
        images.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(paginate(images, filter))
    }

    async fn get(&self, id: i64) -> Result<Option<StoredImage>, RecordError> {
        read_json(&self.image_file(id)).await
    }
}

#[async_trait]
impl PromptRepository for LocalRecordStore {
    async fn create(&self, draft: PromptDraft) -> Result<SavedPrompt, RecordError> {
        let draft = draft.validate()?;
        let prompt = SavedPrompt {
            id: Uuid::new_v4(),
            name: draft.name,
            prompt_text: draft.prompt_text,
            negative_prompt: draft.negative_prompt,
            notes: draft.notes,
            created_at: Utc::now(),
        };
        let _guard = self.write_lock.lock().await;
        write_json(&self.prompt_file(prompt.id), &prompt).await?;
        Ok(prompt)
    }

    async fn list(&self) -> Result<Vec<SavedPrompt>, RecordError> {
        let mut prompts: Vec<SavedPrompt> = read_all(&self.root.join(PROMPT_DIR)).await?;
        prompts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(prompts)
    }

    async fn update(&self, id: Uuid, draft: PromptDraft) -> Result<SavedPrompt, RecordError> {
        let draft = draft.validate()?;
        let _guard = self.write_lock.lock().await;
        let path = self.prompt_file(id);
        let existing: SavedPrompt = read_json(&path)
            .await?
            .ok_or_else(|| RecordError::NotFound(format!("Prompt {id}")))?;
        let updated = SavedPrompt {
            name: draft.name,
            prompt_text: draft.prompt_text,
            negative_prompt: draft.negative_prompt,
            notes: draft.notes,
            ..existing
        };
        write_json(&path, &updated).await?;
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RecordError> {
        let _guard = self.write_lock.lock().await;
        match fs::remove_file(self.prompt_file(id)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(RecordError::NotFound(format!("Prompt {id}")))
            }
            Err(err) => Err(err.into()),
        }
    }
}
