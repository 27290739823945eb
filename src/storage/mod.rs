pub mod local;
pub mod supabase;

use anyhow::Result;
use async_trait::async_trait;

pub use local::LocalFileStorage;
pub use supabase::SupabaseStorage;

/// Path-addressed blob store for generated images.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `data` under `path`, replacing any existing object, and returns
    /// the path the object can be read back from.
    async fn upload(&self, path: &str, data: &[u8], content_type: &str) -> Result<String>;

    async fn download(&self, path: &str) -> Result<Option<Vec<u8>>>;

    fn public_url(&self, path: &str) -> String;
}

pub fn get_extension_from_mime_type(mime_type: &str) -> &str {
    match mime_type.to_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        "image/svg+xml" => "svg",
        "image/avif" => "avif",
        _ => "bin",
    }
}

pub fn detect_mime_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("image/png");
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if bytes.starts_with(b"BM") {
        return Some("image/bmp");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_bytes_identify_common_formats() {
        assert_eq!(
            detect_mime_type(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0]),
            Some("image/png")
        );
        assert_eq!(detect_mime_type(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(detect_mime_type(b"RIFF\0\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(detect_mime_type(b"hello"), None);
    }

    #[test]
    fn unknown_mime_types_have_no_image_extension() {
        assert_eq!(get_extension_from_mime_type("IMAGE/JPEG"), "jpg");
        assert_eq!(get_extension_from_mime_type("application/octet-stream"), "bin");
    }
}
