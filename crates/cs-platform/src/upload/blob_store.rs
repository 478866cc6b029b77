//! Blob store abstraction.
//!
//! Binary assets live in an external object store; the platform only keeps
//! a metadata row per file.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::error::Result;

/// Coarse classification derived from the MIME type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Image,
    Document,
    Video,
    Audio,
    Archive,
    Other,
}

impl FileType {
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.to_ascii_lowercase();
        let (top, sub) = mime.split_once('/').unwrap_or((mime.as_str(), ""));
        match top {
            "image" => FileType::Image,
            "video" => FileType::Video,
            "audio" => FileType::Audio,
            "text" => FileType::Document,
            "application" => match sub {
                "pdf" | "msword" | "rtf" | "vnd.ms-excel" | "vnd.ms-powerpoint" => FileType::Document,
                s if s.starts_with("vnd.openxmlformats-officedocument") => FileType::Document,
                s if s.starts_with("vnd.oasis.opendocument") => FileType::Document,
                "zip" | "x-zip-compressed" | "x-rar-compressed" | "vnd.rar" | "x-7z-compressed" | "gzip"
                | "x-tar" => FileType::Archive,
                _ => FileType::Other,
            },
            _ => FileType::Other,
        }
    }

    /// Store-side resource class
    pub fn resource_type(self) -> &'static str {
        match self {
            FileType::Image => "image",
            FileType::Video | FileType::Audio => "video",
            _ => "raw",
        }
    }
}

/// A validated file on its way to the store
#[derive(Debug, Clone)]
pub struct BlobUpload {
    pub file_name: String,
    pub content_type: String,
    pub file_type: FileType,
    pub folder: String,
    pub bytes: Bytes,
}

/// What the store reports back after a successful upload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredBlob {
    pub public_id: String,
    pub url: String,
    pub size: u64,
    pub format: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration: Option<f64>,
    pub pages: Option<u32>,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, upload: BlobUpload) -> Result<StoredBlob>;

    async fn delete(&self, public_id: &str, file_type: FileType) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_mime() {
        assert_eq!(FileType::from_mime("image/webp"), FileType::Image);
        assert_eq!(FileType::from_mime("application/pdf"), FileType::Document);
        assert_eq!(
            FileType::from_mime("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
            FileType::Document
        );
        assert_eq!(FileType::from_mime("video/mp4"), FileType::Video);
        assert_eq!(FileType::from_mime("audio/mpeg"), FileType::Audio);
        assert_eq!(FileType::from_mime("application/zip"), FileType::Archive);
        assert_eq!(FileType::from_mime("application/octet-stream"), FileType::Other);
    }

    #[test]
    fn test_resource_type() {
        assert_eq!(FileType::Image.resource_type(), "image");
        assert_eq!(FileType::Audio.resource_type(), "video");
        assert_eq!(FileType::Document.resource_type(), "raw");
    }
}
