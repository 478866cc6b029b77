//! File Upload Entity

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::validation::{clean_opt, Validation};
use crate::upload::blob_store::{FileType, StoredBlob};
use crate::{Result, TsidGenerator};

/// Type-specific details reported by the blob store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Local record of a blob held in the external store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUpload {
    #[serde(rename = "_id")]
    pub id: String,

    pub original_name: String,

    /// Identifier in the blob store
    pub public_id: String,

    pub url: String,

    /// Bytes
    pub size: u64,

    pub mime_type: String,

    pub file_type: FileType,

    #[serde(default)]
    pub folder: String,

    #[serde(default)]
    pub metadata: FileMetadata,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_by: Option<String>,

    #[serde(default)]
    pub download_count: u64,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateFileInput {
    pub alt_text: Option<String>,
}

impl FileUpload {
    pub fn from_stored(
        stored: StoredBlob,
        original_name: String,
        mime_type: String,
        folder: String,
        uploaded_by: Option<&str>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TsidGenerator::generate(),
            original_name,
            public_id: stored.public_id,
            url: stored.url,
            size: stored.size,
            file_type: FileType::from_mime(&mime_type),
            mime_type,
            folder,
            metadata: FileMetadata {
                width: stored.width,
                height: stored.height,
                duration: stored.duration,
                pages: stored.pages,
                format: stored.format,
            },
            alt_text: None,
            uploaded_by: uploaded_by.map(String::from),
            download_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: UpdateFileInput, now: DateTime<Utc>) -> Result<()> {
        if let Some(alt_text) = patch.alt_text {
            self.alt_text = clean_opt(Some(alt_text));
        }
        let mut v = Validation::new();
        v.text_opt("altText", self.alt_text.as_deref(), 200);
        v.into_result()?;
        self.updated_at = now;
        Ok(())
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileUploadResponse {
    pub id: String,
    pub original_name: String,
    pub public_id: String,
    pub url: String,
    pub size: u64,
    pub mime_type: String,
    pub file_type: FileType,
    pub folder: String,
    pub metadata: FileMetadata,
    pub alt_text: Option<String>,
    pub uploaded_by: Option<String>,
    pub download_count: u64,
    pub created_at: String,
}

impl From<FileUpload> for FileUploadResponse {
    fn from(f: FileUpload) -> Self {
        Self {
            id: f.id,
            original_name: f.original_name,
            public_id: f.public_id,
            url: f.url,
            size: f.size,
            mime_type: f.mime_type,
            file_type: f.file_type,
            folder: f.folder,
            metadata: f.metadata,
            alt_text: f.alt_text,
            uploaded_by: f.uploaded_by,
            download_count: f.download_count,
            created_at: f.created_at.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_copied_from_store() {
        let stored = StoredBlob {
            public_id: "docs/abc".to_string(),
            url: "https://cdn.example.vn/docs/abc".to_string(),
            size: 2048,
            format: Some("pdf".to_string()),
            pages: Some(12),
            ..Default::default()
        };
        let file = FileUpload::from_stored(
            stored,
            "brochure.pdf".to_string(),
            "application/pdf".to_string(),
            "docs".to_string(),
            Some("U1"),
            Utc::now(),
        );
        assert_eq!(file.file_type, FileType::Document);
        assert_eq!(file.metadata.pages, Some(12));
        assert_eq!(file.download_count, 0);
    }

    #[test]
    fn test_alt_text_limit() {
        let stored = StoredBlob { public_id: "a".into(), url: "https://x.vn/a".into(), ..Default::default() };
        let mut file = FileUpload::from_stored(stored, "a.png".into(), "image/png".into(), String::new(), None, Utc::now());
        assert!(file.apply(UpdateFileInput { alt_text: Some("x".repeat(201)) }, Utc::now()).is_err());
        file.apply(UpdateFileInput { alt_text: Some("  Phối cảnh  ".into()) }, Utc::now()).unwrap();
        assert_eq!(file.alt_text.as_deref(), Some("Phối cảnh"));
    }
}
