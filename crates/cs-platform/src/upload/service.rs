//! Upload Service
//!
//! Files are checked against the per-kind ceiling and MIME allow-list before
//! any network call. Remote deletion is best effort; the local row is always
//! removed.

use std::sync::Arc;

use bson::Document;
use bytes::Bytes;
use chrono::Utc;
use futures::future::join_all;
use tracing::{info, warn};

use crate::activity::{ActivityAction, ActivityService};
use crate::shared::api_common::{Page, PageRequest};
use crate::shared::authorization_service::AuthContext;
use crate::shared::error::{PlatformError, Result};
use crate::shared::types::ImageAsset;
use crate::upload::blob_store::{BlobStore, BlobUpload, FileType, StoredBlob};
use crate::upload::entity::{FileUpload, UpdateFileInput};
use crate::upload::repository::FileUploadRepository;

pub const MAX_FILES_PER_REQUEST: usize = 10;

const DOCUMENT_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// Which endpoint a file arrived through; decides ceiling and allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Image,
    Document,
    Video,
    Mixed,
}

impl UploadKind {
    pub fn accepts(self, mime: &str) -> bool {
        let mime = mime.to_ascii_lowercase();
        let image = mime.starts_with("image/");
        let document = DOCUMENT_MIME_TYPES.contains(&mime.as_str());
        let video = mime.starts_with("video/");
        match self {
            UploadKind::Image => image,
            UploadKind::Document => document,
            UploadKind::Video => video,
            UploadKind::Mixed => image || document || video,
        }
    }

    pub fn default_folder(self) -> &'static str {
        match self {
            UploadKind::Image => "images",
            UploadKind::Document => "documents",
            UploadKind::Video => "videos",
            UploadKind::Mixed => "files",
        }
    }

    fn allowed_description(self) -> &'static str {
        match self {
            UploadKind::Image => "images",
            UploadKind::Document => "PDF, DOC or DOCX documents",
            UploadKind::Video => "videos",
            UploadKind::Mixed => "images, PDF/DOC/DOCX documents or videos",
        }
    }
}

/// Per-kind size ceilings in bytes
#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    pub image: u64,
    pub document: u64,
    pub video: u64,
}

impl UploadLimits {
    pub fn from_config(config: &cs_config::StorageConfig) -> Self {
        Self {
            image: config.image_max_bytes,
            document: config.document_max_bytes,
            video: config.video_max_bytes,
        }
    }

    pub fn max_bytes(&self, kind: UploadKind) -> u64 {
        match kind {
            UploadKind::Image => self.image,
            UploadKind::Document | UploadKind::Mixed => self.document,
            UploadKind::Video => self.video,
        }
    }

    /// Largest multipart body any upload endpoint needs to accept.
    pub fn request_limit(&self) -> usize {
        let files = MAX_FILES_PER_REQUEST as u64;
        let largest = self.video.max(self.image * files).max(self.document * files);
        (largest + 1024 * 1024) as usize
    }
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self::from_config(&cs_config::StorageConfig::default())
    }
}

/// A file part read from a multipart request
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// The declared content type unless it is missing or generic, in which case
/// the type is guessed from the file extension.
pub fn resolve_mime(file_name: &str, declared: Option<&str>) -> String {
    match declared.map(str::trim).filter(|m| !m.is_empty()) {
        Some(m) if !m.eq_ignore_ascii_case("application/octet-stream") => m.to_ascii_lowercase(),
        _ => mime_guess::from_path(file_name)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string(),
    }
}

fn human_size(bytes: u64) -> String {
    format!("{:.0} MB", bytes as f64 / (1024.0 * 1024.0))
}

#[derive(Clone)]
pub struct UploadService {
    repo: Arc<FileUploadRepository>,
    store: Arc<dyn BlobStore>,
    limits: UploadLimits,
    activity: ActivityService,
}

impl UploadService {
    pub fn new(
        repo: Arc<FileUploadRepository>,
        store: Arc<dyn BlobStore>,
        limits: UploadLimits,
        activity: ActivityService,
    ) -> Self {
        Self {
            repo,
            store,
            limits,
            activity,
        }
    }

    pub fn limits(&self) -> &UploadLimits {
        &self.limits
    }

    /// Check one file against the kind's rules and turn it into a store request.
    pub fn prepare(&self, kind: UploadKind, file: IncomingFile, folder: &str) -> Result<BlobUpload> {
        let file_name = file.file_name.trim().to_string();
        if file_name.is_empty() {
            return Err(PlatformError::validation("file: a file name is required"));
        }
        if file.bytes.is_empty() {
            return Err(PlatformError::validation(format!("file: {} is empty", file_name)));
        }

        let max = self.limits.max_bytes(kind);
        if file.bytes.len() as u64 > max {
            return Err(PlatformError::PayloadTooLarge {
                message: format!("{} exceeds the {} limit", file_name, human_size(max)),
            });
        }

        let content_type = resolve_mime(&file_name, file.content_type.as_deref());
        if !kind.accepts(&content_type) {
            return Err(PlatformError::UnsupportedMediaType {
                message: format!(
                    "{} ({}); only {} are accepted",
                    file_name,
                    content_type,
                    kind.allowed_description()
                ),
            });
        }

        Ok(BlobUpload {
            file_name,
            file_type: FileType::from_mime(&content_type),
            content_type,
            folder: folder.to_string(),
            bytes: file.bytes,
        })
    }

    /// Validate every file, then upload them in parallel and record each one.
    ///
    /// If any upload fails, blobs already stored by this call are removed and
    /// the first error is returned.
    pub async fn upload_many(
        &self,
        kind: UploadKind,
        files: Vec<IncomingFile>,
        folder: Option<&str>,
        actor: &AuthContext,
    ) -> Result<Vec<FileUpload>> {
        if files.is_empty() {
            return Err(PlatformError::validation("files: no file was uploaded"));
        }
        if files.len() > MAX_FILES_PER_REQUEST {
            return Err(PlatformError::validation(format!(
                "files: at most {} files per request",
                MAX_FILES_PER_REQUEST
            )));
        }

        let folder = folder
            .map(|f| f.trim().trim_matches('/'))
            .filter(|f| !f.is_empty())
            .unwrap_or(kind.default_folder())
            .to_string();

        let prepared = files
            .into_iter()
            .map(|file| self.prepare(kind, file, &folder))
            .collect::<Result<Vec<_>>>()?;

        let results = join_all(prepared.iter().cloned().map(|upload| self.store.upload(upload))).await;

        let mut stored: Vec<(BlobUpload, StoredBlob)> = Vec::with_capacity(results.len());
        let mut first_error = None;
        for (upload, result) in prepared.into_iter().zip(results) {
            match result {
                Ok(blob) => stored.push((upload, blob)),
                Err(e) => {
                    warn!(file = %upload.file_name, error = %e, "Blob upload failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(err) = first_error {
            for (upload, blob) in &stored {
                self.remove_blob(&blob.public_id, upload.file_type).await;
            }
            return Err(err);
        }

        let now = Utc::now();
        let mut records = Vec::with_capacity(stored.len());
        for (upload, blob) in stored {
            let record = FileUpload::from_stored(
                blob,
                upload.file_name,
                upload.content_type,
                folder.clone(),
                Some(actor.actor()),
                now,
            );
            self.repo.insert(&record).await?;
            self.activity
                .log(
                    actor,
                    ActivityAction::Upload,
                    "file_upload",
                    &record.id,
                    format!("Uploaded {}", record.original_name),
                )
                .await;
            records.push(record);
        }

        info!(count = records.len(), folder = %folder, "Files uploaded");
        Ok(records)
    }

    /// Upload images and return them as embeddable assets (project galleries).
    pub async fn upload_image_assets(
        &self,
        files: Vec<IncomingFile>,
        folder: &str,
        actor: &AuthContext,
    ) -> Result<Vec<ImageAsset>> {
        let records = self.upload_many(UploadKind::Image, files, Some(folder), actor).await?;
        Ok(records
            .into_iter()
            .map(|r| ImageAsset {
                url: r.url,
                public_id: Some(r.public_id),
                caption: r.alt_text,
            })
            .collect())
    }

    pub async fn search(&self, filter: Document, page: PageRequest) -> Result<Page<FileUpload>> {
        self.repo.search(filter, page).await
    }

    pub async fn get(&self, id: &str) -> Result<FileUpload> {
        self.repo.get(id).await
    }

    pub async fn update(&self, id: &str, patch: UpdateFileInput, actor: &AuthContext) -> Result<FileUpload> {
        let mut file = self.repo.get(id).await?;
        file.apply(patch, Utc::now())?;
        self.repo.update(&file).await?;
        self.activity
            .log(actor, ActivityAction::Update, "file_upload", &file.id, format!("Updated {}", file.original_name))
            .await;
        Ok(file)
    }

    /// Remote delete first (failure logged), then the local row regardless.
    pub async fn delete(&self, id: &str, actor: &AuthContext) -> Result<()> {
        let file = self.repo.get(id).await?;
        self.remove_blob(&file.public_id, file.file_type).await;
        self.repo.delete(&file.id).await?;
        self.activity
            .log(actor, ActivityAction::Delete, "file_upload", &file.id, format!("Deleted {}", file.original_name))
            .await;
        Ok(())
    }

    /// Delete by store identifier; used when an embedded image is removed.
    pub async fn delete_by_public_id(&self, public_id: &str, file_type: FileType) -> Result<()> {
        self.remove_blob(public_id, file_type).await;
        if let Some(file) = self.repo.find_by_public_id(public_id).await? {
            self.repo.delete(&file.id).await?;
        }
        Ok(())
    }

    /// Resolve the remote URL and count the download.
    pub async fn download_url(&self, id: &str) -> Result<String> {
        let file = self.repo.get(id).await?;
        if let Err(e) = self.repo.increment_downloads(&file.id).await {
            warn!(file_id = %file.id, error = %e, "Failed to count download");
        }
        Ok(file.url)
    }

    pub async fn count(&self) -> Result<u64> {
        self.repo.count().await
    }

    async fn remove_blob(&self, public_id: &str, file_type: FileType) {
        if let Err(e) = self.store.delete(public_id, file_type).await {
            warn!(public_id = %public_id, error = %e, "Failed to delete remote blob");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::repository::ActivityRepository;
    use crate::upload::memory::MemoryBlobStore;

    async fn service() -> UploadService {
        let client = mongodb::Client::with_uri_str("mongodb://127.0.0.1:1").await.unwrap();
        let db = client.database("upload_test");
        UploadService::new(
            Arc::new(FileUploadRepository::new(&db)),
            Arc::new(MemoryBlobStore::new("https://cdn.test")),
            UploadLimits { image: 10, document: 20, video: 30 },
            ActivityService::new(Arc::new(ActivityRepository::new(&db))),
        )
    }

    fn file(name: &str, content_type: Option<&str>, len: usize) -> IncomingFile {
        IncomingFile {
            file_name: name.to_string(),
            content_type: content_type.map(String::from),
            bytes: Bytes::from(vec![1u8; len]),
        }
    }

    #[test]
    fn test_resolve_mime_falls_back_to_extension() {
        assert_eq!(resolve_mime("a.png", Some("IMAGE/PNG")), "image/png");
        assert_eq!(resolve_mime("a.pdf", Some("application/octet-stream")), "application/pdf");
        assert_eq!(resolve_mime("a.pdf", None), "application/pdf");
        assert_eq!(resolve_mime("noext", None), "application/octet-stream");
    }

    #[test]
    fn test_allow_lists() {
        assert!(UploadKind::Image.accepts("image/webp"));
        assert!(!UploadKind::Image.accepts("application/pdf"));
        assert!(UploadKind::Document.accepts("application/msword"));
        assert!(!UploadKind::Document.accepts("application/zip"));
        assert!(UploadKind::Mixed.accepts("video/mp4"));
        assert!(!UploadKind::Mixed.accepts("audio/mpeg"));
    }

    #[test]
    fn test_default_limits() {
        let limits = UploadLimits::default();
        assert_eq!(limits.max_bytes(UploadKind::Image), 5 * 1024 * 1024);
        assert_eq!(limits.max_bytes(UploadKind::Mixed), 10 * 1024 * 1024);
        assert_eq!(limits.max_bytes(UploadKind::Video), 50 * 1024 * 1024);
    }

    #[tokio::test]
    async fn test_prepare_rejects_before_upload() {
        let service = service().await;

        let err = service.prepare(UploadKind::Image, file("big.png", Some("image/png"), 11), "x").unwrap_err();
        assert!(matches!(err, PlatformError::PayloadTooLarge { .. }));

        let err = service.prepare(UploadKind::Image, file("cv.pdf", None, 5), "x").unwrap_err();
        assert!(matches!(err, PlatformError::UnsupportedMediaType { .. }));

        let err = service.prepare(UploadKind::Image, file("a.png", None, 0), "x").unwrap_err();
        assert!(matches!(err, PlatformError::Validation { .. }));

        let ok = service.prepare(UploadKind::Document, file("cv.pdf", None, 20), "cv").unwrap();
        assert_eq!(ok.file_type, FileType::Document);
        assert_eq!(ok.content_type, "application/pdf");
    }
}
