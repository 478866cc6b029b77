//! In-process blob store for development and tests.
//!
//! Blob URLs point at `base_url`; mount [`crate::upload::api::memory_files_router`]
//! there so they resolve.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use crate::shared::error::{PlatformError, Result};
use crate::upload::blob_store::{BlobStore, BlobUpload, FileType, StoredBlob};
use crate::TsidGenerator;

/// Content held for one public id
#[derive(Debug, Clone)]
pub struct MemoryBlob {
    pub content_type: String,
    pub bytes: Bytes,
}

pub struct MemoryBlobStore {
    base_url: String,
    blobs: RwLock<HashMap<String, MemoryBlob>>,
}

impl MemoryBlobStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            blobs: RwLock::new(HashMap::new()),
        }
    }

    pub fn contains(&self, public_id: &str) -> bool {
        self.blobs
            .read()
            .map(|blobs| blobs.contains_key(public_id))
            .unwrap_or(false)
    }

    pub fn get(&self, public_id: &str) -> Option<MemoryBlob> {
        self.blobs
            .read()
            .ok()
            .and_then(|blobs| blobs.get(public_id).cloned())
    }

    pub fn len(&self) -> usize {
        self.blobs.read().map(|blobs| blobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, upload: BlobUpload) -> Result<StoredBlob> {
        let folder = upload.folder.trim_matches('/');
        let id = TsidGenerator::generate().to_lowercase();
        let public_id = if folder.is_empty() { id } else { format!("{}/{}", folder, id) };
        let format = upload
            .file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());

        let stored = StoredBlob {
            url: format!("{}/{}", self.base_url, public_id),
            public_id: public_id.clone(),
            size: upload.bytes.len() as u64,
            format,
            ..Default::default()
        };

        self.blobs
            .write()
            .map_err(|_| PlatformError::blob_store("memory store poisoned"))?
            .insert(
                public_id,
                MemoryBlob {
                    content_type: upload.content_type,
                    bytes: upload.bytes,
                },
            );
        Ok(stored)
    }

    async fn delete(&self, public_id: &str, _file_type: FileType) -> Result<()> {
        self.blobs
            .write()
            .map_err(|_| PlatformError::blob_store("memory store poisoned"))?
            .remove(public_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_and_delete() {
        let store = MemoryBlobStore::new("https://cdn.example.vn/");
        let stored = store
            .upload(BlobUpload {
                file_name: "Phoi-canh.JPG".to_string(),
                content_type: "image/jpeg".to_string(),
                file_type: FileType::Image,
                folder: "projects".to_string(),
                bytes: Bytes::from_static(b"\xff\xd8\xff"),
            })
            .await
            .unwrap();

        assert!(stored.public_id.starts_with("projects/"));
        assert!(stored.url.starts_with("https://cdn.example.vn/projects/"));
        assert_eq!(stored.size, 3);
        assert_eq!(stored.format.as_deref(), Some("jpg"));
        assert!(store.contains(&stored.public_id));
        let blob = store.get(&stored.public_id).unwrap();
        assert_eq!(blob.content_type, "image/jpeg");
        assert_eq!(blob.bytes, Bytes::from_static(b"\xff\xd8\xff"));

        store.delete(&stored.public_id, FileType::Image).await.unwrap();
        assert!(store.is_empty());
    }
}
