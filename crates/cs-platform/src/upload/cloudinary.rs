//! Cloudinary blob store.
//!
//! Signed upload API: every request carries `api_key`, `timestamp` and a
//! SHA-256 signature over the sorted, `&`-joined parameters followed by the
//! API secret.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::shared::error::{PlatformError, Result};
use crate::upload::blob_store::{BlobStore, BlobUpload, FileType, StoredBlob};

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

pub struct CloudinaryBlobStore {
    http_client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    base_folder: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: String,
    #[serde(default)]
    bytes: u64,
    format: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<f64>,
    pages: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

/// `sha256("k1=v1&k2=v2" + secret)` with keys sorted.
pub fn sign(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, &str)> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

impl CloudinaryBlobStore {
    pub fn new(config: &cs_config::StorageConfig) -> Self {
        info!(cloud_name = %config.cloud_name, "Cloudinary blob store configured");
        Self {
            http_client: reqwest::Client::new(),
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            base_folder: config.base_folder.trim_matches('/').to_string(),
        }
    }

    fn endpoint(&self, file_type: FileType, action: &str) -> String {
        format!("{}/{}/{}/{}", API_BASE, self.cloud_name, file_type.resource_type(), action)
    }

    fn folder(&self, folder: &str) -> String {
        let folder = folder.trim_matches('/');
        match (self.base_folder.is_empty(), folder.is_empty()) {
            (true, _) => folder.to_string(),
            (false, true) => self.base_folder.clone(),
            (false, false) => format!("{}/{}", self.base_folder, folder),
        }
    }

    async fn read_error(response: reqwest::Response) -> PlatformError {
        let status = response.status();
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error.message,
            Err(_) => status.to_string(),
        };
        PlatformError::blob_store(format!("Cloudinary request failed ({}): {}", status, message))
    }
}

#[async_trait]
impl BlobStore for CloudinaryBlobStore {
    async fn upload(&self, upload: BlobUpload) -> Result<StoredBlob> {
        let timestamp = Utc::now().timestamp().to_string();
        let folder = self.folder(&upload.folder);
        let signature = sign(&[("folder", &folder), ("timestamp", &timestamp)], &self.api_secret);

        let file = Part::bytes(upload.bytes.to_vec())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.content_type)
            .map_err(|e| PlatformError::blob_store(format!("Invalid content type: {}", e)))?;

        let mut form = Form::new()
            .part("file", file)
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature);
        if !folder.is_empty() {
            form = form.text("folder", folder);
        }

        let response = self
            .http_client
            .post(self.endpoint(upload.file_type, "upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| PlatformError::blob_store(format!("Failed to reach Cloudinary: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| PlatformError::blob_store(format!("Failed to parse upload response: {}", e)))?;

        debug!(public_id = %body.public_id, bytes = body.bytes, "Uploaded to Cloudinary");
        Ok(StoredBlob {
            public_id: body.public_id,
            url: body.secure_url,
            size: body.bytes,
            format: body.format,
            width: body.width,
            height: body.height,
            duration: body.duration,
            pages: body.pages,
        })
    }

    async fn delete(&self, public_id: &str, file_type: FileType) -> Result<()> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign(&[("public_id", public_id), ("timestamp", &timestamp)], &self.api_secret);

        let params = [
            ("public_id", public_id.to_string()),
            ("api_key", self.api_key.clone()),
            ("timestamp", timestamp),
            ("signature", signature),
        ];

        let response = self
            .http_client
            .post(self.endpoint(file_type, "destroy"))
            .form(&params)
            .send()
            .await
            .map_err(|e| PlatformError::blob_store(format!("Failed to reach Cloudinary: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let body: DestroyResponse = response
            .json()
            .await
            .map_err(|e| PlatformError::blob_store(format!("Failed to parse destroy response: {}", e)))?;

        match body.result.as_str() {
            "ok" | "not found" => Ok(()),
            other => Err(PlatformError::blob_store(format!("Cloudinary destroy returned '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_sorts_and_skips_empty() {
        let a = sign(&[("timestamp", "1700000000"), ("folder", "projects")], "secret");
        let b = sign(&[("folder", "projects"), ("timestamp", "1700000000"), ("tags", "")], "secret");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let mut hasher = Sha256::new();
        hasher.update(b"folder=projects&timestamp=1700000000secret");
        assert_eq!(a, hex::encode(hasher.finalize()));
    }

    #[test]
    fn test_folder_prefix() {
        let mut config = cs_config::StorageConfig::default();
        config.cloud_name = "demo".to_string();
        config.base_folder = "/corpsite/".to_string();
        let store = CloudinaryBlobStore::new(&config);
        assert_eq!(store.folder("projects"), "corpsite/projects");
        assert_eq!(store.folder(""), "corpsite");
        assert_eq!(
            store.endpoint(FileType::Document, "upload"),
            "https://api.cloudinary.com/v1_1/demo/raw/upload"
        );
    }
}
