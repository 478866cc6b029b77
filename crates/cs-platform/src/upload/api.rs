//! Upload API
//!
//! Admin: POST /image, /document, /video, /files (multipart), list, get,
//! update alt text, delete. Client: GET /:id/download redirects to the blob.
//! With the in-memory store, GET /files/*publicId serves the blob itself.

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use bson::Document;
use serde::Deserialize;

use crate::shared::api_common::{ApiResponse, JsonBody, PaginationParams, QueryParams};
use crate::shared::error::PlatformError;
use crate::shared::middleware::RequireAdmin;
use crate::shared::query::FilterBuilder;
use crate::upload::blob_store::FileType;
use crate::upload::entity::{FileUploadResponse, UpdateFileInput};
use crate::upload::memory::MemoryBlobStore;
use crate::upload::service::{IncomingFile, UploadKind, UploadService};

fn multipart_error(e: MultipartError) -> PlatformError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        PlatformError::PayloadTooLarge { message: e.body_text() }
    } else {
        PlatformError::validation(format!("Invalid multipart body: {}", e.body_text()))
    }
}

/// File parts plus the optional `folder` text field of a multipart body.
pub async fn read_multipart(mut multipart: Multipart) -> Result<(Vec<IncomingFile>, Option<String>), PlatformError> {
    let mut files = Vec::new();
    let mut folder = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.file_name().map(String::from) {
            Some(file_name) => {
                let content_type = field.content_type().map(String::from);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                files.push(IncomingFile {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            None if field.name() == Some("folder") => {
                folder = Some(field.text().await.map_err(multipart_error)?);
            }
            // other text fields are ignored
            None => {}
        }
    }

    Ok((files, folder))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadsQuery {
    #[serde(flatten)]
    pub pagination: PaginationParams,
    pub q: Option<String>,
    pub file_type: Option<String>,
    pub folder: Option<String>,
    pub uploaded_by: Option<String>,
}

impl UploadsQuery {
    pub fn to_filter(&self) -> Document {
        FilterBuilder::new()
            .text(self.q.as_deref(), &["originalName", "altText"])
            .enum_value::<FileType>("fileType", self.file_type.as_deref())
            .equals_ci("folder", self.folder.as_deref())
            .reference("uploadedBy", self.uploaded_by.as_deref())
            .build()
    }
}

#[derive(Clone)]
pub struct UploadsState {
    pub uploads: UploadService,
}

async fn upload(
    state: UploadsState,
    admin: RequireAdmin,
    kind: UploadKind,
    multipart: Multipart,
) -> Result<ApiResponse<Vec<FileUploadResponse>>, PlatformError> {
    let (files, folder) = read_multipart(multipart).await?;
    let records = state
        .uploads
        .upload_many(kind, files, folder.as_deref(), &admin)
        .await?;
    let count = records.len();
    Ok(ApiResponse::created(records.into_iter().map(Into::into).collect())
        .with_message(format!("{} file(s) uploaded", count)))
}

pub async fn upload_images(
    State(state): State<UploadsState>,
    admin: RequireAdmin,
    multipart: Multipart,
) -> Result<ApiResponse<Vec<FileUploadResponse>>, PlatformError> {
    upload(state, admin, UploadKind::Image, multipart).await
}

pub async fn upload_documents(
    State(state): State<UploadsState>,
    admin: RequireAdmin,
    multipart: Multipart,
) -> Result<ApiResponse<Vec<FileUploadResponse>>, PlatformError> {
    upload(state, admin, UploadKind::Document, multipart).await
}

pub async fn upload_videos(
    State(state): State<UploadsState>,
    admin: RequireAdmin,
    multipart: Multipart,
) -> Result<ApiResponse<Vec<FileUploadResponse>>, PlatformError> {
    upload(state, admin, UploadKind::Video, multipart).await
}

pub async fn upload_files(
    State(state): State<UploadsState>,
    admin: RequireAdmin,
    multipart: Multipart,
) -> Result<ApiResponse<Vec<FileUploadResponse>>, PlatformError> {
    upload(state, admin, UploadKind::Mixed, multipart).await
}

pub async fn list_uploads(
    State(state): State<UploadsState>,
    _admin: RequireAdmin,
    QueryParams(query): QueryParams<UploadsQuery>,
) -> Result<ApiResponse<Vec<FileUploadResponse>>, PlatformError> {
    let page = state
        .uploads
        .search(query.to_filter(), query.pagination.to_request())
        .await?;
    Ok(ApiResponse::paginated(page.map(Into::into)))
}

pub async fn get_upload(
    State(state): State<UploadsState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<FileUploadResponse>, PlatformError> {
    Ok(ApiResponse::ok(state.uploads.get(&id).await?.into()))
}

pub async fn update_upload(
    State(state): State<UploadsState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<UpdateFileInput>,
) -> Result<ApiResponse<FileUploadResponse>, PlatformError> {
    let file = state.uploads.update(&id, patch, &admin).await?;
    Ok(ApiResponse::ok(file.into()).with_message("File updated"))
}

pub async fn delete_upload(
    State(state): State<UploadsState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, PlatformError> {
    state.uploads.delete(&id, &admin).await?;
    Ok(ApiResponse::message("File deleted"))
}

pub async fn download(
    State(state): State<UploadsState>,
    Path(id): Path<String>,
) -> Result<Redirect, PlatformError> {
    let url = state.uploads.download_url(&id).await?;
    Ok(Redirect::temporary(&url))
}

pub fn uploads_admin_router(state: UploadsState) -> Router {
    let body_limit = state.uploads.limits().request_limit();
    Router::new()
        .route("/", get(list_uploads))
        .route("/image", post(upload_images))
        .route("/document", post(upload_documents))
        .route("/video", post(upload_videos))
        .route("/files", post(upload_files))
        .route("/:id", get(get_upload).put(update_upload).delete(delete_upload))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

pub fn uploads_router(state: UploadsState) -> Router {
    Router::new()
        .route("/:id/download", get(download))
        .with_state(state)
}

async fn serve_memory_blob(
    State(store): State<Arc<MemoryBlobStore>>,
    Path(public_id): Path<String>,
) -> Result<Response, PlatformError> {
    let blob = store
        .get(&public_id)
        .ok_or_else(|| PlatformError::not_found("File", &public_id))?;
    Ok(([(header::CONTENT_TYPE, blob.content_type)], blob.bytes).into_response())
}

/// Serves blobs of the in-memory store under its base URL.
pub fn memory_files_router(store: Arc<MemoryBlobStore>) -> Router {
    Router::new()
        .route("/*public_id", get(serve_memory_blob))
        .with_state(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::Query;
    use axum::http::{Request, Uri};
    use bson::doc;
    use bytes::Bytes;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::upload::blob_store::{BlobStore, BlobUpload};

    #[tokio::test]
    async fn test_memory_blob_url_is_served() {
        let store = Arc::new(MemoryBlobStore::new("http://127.0.0.1:5000/files"));
        let stored = store
            .upload(BlobUpload {
                file_name: "bang-gia.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                file_type: FileType::Document,
                folder: "documents".to_string(),
                bytes: Bytes::from_static(b"%PDF-1.7"),
            })
            .await
            .unwrap();
        let path = stored.url.trim_start_matches("http://127.0.0.1:5000");
        assert!(path.starts_with("/files/documents/"));

        let app = Router::new().nest("/files", memory_files_router(store.clone()));
        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"%PDF-1.7");

        let request = Request::builder().uri("/files/documents/missing").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_filter() {
        let uri: Uri = "/?fileType=image&folder=projects&uploadedBy=bad".parse().unwrap();
        let Query(query) = Query::<UploadsQuery>::try_from_uri(&uri).unwrap();
        let filter = query.to_filter();
        let and = filter.get_array("$and").unwrap();
        assert_eq!(and.len(), 2);
        assert_eq!(and[0].as_document().unwrap(), &doc! { "fileType": "image" });
    }
}
