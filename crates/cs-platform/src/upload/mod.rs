//! File uploads: blob store adapters and local metadata

pub mod api;
pub mod blob_store;
pub mod cloudinary;
pub mod entity;
pub mod memory;
pub mod repository;
pub mod service;

pub use blob_store::{BlobStore, BlobUpload, FileType, StoredBlob};
pub use cloudinary::CloudinaryBlobStore;
pub use entity::FileUpload;
pub use memory::MemoryBlobStore;
pub use repository::FileUploadRepository;
pub use service::{IncomingFile, UploadKind, UploadLimits, UploadService};
