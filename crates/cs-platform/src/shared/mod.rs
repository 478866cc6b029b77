//! Shared Module
//!
//! Cross-cutting concerns and shared utilities.

pub mod error;
pub mod tsid;
pub mod middleware;
pub mod api_common;
pub mod indexes;
pub mod repository;
pub mod query;
pub mod validation;
pub mod types;
pub mod slug;
pub mod display;

// APIs
pub mod health_api;

// Services
pub mod authorization_service;

// Re-export commonly used items
pub use error::{PlatformError, Result};
pub use tsid::TsidGenerator;
pub use middleware::{AppState, Authenticated, AuthLayer, ClientMeta, RequireAdmin};
pub use api_common::{ApiResponse, PaginationParams};
pub use health_api::health_router;
pub use authorization_service::AuthorizationService;
