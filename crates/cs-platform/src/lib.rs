//! CorpSite Platform
//!
//! Backend for the corporate website:
//! - Real-estate projects and floor plans
//! - Ginseng catalog (categories, origins, products)
//! - News articles and categories
//! - Leads: contact messages, consultation requests, newsletter
//! - Careers: job postings and applications
//! - Site administration: users, roles, banners, settings, uploads,
//!   activity log, analytics and the dashboard overview
//!
//! ## Module Organization (Aggregate-based)
//!
//! Each aggregate contains:
//! - `entity` - Domain entities, inputs and response shapes
//! - `repository` - Data access
//! - `service` - Business rules
//! - `api` - REST endpoints

// Content aggregates
pub mod project;
pub mod floor_plan;
pub mod ginseng;
pub mod news;

// Leads
pub mod contact;
pub mod consultation;
pub mod newsletter;
pub mod careers;

// Site administration
pub mod user;
pub mod role;
pub mod banner;
pub mod setting;
pub mod upload;
pub mod activity;
pub mod analytics;
pub mod dashboard;

// Authentication & authorization
pub mod auth;

// Shared infrastructure
pub mod shared;

// Start-up
pub mod app;
pub mod seed;

// Re-export common types from shared
pub use shared::error::{PlatformError, Result};
pub use shared::tsid::TsidGenerator;

pub use app::Platform;
pub use seed::Seeder;
pub use shared::indexes::initialize_indexes;
pub use shared::authorization_service::{checks, AuthContext, AuthorizationService};
pub use auth::{AccountService, AuthService, PasswordService};
pub use upload::{BlobStore, CloudinaryBlobStore, MemoryBlobStore};
