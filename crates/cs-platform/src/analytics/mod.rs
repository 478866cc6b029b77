//! Front-end event tracking and traffic summaries

pub mod api;
pub mod entity;
pub mod repository;
pub mod service;

pub use entity::{AnalyticsEvent, Device, EventType};
pub use repository::{AnalyticsRepository, AnalyticsSummary};
pub use service::AnalyticsService;
