//! Consultation requests (sales leads)

pub mod api;
pub mod entity;
pub mod repository;
pub mod service;

pub use entity::{ConsultationRequest, ConsultationStatus, LeadSource};
pub use repository::{ConsultationRepository, ConsultationStats};
pub use service::ConsultationService;
