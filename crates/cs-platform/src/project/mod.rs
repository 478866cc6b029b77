//! Real-estate projects

pub mod api;
pub mod entity;
pub mod repository;
pub mod service;

pub use entity::{Project, ProjectStatus, ProjectType};
pub use repository::{ProjectRepository, ProjectStats};
pub use service::ProjectService;
