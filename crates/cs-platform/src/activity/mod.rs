//! Activity log aggregate

pub mod api;
pub mod entity;
pub mod repository;
pub mod service;

pub use entity::{ActivityAction, ActivityLog};
pub use repository::ActivityRepository;
pub use service::ActivityService;
