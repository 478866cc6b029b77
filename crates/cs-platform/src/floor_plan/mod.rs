//! Project floor plans

pub mod api;
pub mod entity;
pub mod repository;
pub mod service;

pub use entity::FloorPlan;
pub use repository::FloorPlanRepository;
pub use service::FloorPlanService;
