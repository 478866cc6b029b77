//! Ginseng catalog: categories, origins and products

pub mod api;
pub mod entity;
pub mod repository;
pub mod service;

pub use entity::{GinsengCategory, GinsengGrade, GinsengOrigin, GinsengProduct, ProductStatus};
pub use repository::{CategoryRepository, OriginRepository, ProductRepository, ProductStats};
pub use service::GinsengService;
