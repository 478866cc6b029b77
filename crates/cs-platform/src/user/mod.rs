//! User aggregate

pub mod api;
pub mod entity;
pub mod repository;
pub mod service;

pub use entity::{User, UserRole, UserStatus};
pub use repository::UserRepository;
pub use service::UserService;
