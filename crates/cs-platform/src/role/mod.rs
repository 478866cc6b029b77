//! Role and permission aggregate

pub mod api;
pub mod entity;
pub mod repository;
pub mod service;

pub use entity::{Permission, Role};
pub use repository::{PermissionRepository, RoleRepository};
pub use service::RoleService;
