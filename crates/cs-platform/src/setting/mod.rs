//! Site settings (key/value)

pub mod api;
pub mod entity;
pub mod repository;
pub mod service;

pub use entity::{Setting, SettingGroup, ValueType};
pub use repository::SettingRepository;
pub use service::SettingService;
