//! Site banners

pub mod api;
pub mod entity;
pub mod repository;
pub mod service;

pub use entity::{Banner, BannerPosition, LinkTarget};
pub use repository::{BannerRepository, BannerStats};
pub use service::{BannerEvent, BannerService};
