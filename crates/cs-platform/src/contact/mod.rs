//! Contact form messages

pub mod api;
pub mod entity;
pub mod repository;
pub mod service;

pub use entity::{ContactMessage, ContactStatus, InquiryType};
pub use repository::{ContactRepository, ContactStats};
pub use service::ContactService;
