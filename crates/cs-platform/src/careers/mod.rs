//! Careers: job postings and applications

pub mod api;
pub mod entity;
pub mod repository;
pub mod service;

pub use entity::{ApplicationStatus, JobApplication, JobPosting, JobStatus};
pub use repository::{ApplicationStats, JobApplicationRepository, JobPostingRepository, JobStats};
pub use service::{CareersService, CareersStats};
