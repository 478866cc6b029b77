//! Back-office overview

pub mod api;
pub mod service;

pub use service::{DashboardOverview, DashboardService, Tally};
