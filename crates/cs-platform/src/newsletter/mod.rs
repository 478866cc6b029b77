//! Newsletter subscriptions

pub mod api;
pub mod entity;
pub mod repository;
pub mod service;

pub use entity::{Interest, NewsletterSubscriber, SubscriberStatus};
pub use repository::{NewsletterRepository, NewsletterStats};
pub use service::{NewsletterService, SubscribeOutcome};
