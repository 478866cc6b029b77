//! News articles and categories

pub mod api;
pub mod entity;
pub mod repository;
pub mod service;

pub use entity::{ArticleStatus, AuthorSnapshot, NewsArticle, NewsCategory};
pub use repository::{NewsArticleRepository, NewsCategoryRepository, NewsStats};
pub use service::NewsService;
