//! News Entities
//!
//! Articles carry a snapshot of their author so bylines survive renames.
//! Word count and reading time are recomputed from the content on every
//! write.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use bson::{doc, Document};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::display::reading_time_label;
use crate::shared::query::{to_bson_datetime, PublicVisibility};
use crate::shared::slug::slugify;
use crate::shared::types::{to_rfc3339_opt, ImageAsset, SeoMeta};
use crate::shared::validation::{clean, clean_list, clean_opt, Validation};
use crate::{Result, TsidGenerator};

/// Reading speed used for `readingTime`
pub const WORDS_PER_MINUTE: u32 = 200;

fn slug_or_derived(slug: Option<String>, name: &str) -> String {
    clean_opt(slug)
        .map(|s| s.to_lowercase())
        .unwrap_or_else(|| slugify(name))
}

/// Whitespace-separated tokens.
pub fn word_count(content: &str) -> u32 {
    content.split_whitespace().count() as u32
}

/// Minutes to read, rounded up, never below one.
pub fn reading_time(words: u32) -> u32 {
    words.div_ceil(WORDS_PER_MINUTE).max(1)
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsCategory {
    #[serde(rename = "_id")]
    pub id: String,

    pub name: String,

    pub slug: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// `#rrggbb`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[serde(default)]
    pub sort_order: i32,

    #[serde(default)]
    pub is_active: bool,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl PublicVisibility for NewsCategory {
    fn public_filter(_now: DateTime<Utc>) -> Document {
        doc! { "isActive": true }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateNewsCategoryInput {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateNewsCategoryInput {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

impl NewsCategory {
    pub fn create(input: CreateNewsCategoryInput, actor: Option<&str>, now: DateTime<Utc>) -> Result<Self> {
        let name = clean(input.name);
        let category = Self {
            id: TsidGenerator::generate(),
            slug: slug_or_derived(input.slug, &name),
            name,
            description: clean_opt(input.description),
            color: clean_opt(input.color).map(|c| c.to_lowercase()),
            sort_order: input.sort_order.unwrap_or(0),
            is_active: input.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
            created_by: actor.map(String::from),
            updated_by: actor.map(String::from),
        };
        category.validate()?;
        Ok(category)
    }

    pub fn apply(&mut self, patch: UpdateNewsCategoryInput, actor: Option<&str>, now: DateTime<Utc>) -> Result<()> {
        if let Some(name) = patch.name {
            self.name = clean(name);
        }
        if let Some(slug) = patch.slug {
            self.slug = clean(slug).to_lowercase();
        }
        if let Some(description) = patch.description {
            self.description = clean_opt(Some(description));
        }
        if let Some(color) = patch.color {
            self.color = clean_opt(Some(color)).map(|c| c.to_lowercase());
        }
        if let Some(order) = patch.sort_order {
            self.sort_order = order;
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        self.validate()?;
        self.updated_at = now;
        self.updated_by = actor.map(String::from).or(self.updated_by.take());
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let mut v = Validation::new();
        v.text("name", &self.name, 2, 100);
        v.slug("slug", &self.slug);
        v.text_opt("description", self.description.as_deref(), 500);
        v.hex_color("color", self.color.as_deref());
        v.into_result()
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewsCategoryResponse {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<NewsCategory> for NewsCategoryResponse {
    fn from(c: NewsCategory) -> Self {
        Self {
            id: c.id,
            name: c.name,
            slug: c.slug,
            description: c.description,
            color: c.color,
            sort_order: c.sort_order,
            is_active: c.is_active,
            created_at: c.created_at.to_rfc3339(),
            updated_at: c.updated_at.to_rfc3339(),
        }
    }
}

// ---------------------------------------------------------------------------
// Article
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ArticleStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

/// Byline captured when the article is written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSnapshot {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    #[serde(rename = "_id")]
    pub id: String,

    pub title: String,

    pub slug: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,

    pub content: String,

    pub category_id: String,

    pub author: AuthorSnapshot,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured_image: Option<ImageAsset>,

    pub status: ArticleStatus,

    /// Set the first time the article is published
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional"
    )]
    pub published_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub is_featured: bool,

    #[serde(default)]
    pub view_count: u64,

    #[serde(default)]
    pub word_count: u32,

    /// Minutes
    #[serde(default)]
    pub reading_time: u32,

    #[serde(default)]
    pub seo: SeoMeta,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl PublicVisibility for NewsArticle {
    fn public_filter(now: DateTime<Utc>) -> Document {
        doc! { "status": "published", "publishedAt": { "$lte": to_bson_datetime(now) } }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateArticleInput {
    pub title: String,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: String,
    pub category_id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub featured_image: Option<ImageAsset>,
    pub status: Option<ArticleStatus>,
    /// Scheduled publication time; defaults to now when published
    pub published_at: Option<DateTime<Utc>>,
    pub is_featured: Option<bool>,
    pub seo: Option<SeoMeta>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateArticleInput {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<String>,
    pub tags: Option<Vec<String>>,
    pub featured_image: Option<ImageAsset>,
    pub status: Option<ArticleStatus>,
    pub published_at: Option<DateTime<Utc>>,
    pub is_featured: Option<bool>,
    pub seo: Option<SeoMeta>,
}

impl NewsArticle {
    pub fn create(input: CreateArticleInput, author: AuthorSnapshot, now: DateTime<Utc>) -> Result<Self> {
        let title = clean(input.title);
        let actor = Some(author.id.clone());
        let mut article = Self {
            id: TsidGenerator::generate(),
            slug: slug_or_derived(input.slug, &title),
            title,
            excerpt: clean_opt(input.excerpt),
            content: input.content.trim().to_string(),
            category_id: clean(input.category_id).to_uppercase(),
            author,
            tags: normalize_tags(input.tags),
            featured_image: input.featured_image,
            status: ArticleStatus::Draft,
            published_at: input.published_at,
            is_featured: input.is_featured.unwrap_or(false),
            view_count: 0,
            word_count: 0,
            reading_time: 1,
            seo: input.seo.map(SeoMeta::cleaned).unwrap_or_default(),
            created_at: now,
            updated_at: now,
            created_by: actor.clone(),
            updated_by: actor,
        };
        article.set_status(input.status.unwrap_or_default(), now);
        article.recount();
        article.validate()?;
        Ok(article)
    }

    pub fn apply(&mut self, patch: UpdateArticleInput, actor: Option<&str>, now: DateTime<Utc>) -> Result<()> {
        if let Some(title) = patch.title {
            self.title = clean(title);
        }
        if let Some(slug) = patch.slug {
            self.slug = clean(slug).to_lowercase();
        }
        if let Some(excerpt) = patch.excerpt {
            self.excerpt = clean_opt(Some(excerpt));
        }
        if let Some(content) = patch.content {
            self.content = content.trim().to_string();
            self.recount();
        }
        if let Some(category_id) = patch.category_id {
            self.category_id = clean(category_id).to_uppercase();
        }
        if let Some(tags) = patch.tags {
            self.tags = normalize_tags(tags);
        }
        if let Some(image) = patch.featured_image {
            self.featured_image = Some(image);
        }
        if let Some(published_at) = patch.published_at {
            self.published_at = Some(published_at);
        }
        if let Some(status) = patch.status {
            self.set_status(status, now);
        }
        if let Some(featured) = patch.is_featured {
            self.is_featured = featured;
        }
        if let Some(seo) = patch.seo {
            self.seo = seo.cleaned();
        }
        self.validate()?;
        self.updated_at = now;
        self.updated_by = actor.map(String::from).or(self.updated_by.take());
        Ok(())
    }

    /// Status change; the first move to `published` stamps `publishedAt`.
    pub fn set_status(&mut self, status: ArticleStatus, now: DateTime<Utc>) {
        if status == ArticleStatus::Published && self.published_at.is_none() {
            self.published_at = Some(now);
        }
        self.status = status;
    }

    pub fn publish(&mut self, actor: Option<&str>, now: DateTime<Utc>) {
        self.set_status(ArticleStatus::Published, now);
        self.touch(actor, now);
    }

    /// Back to draft; the original publication time is kept.
    pub fn unpublish(&mut self, actor: Option<&str>, now: DateTime<Utc>) {
        self.set_status(ArticleStatus::Draft, now);
        self.touch(actor, now);
    }

    pub fn is_public(&self, now: DateTime<Utc>) -> bool {
        self.status == ArticleStatus::Published && self.published_at.is_some_and(|at| at <= now)
    }

    fn touch(&mut self, actor: Option<&str>, now: DateTime<Utc>) {
        self.updated_at = now;
        self.updated_by = actor.map(String::from).or(self.updated_by.take());
    }

    fn recount(&mut self) {
        self.word_count = word_count(&self.content);
        self.reading_time = reading_time(self.word_count);
    }

    fn validate(&self) -> Result<()> {
        let mut v = Validation::new();
        v.text("title", &self.title, 5, 200);
        v.slug("slug", &self.slug);
        v.text_opt("excerpt", self.excerpt.as_deref(), 500);
        v.text("content", &self.content, 20, 200_000);
        if !TsidGenerator::is_valid(&self.category_id) {
            v.record("categoryId", "must be a valid id");
        }
        v.max_items("tags", self.tags.len(), 20);
        v.each_text("tags", &self.tags, 50);
        if let Some(image) = &self.featured_image {
            image.validate("featuredImage", &mut v);
        }
        self.seo.validate(&mut v);
        v.into_result()
    }
}

/// Trimmed, lowercased, de-duplicated.
fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in clean_list(tags) {
        let tag = tag.to_lowercase();
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArticleResponse {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub category_id: String,
    pub author: AuthorSnapshot,
    pub tags: Vec<String>,
    pub featured_image: Option<ImageAsset>,
    pub status: ArticleStatus,
    pub published_at: Option<String>,
    pub is_featured: bool,
    pub view_count: u64,
    pub word_count: u32,
    pub reading_time: u32,
    pub reading_time_display: String,
    pub seo: SeoMeta,
    pub created_at: String,
    pub updated_at: String,
}

impl From<NewsArticle> for ArticleResponse {
    fn from(a: NewsArticle) -> Self {
        Self {
            reading_time_display: reading_time_label(a.reading_time),
            id: a.id,
            title: a.title,
            slug: a.slug,
            excerpt: a.excerpt,
            content: a.content,
            category_id: a.category_id,
            author: a.author,
            tags: a.tags,
            featured_image: a.featured_image,
            status: a.status,
            published_at: to_rfc3339_opt(a.published_at),
            is_featured: a.is_featured,
            view_count: a.view_count,
            word_count: a.word_count,
            reading_time: a.reading_time,
            seo: a.seo,
            created_at: a.created_at.to_rfc3339(),
            updated_at: a.updated_at.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn author() -> AuthorSnapshot {
        AuthorSnapshot { id: TsidGenerator::generate(), name: "Nguyễn Văn A".to_string() }
    }

    fn input(title: &str, words: usize) -> CreateArticleInput {
        CreateArticleInput {
            title: title.to_string(),
            slug: None,
            excerpt: None,
            content: vec!["chữ"; words].join(" "),
            category_id: TsidGenerator::generate(),
            tags: vec![" Đầu tư ".to_string(), "đầu tư".to_string()],
            featured_image: None,
            status: None,
            published_at: None,
            is_featured: None,
            seo: None,
        }
    }

    #[test]
    fn test_reading_time() {
        assert_eq!(reading_time(0), 1);
        assert_eq!(reading_time(200), 1);
        assert_eq!(reading_time(201), 2);
        assert_eq!(word_count("  một  hai\nba\tbốn "), 4);
    }

    #[test]
    fn test_create_derives_counts_and_slug() {
        let article = NewsArticle::create(input("Thị trường căn hộ 2024", 450), author(), Utc::now()).unwrap();
        assert_eq!(article.slug, "thi-truong-can-ho-2024");
        assert_eq!(article.word_count, 450);
        assert_eq!(article.reading_time, 3);
        assert_eq!(article.tags, vec!["đầu tư"]);
        assert_eq!(article.status, ArticleStatus::Draft);
        assert!(article.published_at.is_none());
        assert_eq!(article.created_by.as_deref(), Some(article.author.id.as_str()));
    }

    #[test]
    fn test_short_content_rejected() {
        let mut short = input("Tin ngắn gọn", 1);
        short.content = "quá ngắn".to_string();
        assert!(NewsArticle::create(short, author(), Utc::now()).is_err());
    }

    #[test]
    fn test_publish_stamps_once() {
        let now = Utc::now();
        let mut article = NewsArticle::create(input("Tin tức công ty", 30), author(), now).unwrap();
        article.publish(None, now);
        let first = article.published_at;
        assert_eq!(first, Some(now));
        assert!(article.is_public(now));

        article.unpublish(None, now + Duration::hours(1));
        assert!(!article.is_public(now + Duration::hours(1)));
        article.publish(None, now + Duration::hours(2));
        assert_eq!(article.published_at, first);
    }

    #[test]
    fn test_scheduled_article_not_yet_public() {
        let now = Utc::now();
        let mut scheduled = input("Tin sắp đăng", 30);
        scheduled.status = Some(ArticleStatus::Published);
        scheduled.published_at = Some(now + Duration::days(1));
        let article = NewsArticle::create(scheduled, author(), now).unwrap();
        assert!(!article.is_public(now));
    }

    #[test]
    fn test_patch_content_recounts() {
        let now = Utc::now();
        let mut article = NewsArticle::create(input("Tin tức công ty", 30), author(), now).unwrap();
        article
            .apply(
                UpdateArticleInput { content: Some(vec!["w"; 401].join(" ")), ..Default::default() },
                None,
                now,
            )
            .unwrap();
        assert_eq!(article.word_count, 401);
        assert_eq!(article.reading_time, 3);
    }

    #[test]
    fn test_category_color() {
        let bad = NewsCategory::create(
            CreateNewsCategoryInput {
                name: "Dự án".to_string(),
                slug: None,
                description: None,
                color: Some("red".to_string()),
                sort_order: None,
                is_active: None,
            },
            None,
            Utc::now(),
        );
        assert!(bad.is_err());
    }
}
