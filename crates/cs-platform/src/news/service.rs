//! News Service
//!
//! Client reads of a single article count a view whether it is fetched by
//! slug or by id.

use std::sync::Arc;

use bson::{doc, Document};
use chrono::Utc;
use tracing::{info, warn};

use crate::activity::{ActivityAction, ActivityService};
use crate::news::entity::{
    AuthorSnapshot, CreateArticleInput, CreateNewsCategoryInput, NewsArticle, NewsCategory, UpdateArticleInput,
    UpdateNewsCategoryInput,
};
use crate::news::repository::{NewsArticleRepository, NewsCategoryRepository, NewsStats};
use crate::shared::api_common::{Page, PageRequest};
use crate::shared::authorization_service::AuthContext;
use crate::shared::error::{PlatformError, Result};
use crate::shared::query::with_public_visibility;

#[derive(Clone)]
pub struct NewsService {
    categories: Arc<NewsCategoryRepository>,
    articles: Arc<NewsArticleRepository>,
    activity: ActivityService,
}

impl NewsService {
    pub fn new(
        categories: Arc<NewsCategoryRepository>,
        articles: Arc<NewsArticleRepository>,
        activity: ActivityService,
    ) -> Self {
        Self {
            categories,
            articles,
            activity,
        }
    }

    // ---- categories ----

    pub async fn search_categories(&self, filter: Document, page: PageRequest) -> Result<Page<NewsCategory>> {
        self.categories.search(filter, page).await
    }

    pub async fn public_categories(&self) -> Result<Vec<NewsCategory>> {
        let filter = with_public_visibility::<NewsCategory>(Document::new(), Utc::now());
        self.categories.find_many(filter).await
    }

    pub async fn get_category(&self, id: &str) -> Result<NewsCategory> {
        self.categories.get(id).await
    }

    pub async fn create_category(&self, input: CreateNewsCategoryInput, actor: &AuthContext) -> Result<NewsCategory> {
        let category = NewsCategory::create(input, Some(actor.actor()), Utc::now())?;
        if self.categories.exists_by_name(&category.name, None).await? {
            return Err(PlatformError::duplicate("News category", "name", &category.name));
        }
        if self.categories.exists_by_slug(&category.slug).await? {
            return Err(PlatformError::duplicate("News category", "slug", &category.slug));
        }

        self.categories.insert(&category).await?;
        self.activity
            .log(
                actor,
                ActivityAction::Create,
                "news_category",
                &category.id,
                format!("Created news category {}", category.name),
            )
            .await;
        Ok(category)
    }

    pub async fn update_category(
        &self,
        id: &str,
        patch: UpdateNewsCategoryInput,
        actor: &AuthContext,
    ) -> Result<NewsCategory> {
        let mut category = self.categories.get(id).await?;
        let (previous_name, previous_slug) = (category.name.clone(), category.slug.clone());
        category.apply(patch, Some(actor.actor()), Utc::now())?;

        if category.name != previous_name && self.categories.exists_by_name(&category.name, Some(id)).await? {
            return Err(PlatformError::duplicate("News category", "name", &category.name));
        }
        if category.slug != previous_slug && self.categories.exists_by_slug(&category.slug).await? {
            return Err(PlatformError::duplicate("News category", "slug", &category.slug));
        }

        self.categories.update(&category).await?;
        self.activity
            .log(
                actor,
                ActivityAction::Update,
                "news_category",
                &category.id,
                format!("Updated news category {}", category.name),
            )
            .await;
        Ok(category)
    }

    pub async fn delete_category(&self, id: &str, actor: &AuthContext) -> Result<()> {
        let category = self.categories.get(id).await?;
        let articles = self.articles.count_in_category(&category.id).await?;
        if articles > 0 {
            return Err(PlatformError::conflict(format!(
                "Category {} still has {} article(s)",
                category.name, articles
            )));
        }

        self.categories.delete(&category.id).await?;
        self.activity
            .log(
                actor,
                ActivityAction::Delete,
                "news_category",
                &category.id,
                format!("Deleted news category {}", category.name),
            )
            .await;
        Ok(())
    }

    // ---- articles ----

    pub async fn search(&self, filter: Document, sort: Document, page: PageRequest) -> Result<Page<NewsArticle>> {
        self.articles.search(filter, sort, page).await
    }

    pub async fn search_public(&self, filter: Document, sort: Document, page: PageRequest) -> Result<Page<NewsArticle>> {
        let filter = with_public_visibility::<NewsArticle>(filter, Utc::now());
        self.articles.search(filter, sort, page).await
    }

    pub async fn featured(&self, limit: i64) -> Result<Vec<NewsArticle>> {
        let filter = with_public_visibility::<NewsArticle>(doc! { "isFeatured": true }, Utc::now());
        self.articles.find_many(filter, doc! { "publishedAt": -1 }, limit).await
    }

    pub async fn get(&self, id: &str) -> Result<NewsArticle> {
        self.articles.get(id).await
    }

    pub async fn view_by_slug(&self, slug: &str) -> Result<NewsArticle> {
        self.view(doc! { "slug": slug.to_lowercase() }, slug).await
    }

    pub async fn view_by_id(&self, id: &str) -> Result<NewsArticle> {
        self.view(doc! { "_id": id }, id).await
    }

    async fn view(&self, filter: Document, key: &str) -> Result<NewsArticle> {
        let filter = with_public_visibility::<NewsArticle>(filter, Utc::now());
        let mut article = self
            .articles
            .find_one(filter)
            .await?
            .ok_or_else(|| PlatformError::not_found("News article", key))?;

        match self.articles.increment_views(&article.id).await {
            Ok(_) => article.view_count += 1,
            Err(e) => warn!(article_id = %article.id, error = %e, "Failed to count article view"),
        }
        Ok(article)
    }

    pub async fn create(&self, input: CreateArticleInput, actor: &AuthContext) -> Result<NewsArticle> {
        let author = AuthorSnapshot {
            id: actor.user_id.clone(),
            name: actor.full_name.clone(),
        };
        let article = NewsArticle::create(input, author, Utc::now())?;
        self.ensure_category(&article.category_id).await?;
        if self.articles.exists_by_slug(&article.slug).await? {
            return Err(PlatformError::duplicate("News article", "slug", &article.slug));
        }

        self.articles.insert(&article).await?;
        info!(article_id = %article.id, status = ?article.status, "News article created");
        self.activity
            .log(actor, ActivityAction::Create, "news_article", &article.id, format!("Created article {}", article.title))
            .await;
        Ok(article)
    }

    pub async fn update(&self, id: &str, patch: UpdateArticleInput, actor: &AuthContext) -> Result<NewsArticle> {
        let mut article = self.articles.get(id).await?;
        let (previous_slug, previous_category) = (article.slug.clone(), article.category_id.clone());
        article.apply(patch, Some(actor.actor()), Utc::now())?;

        if article.category_id != previous_category {
            self.ensure_category(&article.category_id).await?;
        }
        if article.slug != previous_slug && self.articles.exists_by_slug(&article.slug).await? {
            return Err(PlatformError::duplicate("News article", "slug", &article.slug));
        }

        self.articles.update(&article).await?;
        self.activity
            .log(actor, ActivityAction::Update, "news_article", &article.id, format!("Updated article {}", article.title))
            .await;
        Ok(article)
    }

    pub async fn publish(&self, id: &str, actor: &AuthContext) -> Result<NewsArticle> {
        let mut article = self.articles.get(id).await?;
        article.publish(Some(actor.actor()), Utc::now());
        self.articles.update(&article).await?;
        self.activity
            .log(
                actor,
                ActivityAction::Publish,
                "news_article",
                &article.id,
                format!("Published article {}", article.title),
            )
            .await;
        Ok(article)
    }

    pub async fn unpublish(&self, id: &str, actor: &AuthContext) -> Result<NewsArticle> {
        let mut article = self.articles.get(id).await?;
        article.unpublish(Some(actor.actor()), Utc::now());
        self.articles.update(&article).await?;
        self.activity
            .log(
                actor,
                ActivityAction::StatusChange,
                "news_article",
                &article.id,
                format!("Unpublished article {}", article.title),
            )
            .await;
        Ok(article)
    }

    pub async fn delete(&self, id: &str, actor: &AuthContext) -> Result<()> {
        let article = self.articles.get(id).await?;
        self.articles.delete(&article.id).await?;
        self.activity
            .log(actor, ActivityAction::Delete, "news_article", &article.id, format!("Deleted article {}", article.title))
            .await;
        Ok(())
    }

    pub async fn stats(&self) -> Result<NewsStats> {
        self.articles.stats().await
    }

    pub async fn count(&self, filter: Document) -> Result<u64> {
        self.articles.count(filter).await
    }

    async fn ensure_category(&self, category_id: &str) -> Result<()> {
        if self.categories.exists(category_id).await? {
            Ok(())
        } else {
            Err(PlatformError::validation(format!(
                "categoryId: category {} does not exist",
                category_id
            )))
        }
    }
}
