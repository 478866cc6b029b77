//! Banner Service

use std::sync::Arc;

use bson::{doc, Document};
use chrono::Utc;
use tracing::debug;

use crate::activity::{ActivityAction, ActivityService};
use crate::banner::entity::{Banner, BannerPosition, CreateBannerInput, UpdateBannerInput};
use crate::banner::repository::{BannerRepository, BannerStats};
use crate::shared::api_common::{Page, PageRequest};
use crate::shared::authorization_service::AuthContext;
use crate::shared::error::{PlatformError, Result};
use crate::shared::query::with_public_visibility;

/// Counter bumped by the public tracking endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerEvent {
    Impression,
    Click,
}

impl BannerEvent {
    fn field(self) -> &'static str {
        match self {
            BannerEvent::Impression => "impressionCount",
            BannerEvent::Click => "clickCount",
        }
    }
}

#[derive(Clone)]
pub struct BannerService {
    banners: Arc<BannerRepository>,
    activity: ActivityService,
}

impl BannerService {
    pub fn new(banners: Arc<BannerRepository>, activity: ActivityService) -> Self {
        Self { banners, activity }
    }

    /// Banners on display now, optionally for one slot.
    pub async fn live(&self, position: Option<BannerPosition>) -> Result<Vec<Banner>> {
        let filter = match position {
            Some(position) => doc! { "position": bson::to_bson(&position)? },
            None => Document::new(),
        };
        self.banners
            .find_many(with_public_visibility::<Banner>(filter, Utc::now()))
            .await
    }

    pub async fn track(&self, id: &str, event: BannerEvent) -> Result<()> {
        if self.banners.increment_visible(id, event.field(), Utc::now()).await? {
            debug!(banner_id = %id, event = ?event, "Banner event tracked");
            Ok(())
        } else {
            Err(PlatformError::not_found("Banner", id))
        }
    }

    pub async fn search(&self, filter: Document, page: PageRequest) -> Result<Page<Banner>> {
        self.banners.search(filter, page).await
    }

    pub async fn get(&self, id: &str) -> Result<Banner> {
        self.banners.get(id).await
    }

    pub async fn create(&self, input: CreateBannerInput, actor: &AuthContext) -> Result<Banner> {
        let banner = Banner::create(input, Some(actor.actor()), Utc::now())?;
        self.banners.insert(&banner).await?;
        self.activity
            .log(actor, ActivityAction::Create, "banner", &banner.id, format!("Created banner {}", banner.title))
            .await;
        Ok(banner)
    }

    pub async fn update(&self, id: &str, patch: UpdateBannerInput, actor: &AuthContext) -> Result<Banner> {
        let mut banner = self.banners.get(id).await?;
        banner.apply(patch, Some(actor.actor()), Utc::now())?;
        self.banners.update(&banner).await?;
        self.activity
            .log(actor, ActivityAction::Update, "banner", &banner.id, format!("Updated banner {}", banner.title))
            .await;
        Ok(banner)
    }

    pub async fn delete(&self, id: &str, actor: &AuthContext) -> Result<()> {
        let banner = self.banners.get(id).await?;
        self.banners.delete(&banner.id).await?;
        self.activity
            .log(actor, ActivityAction::Delete, "banner", &banner.id, format!("Deleted banner {}", banner.title))
            .await;
        Ok(())
    }

    pub async fn stats(&self) -> Result<BannerStats> {
        self.banners.stats(Utc::now()).await
    }

    pub async fn count(&self, filter: Document) -> Result<u64> {
        self.banners.count(filter).await
    }
}
