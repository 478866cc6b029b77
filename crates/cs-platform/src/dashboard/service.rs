//! Dashboard Service
//!
//! Read-only overview that fans out one count per collection.

use bson::doc;
use chrono::{Duration, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::activity::entity::ActivityLogResponse;
use crate::activity::ActivityService;
use crate::analytics::AnalyticsService;
use crate::banner::BannerService;
use crate::careers::CareersService;
use crate::consultation::ConsultationService;
use crate::contact::ContactService;
use crate::ginseng::entity::LOW_STOCK_THRESHOLD;
use crate::ginseng::GinsengService;
use crate::news::NewsService;
use crate::newsletter::NewsletterService;
use crate::project::ProjectService;
use crate::shared::error::Result;
use crate::upload::UploadService;
use crate::user::UserService;

const RECENT_ACTIVITY: i64 = 10;
const TRAFFIC_DAYS: i64 = 7;

/// Total rows and the subset that needs attention or is live
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tally {
    pub total: u64,
    pub highlighted: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardOverview {
    /// highlighted: active projects
    pub projects: Tally,
    /// highlighted: products at or below the low-stock threshold
    pub products: Tally,
    /// highlighted: published articles
    pub articles: Tally,
    /// highlighted: unread messages
    pub contacts: Tally,
    /// highlighted: new requests
    pub consultations: Tally,
    /// highlighted: active subscribers
    pub subscribers: Tally,
    /// highlighted: open postings
    pub jobs: Tally,
    /// highlighted: applications not yet reviewed
    pub applications: Tally,
    /// highlighted: active accounts
    pub users: Tally,
    /// highlighted: active banners
    pub banners: Tally,
    pub uploads: u64,
    pub events_last_7_days: u64,
    pub recent_activity: Vec<ActivityLogResponse>,
}

#[derive(Clone)]
pub struct DashboardService {
    pub projects: ProjectService,
    pub ginseng: GinsengService,
    pub news: NewsService,
    pub contacts: ContactService,
    pub consultations: ConsultationService,
    pub newsletter: NewsletterService,
    pub careers: CareersService,
    pub users: UserService,
    pub banners: BannerService,
    pub uploads: UploadService,
    pub analytics: AnalyticsService,
    pub activity: ActivityService,
}

impl DashboardService {
    pub async fn overview(&self) -> Result<DashboardOverview> {
        let all = doc! {};
        let since = Utc::now() - Duration::days(TRAFFIC_DAYS);

        let (projects, products, articles, contacts, consultations, subscribers) = futures::try_join!(
            self.tally(self.projects.count(all.clone()), self.projects.count(doc! { "isActive": true })),
            self.tally(
                self.ginseng.count_products(all.clone()),
                self.ginseng.count_products(doc! { "stock": { "$lte": LOW_STOCK_THRESHOLD as i64 } }),
            ),
            self.tally(self.news.count(all.clone()), self.news.count(doc! { "status": "published" })),
            self.tally(self.contacts.count(all.clone()), self.contacts.count(doc! { "status": "new" })),
            self.tally(
                self.consultations.count(all.clone()),
                self.consultations.count(doc! { "status": "new" }),
            ),
            self.tally(self.newsletter.count(all.clone()), self.newsletter.count(doc! { "status": "active" })),
        )?;

        let (jobs, applications, users, banners, uploads, events, recent) = futures::try_join!(
            self.tally(
                self.careers.count_jobs(all.clone()),
                self.careers.count_jobs(doc! { "status": "open", "isActive": true }),
            ),
            self.tally(
                self.careers.count_applications(all.clone()),
                self.careers.count_applications(doc! { "status": "submitted" }),
            ),
            self.tally(self.users.count(all.clone()), self.users.count(doc! { "status": "active" })),
            self.tally(self.banners.count(all.clone()), self.banners.count(doc! { "isActive": true })),
            self.uploads.count(),
            self.analytics.count_since(since),
            self.activity.recent(RECENT_ACTIVITY),
        )?;

        Ok(DashboardOverview {
            projects,
            products,
            articles,
            contacts,
            consultations,
            subscribers,
            jobs,
            applications,
            users,
            banners,
            uploads,
            events_last_7_days: events,
            recent_activity: recent.into_iter().map(Into::into).collect(),
        })
    }

    async fn tally(
        &self,
        total: impl std::future::Future<Output = Result<u64>>,
        highlighted: impl std::future::Future<Output = Result<u64>>,
    ) -> Result<Tally> {
        let (total, highlighted) = futures::try_join!(total, highlighted)?;
        Ok(Tally { total, highlighted })
    }
}
