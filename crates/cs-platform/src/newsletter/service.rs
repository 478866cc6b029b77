//! Newsletter Service

use std::sync::Arc;

use bson::Document;
use chrono::Utc;
use tracing::{debug, info};

use crate::activity::{ActivityAction, ActivityService};
use crate::newsletter::entity::{
    normalize_email, NewsletterSubscriber, SubscribeInput, SubscriberStatus,
};
use crate::newsletter::repository::{NewsletterRepository, NewsletterStats};
use crate::shared::api_common::{Page, PageRequest};
use crate::shared::authorization_service::AuthContext;
use crate::shared::error::Result;
use crate::shared::middleware::ClientMeta;

/// What a public subscribe call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Created,
    Resubscribed,
    AlreadySubscribed,
}

#[derive(Clone)]
pub struct NewsletterService {
    subscribers: Arc<NewsletterRepository>,
    activity: ActivityService,
}

impl NewsletterService {
    pub fn new(subscribers: Arc<NewsletterRepository>, activity: ActivityService) -> Self {
        Self { subscribers, activity }
    }

    pub async fn subscribe(
        &self,
        input: SubscribeInput,
        client: ClientMeta,
    ) -> Result<(NewsletterSubscriber, SubscribeOutcome)> {
        let now = Utc::now();
        let email = normalize_email(&input.email);

        match self.subscribers.find_by_email(&email).await? {
            Some(mut existing) => {
                let outcome = if existing.is_active() {
                    SubscribeOutcome::AlreadySubscribed
                } else {
                    SubscribeOutcome::Resubscribed
                };
                existing.resubscribe(input, now)?;
                self.subscribers.update(&existing).await?;
                info!(subscriber_id = %existing.id, outcome = ?outcome, "Newsletter subscription refreshed");
                Ok((existing, outcome))
            }
            None => {
                let subscriber = NewsletterSubscriber::create(input, client, now)?;
                self.subscribers.insert(&subscriber).await?;
                info!(subscriber_id = %subscriber.id, "Newsletter subscriber added");
                Ok((subscriber, SubscribeOutcome::Created))
            }
        }
    }

    /// Unknown addresses succeed silently so the endpoint cannot be used to
    /// enumerate the list.
    pub async fn unsubscribe(&self, email: &str) -> Result<()> {
        let email = normalize_email(email);
        match self.subscribers.find_by_email(&email).await? {
            Some(mut subscriber) => {
                if subscriber.status != SubscriberStatus::Unsubscribed {
                    subscriber.change_status(SubscriberStatus::Unsubscribed, None, Utc::now());
                    self.subscribers.update(&subscriber).await?;
                    info!(subscriber_id = %subscriber.id, "Newsletter subscriber unsubscribed");
                }
            }
            None => debug!("Unsubscribe requested for an unknown address"),
        }
        Ok(())
    }

    pub async fn search(&self, filter: Document, page: PageRequest) -> Result<Page<NewsletterSubscriber>> {
        self.subscribers.search(filter, page).await
    }

    pub async fn get(&self, id: &str) -> Result<NewsletterSubscriber> {
        self.subscribers.get(id).await
    }

    pub async fn change_status(
        &self,
        id: &str,
        status: SubscriberStatus,
        actor: &AuthContext,
    ) -> Result<NewsletterSubscriber> {
        let mut subscriber = self.subscribers.get(id).await?;
        let previous = subscriber.status;
        subscriber.change_status(status, Some(actor.actor()), Utc::now());
        self.subscribers.update(&subscriber).await?;
        self.activity
            .log(
                actor,
                ActivityAction::StatusChange,
                "newsletter",
                &subscriber.id,
                format!("Subscriber {} {:?} -> {:?}", subscriber.email, previous, status),
            )
            .await;
        Ok(subscriber)
    }

    pub async fn delete(&self, id: &str, actor: &AuthContext) -> Result<()> {
        let subscriber = self.subscribers.get(id).await?;
        self.subscribers.delete(&subscriber.id).await?;
        self.activity
            .log(
                actor,
                ActivityAction::Delete,
                "newsletter",
                &subscriber.id,
                format!("Deleted subscriber {}", subscriber.email),
            )
            .await;
        Ok(())
    }

    pub async fn stats(&self) -> Result<NewsletterStats> {
        self.subscribers.stats().await
    }

    pub async fn count(&self, filter: Document) -> Result<u64> {
        self.subscribers.count(filter).await
    }
}
