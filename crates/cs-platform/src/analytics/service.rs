//! Analytics Service

use std::sync::Arc;

use bson::doc;
use chrono::{DateTime, Duration, Utc};

use crate::analytics::entity::{AnalyticsEvent, TrackEventInput};
use crate::analytics::repository::{AnalyticsRepository, AnalyticsSummary};
use crate::shared::error::{PlatformError, Result};
use crate::shared::middleware::ClientMeta;
use crate::shared::query::to_bson_datetime;

/// Window used when the caller gives no lower bound
pub const DEFAULT_WINDOW_DAYS: i64 = 30;
const MAX_WINDOW_DAYS: i64 = 366;

#[derive(Clone)]
pub struct AnalyticsService {
    events: Arc<AnalyticsRepository>,
}

impl AnalyticsService {
    pub fn new(events: Arc<AnalyticsRepository>) -> Self {
        Self { events }
    }

    pub async fn track(&self, input: TrackEventInput, client: ClientMeta) -> Result<AnalyticsEvent> {
        let event = AnalyticsEvent::create(input, client, Utc::now())?;
        self.events.insert(&event).await?;
        Ok(event)
    }

    /// Events recorded at or after `since`.
    pub async fn count_since(&self, since: DateTime<Utc>) -> Result<u64> {
        self.events
            .count(doc! { "createdAt": { "$gte": to_bson_datetime(since) } })
            .await
    }

    pub async fn summary(&self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Result<AnalyticsSummary> {
        let (from, to) = resolve_window(from, to, Utc::now())?;
        self.events.summary(from, to).await
    }
}

/// Fill in missing bounds and reject inverted or oversized windows.
pub fn resolve_window(
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let to = to.unwrap_or(now);
    let from = from.unwrap_or(to - Duration::days(DEFAULT_WINDOW_DAYS));
    if from > to {
        return Err(PlatformError::validation("from: must not be after to"));
    }
    if to - from > Duration::days(MAX_WINDOW_DAYS) {
        return Err(PlatformError::validation(format!(
            "to: range must not exceed {} days",
            MAX_WINDOW_DAYS
        )));
    }
    Ok((from, to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_window() {
        let now = Utc.with_ymd_and_hms(2026, 5, 31, 12, 0, 0).unwrap();
        let (from, to) = resolve_window(None, None, now).unwrap();
        assert_eq!(to, now);
        assert_eq!(to - from, Duration::days(30));
    }

    #[test]
    fn test_inverted_window_rejected() {
        let now = Utc::now();
        assert!(resolve_window(Some(now), Some(now - Duration::days(1)), now).is_err());
    }

    #[test]
    fn test_oversized_window_rejected() {
        let now = Utc::now();
        assert!(resolve_window(Some(now - Duration::days(400)), None, now).is_err());
        assert!(resolve_window(Some(now - Duration::days(365)), None, now).is_ok());
    }
}
