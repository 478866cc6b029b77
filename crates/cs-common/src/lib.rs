//! Shared runtime helpers for the CorpSite services.

use chrono::{DateTime, Utc};
use serde::Serialize;

pub mod logging;

/// Build identity reported by the health endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub started_at: DateTime<Utc>,
}

impl ServiceInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            started_at: Utc::now(),
        }
    }

    /// Whole seconds since the service started.
    pub fn uptime_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.started_at).num_seconds().max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_uptime_never_negative() {
        let info = ServiceInfo::new("corpsite", "0.1.0");
        assert_eq!(info.uptime_secs(info.started_at - Duration::seconds(5)), 0);
        assert_eq!(info.uptime_secs(info.started_at + Duration::seconds(90)), 90);
    }
}
