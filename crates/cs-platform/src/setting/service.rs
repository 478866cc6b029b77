//! Site Setting Service

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use bson::{doc, Document};
use chrono::Utc;
use serde_json::Value;

use crate::activity::{ActivityAction, ActivityLog, ActivityService};
use crate::setting::entity::{normalize_key, BulkSettingEntry, Setting, SettingGroup, UpsertSettingInput};
use crate::setting::repository::SettingRepository;
use crate::shared::authorization_service::AuthContext;
use crate::shared::error::{PlatformError, Result};
use crate::shared::query::with_public_visibility;

const MAX_BULK: usize = 100;

#[derive(Clone)]
pub struct SettingService {
    settings: Arc<SettingRepository>,
    activity: ActivityService,
}

impl SettingService {
    pub fn new(settings: Arc<SettingRepository>, activity: ActivityService) -> Self {
        Self { settings, activity }
    }

    /// Public settings as a flat `key -> value` map.
    pub async fn public_values(&self, group: Option<SettingGroup>) -> Result<BTreeMap<String, Value>> {
        let filter = match group {
            Some(group) => doc! { "group": bson::to_bson(&group)? },
            None => Document::new(),
        };
        let settings = self
            .settings
            .find_many(with_public_visibility::<Setting>(filter, Utc::now()))
            .await?;
        Ok(settings.into_iter().map(|s| (s.key, s.value)).collect())
    }

    pub async fn list(&self, group: Option<SettingGroup>) -> Result<Vec<Setting>> {
        let filter = match group {
            Some(group) => doc! { "group": bson::to_bson(&group)? },
            None => Document::new(),
        };
        self.settings.find_many(filter).await
    }

    pub async fn get(&self, key: &str) -> Result<Setting> {
        let key = normalize_key(key);
        self.settings
            .find_by_key(&key)
            .await?
            .ok_or_else(|| PlatformError::not_found("Setting", key))
    }

    /// Create the key or overwrite its value. Returns the stored setting and
    /// whether it was newly created.
    pub async fn upsert(&self, key: &str, input: UpsertSettingInput, actor: &AuthContext) -> Result<(Setting, bool)> {
        let (setting, created) = self.write(key, input, actor).await?;
        self.activity
            .log(
                actor,
                if created { ActivityAction::Create } else { ActivityAction::Update },
                "setting",
                &setting.id,
                format!("Saved setting {}", setting.key),
            )
            .await;
        Ok((setting, created))
    }

    /// Upsert several keys. Every entry is validated before anything is
    /// written, so a bad entry rejects the whole batch.
    pub async fn bulk_upsert(&self, entries: Vec<BulkSettingEntry>, actor: &AuthContext) -> Result<Vec<Setting>> {
        if entries.is_empty() {
            return Err(PlatformError::validation("settings: at least one entry is required"));
        }
        if entries.len() > MAX_BULK {
            return Err(PlatformError::validation(format!(
                "settings: at most {} entries per request",
                MAX_BULK
            )));
        }

        let now = Utc::now();
        let mut seen = HashSet::with_capacity(entries.len());
        let mut staged = Vec::with_capacity(entries.len());
        for entry in entries {
            let (key, input) = entry.into_parts();
            let key = normalize_key(&key);
            if !seen.insert(key.clone()) {
                return Err(PlatformError::validation(format!("{}: key appears more than once", key)));
            }
            match self.settings.find_by_key(&key).await? {
                Some(mut existing) => {
                    existing
                        .apply(input, Some(actor.actor()), now)
                        .map_err(|e| PlatformError::validation(format!("{}: {}", key, e)))?;
                    staged.push((existing, false));
                }
                None => {
                    let setting = Setting::create(&key, input, Some(actor.actor()), now)
                        .map_err(|e| PlatformError::validation(format!("{}: {}", key, e)))?;
                    staged.push((setting, true));
                }
            }
        }

        let mut saved = Vec::with_capacity(staged.len());
        for (setting, created) in staged {
            if created {
                self.settings.insert(&setting).await?;
            } else {
                self.settings.update(&setting).await?;
            }
            saved.push(setting);
        }

        let keys: Vec<String> = saved.iter().map(|s| s.key.clone()).collect();
        let entry = ActivityLog::new(
            ActivityAction::Update,
            "setting",
            format!("Bulk updated {} setting(s)", saved.len()),
            now,
        )
        .by(actor)
        .with_metadata(doc! { "keys": keys });
        self.activity.record(entry).await;
        Ok(saved)
    }

    pub async fn delete(&self, key: &str, actor: &AuthContext) -> Result<()> {
        let setting = self.get(key).await?;
        self.settings.delete(&setting.id).await?;
        self.activity
            .log(actor, ActivityAction::Delete, "setting", &setting.id, format!("Deleted setting {}", setting.key))
            .await;
        Ok(())
    }

    async fn write(&self, key: &str, input: UpsertSettingInput, actor: &AuthContext) -> Result<(Setting, bool)> {
        let now = Utc::now();
        let key = normalize_key(key);
        match self.settings.find_by_key(&key).await? {
            Some(mut existing) => {
                existing.apply(input, Some(actor.actor()), now)?;
                self.settings.update(&existing).await?;
                Ok((existing, false))
            }
            None => {
                let setting = Setting::create(&key, input, Some(actor.actor()), now)?;
                self.settings.insert(&setting).await?;
                Ok((setting, true))
            }
        }
    }
}
