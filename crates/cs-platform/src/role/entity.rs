//! Role and Permission Entities

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use utoipa::ToSchema;

use crate::shared::validation::{clean, clean_list, clean_opt, Validation};
use crate::{Result, TsidGenerator};

fn role_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_]{1,49}$").unwrap())
}

fn permission_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_]*:[a-z][a-z0-9_]*$").unwrap())
}

pub fn is_valid_permission_name(name: &str) -> bool {
    permission_name_regex().is_match(name)
}

/// A named set of permission strings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    #[serde(rename = "_id")]
    pub id: String,

    /// Unique machine name, e.g. `content_manager`
    pub name: String,

    pub display_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Permission names (`resource:action`)
    #[serde(default)]
    pub permissions: Vec<String>,

    /// Built-in roles cannot be renamed or deleted
    #[serde(default)]
    pub is_system: bool,

    #[serde(default = "default_true")]
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

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateRoleInput {
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateRoleInput {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

impl Role {
    pub fn create(input: CreateRoleInput, actor: Option<&str>, now: DateTime<Utc>) -> Result<Self> {
        let role = Self {
            id: TsidGenerator::generate(),
            name: clean(input.name).to_lowercase(),
            display_name: clean(input.display_name),
            description: clean_opt(input.description),
            permissions: dedup(clean_list(input.permissions)),
            is_system: false,
            is_active: input.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
            created_by: actor.map(String::from),
            updated_by: actor.map(String::from),
        };
        role.validate()?;
        Ok(role)
    }

    /// Built-in role seeded at start-up.
    pub fn system(name: &str, display_name: &str, permissions: Vec<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: TsidGenerator::generate(),
            name: name.to_string(),
            display_name: display_name.to_string(),
            description: None,
            permissions,
            is_system: true,
            is_active: true,
            created_at: now,
            updated_at: now,
            created_by: None,
            updated_by: None,
        }
    }

    pub fn apply(&mut self, patch: UpdateRoleInput, actor: Option<&str>, now: DateTime<Utc>) -> Result<()> {
        if let Some(name) = patch.name {
            let name = clean(name).to_lowercase();
            if self.is_system && name != self.name {
                return Err(crate::PlatformError::conflict("System roles cannot be renamed"));
            }
            self.name = name;
        }
        if let Some(display_name) = patch.display_name {
            self.display_name = clean(display_name);
        }
        if let Some(description) = patch.description {
            self.description = clean_opt(Some(description));
        }
        if let Some(permissions) = patch.permissions {
            self.permissions = dedup(clean_list(permissions));
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        self.updated_at = now;
        self.updated_by = actor.map(String::from).or(self.updated_by.take());
        self.validate()
    }

    pub fn set_permissions(&mut self, permissions: Vec<String>, actor: Option<&str>, now: DateTime<Utc>) -> Result<()> {
        self.apply(
            UpdateRoleInput { permissions: Some(permissions), ..Default::default() },
            actor,
            now,
        )
    }

    fn validate(&self) -> Result<()> {
        let mut v = Validation::new();
        if !role_name_regex().is_match(&self.name) {
            v.record("name", "must start with a letter and contain only a-z, 0-9 and _ (2-50 characters)");
        }
        v.text("displayName", &self.display_name, 2, 100);
        v.text_opt("description", self.description.as_deref(), 500);
        if self.permissions.iter().any(|p| !is_valid_permission_name(p)) {
            v.record("permissions", "entries must look like resource:action");
        }
        v.into_result()
    }
}

fn dedup(mut values: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    values.retain(|v| seen.insert(v.clone()));
    values
}

/// A permission definition (`resource:action`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    #[serde(rename = "_id")]
    pub id: String,

    /// Unique, `resource:action`
    pub name: String,

    pub display_name: String,

    pub resource: String,

    pub action: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default = "default_true")]
    pub is_active: bool,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreatePermissionInput {
    pub resource: String,
    pub action: String,
    pub display_name: String,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdatePermissionInput {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

impl Permission {
    pub fn create(input: CreatePermissionInput, actor: Option<&str>, now: DateTime<Utc>) -> Result<Self> {
        let resource = clean(input.resource).to_lowercase();
        let action = clean(input.action).to_lowercase();
        let permission = Self {
            id: TsidGenerator::generate(),
            name: format!("{}:{}", resource, action),
            display_name: clean(input.display_name),
            resource,
            action,
            description: clean_opt(input.description),
            is_active: input.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
            created_by: actor.map(String::from),
        };
        permission.validate()?;
        Ok(permission)
    }

    pub fn apply(&mut self, patch: UpdatePermissionInput, now: DateTime<Utc>) -> Result<()> {
        if let Some(display_name) = patch.display_name {
            self.display_name = clean(display_name);
        }
        if let Some(description) = patch.description {
            self.description = clean_opt(Some(description));
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        self.updated_at = now;
        self.validate()
    }

    fn validate(&self) -> Result<()> {
        let mut v = Validation::new();
        if !is_valid_permission_name(&self.name) {
            v.record("name", "resource and action must be lowercase identifiers");
        }
        v.text("displayName", &self.display_name, 2, 100);
        v.text_opt("description", self.description.as_deref(), 500);
        v.into_result()
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleResponse {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub permissions: Vec<String>,
    pub is_system: bool,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Role> for RoleResponse {
    fn from(r: Role) -> Self {
        Self {
            id: r.id,
            name: r.name,
            display_name: r.display_name,
            description: r.description,
            permissions: r.permissions,
            is_system: r.is_system,
            is_active: r.is_active,
            created_at: r.created_at.to_rfc3339(),
            updated_at: r.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PermissionResponse {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub resource: String,
    pub action: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: String,
}

impl From<Permission> for PermissionResponse {
    fn from(p: Permission) -> Self {
        Self {
            id: p.id,
            name: p.name,
            display_name: p.display_name,
            resource: p.resource,
            action: p.action,
            description: p.description,
            is_active: p.is_active,
            created_at: p.created_at.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_permissions_deduplicated() {
        let role = Role::create(
            CreateRoleInput {
                name: "Content_Manager".to_string(),
                display_name: "Content manager".to_string(),
                description: None,
                permissions: vec!["news:create".into(), "news:create".into(), " news:publish ".into()],
                is_active: None,
            },
            None,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(role.name, "content_manager");
        assert_eq!(role.permissions, vec!["news:create", "news:publish"]);
    }

    #[test]
    fn test_malformed_permission_rejected() {
        let result = Role::create(
            CreateRoleInput {
                name: "viewer".to_string(),
                display_name: "Viewer".to_string(),
                description: None,
                permissions: vec!["everything".into()],
                is_active: None,
            },
            None,
            Utc::now(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_system_role_cannot_be_renamed() {
        let mut role = Role::system("admin", "Administrator", vec![], Utc::now());
        let result = role.apply(
            UpdateRoleInput { name: Some("boss".to_string()), ..Default::default() },
            None,
            Utc::now(),
        );
        assert!(matches!(result, Err(crate::PlatformError::Conflict { .. })));
    }

    #[test]
    fn test_permission_name_is_derived() {
        let p = Permission::create(
            CreatePermissionInput {
                resource: "Projects".to_string(),
                action: "delete".to_string(),
                display_name: "Delete projects".to_string(),
                description: None,
                is_active: None,
            },
            None,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(p.name, "projects:delete");
    }
}
