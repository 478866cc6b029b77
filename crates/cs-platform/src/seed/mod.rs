//! Start-up Seeder
//!
//! Idempotent: creates the permission catalogue, the built-in roles and the
//! first super admin only when they are missing. Existing rows are left as
//! they are so back-office edits survive restarts.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::auth::password_service::PasswordService;
use crate::role::entity::{CreatePermissionInput, Permission, Role};
use crate::role::repository::{PermissionRepository, RoleRepository};
use crate::shared::error::Result;
use crate::user::entity::{CreateUserInput, User, UserRole, UserStatus};
use crate::user::repository::UserRepository;

/// Resources and the actions granted on each
const CATALOGUE: &[(&str, &[&str])] = &[
    ("users", &["read", "create", "update", "delete"]),
    ("roles", &["read", "create", "update", "delete"]),
    ("projects", &["read", "create", "update", "delete"]),
    ("products", &["read", "create", "update", "delete"]),
    ("news", &["read", "create", "update", "delete", "publish"]),
    ("contacts", &["read", "update", "delete"]),
    ("consultations", &["read", "update", "delete"]),
    ("newsletter", &["read", "update", "delete"]),
    ("careers", &["read", "create", "update", "delete"]),
    ("banners", &["read", "create", "update", "delete"]),
    ("settings", &["read", "update", "delete"]),
    ("uploads", &["read", "create", "update", "delete"]),
    ("analytics", &["read"]),
    ("activity", &["read"]),
];

/// Resources an editor manages
const EDITOR_RESOURCES: &[&str] = &["projects", "products", "news", "banners", "uploads"];

pub fn permission_names() -> Vec<String> {
    CATALOGUE
        .iter()
        .flat_map(|(resource, actions)| actions.iter().map(move |action| format!("{}:{}", resource, action)))
        .collect()
}

/// Permissions carried by each built-in role.
pub fn system_role_permissions(role: UserRole) -> Vec<String> {
    let all = permission_names();
    match role {
        UserRole::SuperAdmin => all,
        UserRole::Admin => all
            .into_iter()
            .filter(|p| !p.starts_with("roles:") || p == "roles:read")
            .collect(),
        UserRole::Editor => all
            .into_iter()
            .filter(|p| {
                let (resource, action) = p.split_once(':').unwrap_or_default();
                EDITOR_RESOURCES.contains(&resource) && action != "delete"
            })
            .collect(),
        UserRole::User => Vec::new(),
    }
}

fn display_name(resource: &str, action: &str) -> String {
    let mut chars = action.chars();
    let verb = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    format!("{} {}", verb, resource)
}

pub struct Seeder {
    users: Arc<UserRepository>,
    roles: Arc<RoleRepository>,
    permissions: Arc<PermissionRepository>,
    passwords: Arc<PasswordService>,
}

impl Seeder {
    pub fn new(
        users: Arc<UserRepository>,
        roles: Arc<RoleRepository>,
        permissions: Arc<PermissionRepository>,
        passwords: Arc<PasswordService>,
    ) -> Self {
        Self {
            users,
            roles,
            permissions,
            passwords,
        }
    }

    pub async fn run(&self, config: &cs_config::SeedConfig) -> Result<()> {
        let now = Utc::now();
        let created_permissions = self.seed_permissions(now).await?;
        let super_admin_role = self.seed_roles(now).await?;
        self.seed_super_admin(config, super_admin_role, now).await?;
        info!(created_permissions, "Seed complete");
        Ok(())
    }

    async fn seed_permissions(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut created = 0;
        for (resource, actions) in CATALOGUE {
            for action in actions.iter() {
                if self.permissions.exists_by_name(&format!("{}:{}", resource, action)).await? {
                    continue;
                }
                let permission = Permission::create(
                    CreatePermissionInput {
                        resource: resource.to_string(),
                        action: action.to_string(),
                        display_name: display_name(resource, action),
                        description: None,
                        is_active: Some(true),
                    },
                    None,
                    now,
                )?;
                self.permissions.insert(&permission).await?;
                created += 1;
            }
        }
        Ok(created)
    }

    /// Returns the id of the `super_admin` role.
    async fn seed_roles(&self, now: DateTime<Utc>) -> Result<String> {
        let mut super_admin_id = String::new();
        for (role, label) in [
            (UserRole::SuperAdmin, "Super Administrator"),
            (UserRole::Admin, "Administrator"),
            (UserRole::Editor, "Editor"),
            (UserRole::User, "User"),
        ] {
            let id = match self.roles.find_by_name(role.as_str()).await? {
                Some(existing) => existing.id,
                None => {
                    let created = Role::system(role.as_str(), label, system_role_permissions(role), now);
                    self.roles.insert(&created).await?;
                    info!(role = role.as_str(), "Created system role");
                    created.id
                }
            };
            if role == UserRole::SuperAdmin {
                super_admin_id = id;
            }
        }
        Ok(super_admin_id)
    }

    async fn seed_super_admin(&self, config: &cs_config::SeedConfig, role_id: String, now: DateTime<Utc>) -> Result<()> {
        if self.users.count_with_role(UserRole::SuperAdmin).await? > 0 {
            return Ok(());
        }
        if config.admin_email.trim().is_empty() || config.admin_password.is_empty() {
            warn!("No super admin exists and seed.admin_email/admin_password are not set");
            return Ok(());
        }
        if self.users.exists_by_email(&config.admin_email).await? {
            warn!(email = %config.admin_email, "Seed admin email belongs to an existing non-super-admin account");
            return Ok(());
        }

        self.passwords.check_policy(&config.admin_password)?;
        let hash = self.passwords.hash_password(&config.admin_password)?;
        let mut user = User::create(
            CreateUserInput {
                email: config.admin_email.clone(),
                password: String::new(),
                full_name: config.admin_name.clone(),
                phone: None,
                avatar: None,
                role: Some(UserRole::SuperAdmin),
                permissions: Vec::new(),
                status: Some(UserStatus::Active),
            },
            hash,
            None,
            now,
        )?;
        user.role_refs = vec![role_id];
        user.mark_email_verified(now);
        self.users.insert(&user).await?;

        info!(user_id = %user.id, email = %user.email, "Created super admin");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::entity::is_valid_permission_name;

    #[test]
    fn test_catalogue_names_are_valid() {
        let names = permission_names();
        assert!(names.iter().all(|n| is_valid_permission_name(n)));
        assert!(names.contains(&"news:publish".to_string()));
    }

    #[test]
    fn test_role_permission_sets() {
        let all = permission_names().len();
        assert_eq!(system_role_permissions(UserRole::SuperAdmin).len(), all);

        let admin = system_role_permissions(UserRole::Admin);
        assert!(admin.contains(&"roles:read".to_string()));
        assert!(!admin.contains(&"roles:delete".to_string()));
        assert!(admin.contains(&"users:delete".to_string()));

        let editor = system_role_permissions(UserRole::Editor);
        assert!(editor.contains(&"news:publish".to_string()));
        assert!(!editor.contains(&"news:delete".to_string()));
        assert!(!editor.iter().any(|p| p.starts_with("users:")));

        assert!(system_role_permissions(UserRole::User).is_empty());
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("projects", "read"), "Read projects");
    }
}
