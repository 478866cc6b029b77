//! Role and permission administration

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::activity::{ActivityAction, ActivityService};
use crate::role::entity::{
    CreatePermissionInput, CreateRoleInput, Permission, Role, UpdatePermissionInput, UpdateRoleInput,
};
use crate::role::repository::{PermissionRepository, RoleRepository};
use crate::shared::authorization_service::AuthContext;
use crate::shared::error::{PlatformError, Result};
use crate::user::repository::UserRepository;

#[derive(Clone)]
pub struct RoleService {
    roles: Arc<RoleRepository>,
    permissions: Arc<PermissionRepository>,
    users: Arc<UserRepository>,
    activity: ActivityService,
}

impl RoleService {
    pub fn new(
        roles: Arc<RoleRepository>,
        permissions: Arc<PermissionRepository>,
        users: Arc<UserRepository>,
        activity: ActivityService,
    ) -> Self {
        Self {
            roles,
            permissions,
            users,
            activity,
        }
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>> {
        self.roles.find_all().await
    }

    pub async fn get_role(&self, id: &str) -> Result<Role> {
        self.roles.get(id).await
    }

    pub async fn create_role(&self, input: CreateRoleInput, actor: &AuthContext) -> Result<Role> {
        let role = Role::create(input, Some(actor.actor()), Utc::now())?;
        if self.roles.find_by_name(&role.name).await?.is_some() {
            return Err(PlatformError::duplicate("Role", "name", &role.name));
        }
        self.ensure_permissions_exist(&role.permissions).await?;

        self.roles.insert(&role).await?;
        info!(role = %role.name, "Role created");
        self.activity
            .log(actor, ActivityAction::Create, "role", &role.id, format!("Created role {}", role.name))
            .await;
        Ok(role)
    }

    pub async fn update_role(&self, id: &str, patch: UpdateRoleInput, actor: &AuthContext) -> Result<Role> {
        let mut role = self.roles.get(id).await?;
        let previous_name = role.name.clone();

        role.apply(patch, Some(actor.actor()), Utc::now())?;

        if role.name != previous_name && self.roles.find_by_name(&role.name).await?.is_some() {
            return Err(PlatformError::duplicate("Role", "name", &role.name));
        }
        self.ensure_permissions_exist(&role.permissions).await?;

        self.roles.update(&role).await?;
        self.activity
            .log(actor, ActivityAction::Update, "role", &role.id, format!("Updated role {}", role.name))
            .await;
        Ok(role)
    }

    pub async fn set_role_permissions(&self, id: &str, permissions: Vec<String>, actor: &AuthContext) -> Result<Role> {
        let mut role = self.roles.get(id).await?;
        role.set_permissions(permissions, Some(actor.actor()), Utc::now())?;
        self.ensure_permissions_exist(&role.permissions).await?;

        self.roles.update(&role).await?;
        self.activity
            .log(
                actor,
                ActivityAction::Update,
                "role",
                &role.id,
                format!("Set {} permissions on role {}", role.permissions.len(), role.name),
            )
            .await;
        Ok(role)
    }

    /// System roles and roles still referenced by a user cannot be deleted.
    pub async fn delete_role(&self, id: &str, actor: &AuthContext) -> Result<()> {
        let role = self.roles.get(id).await?;
        if role.is_system {
            return Err(PlatformError::conflict(format!("Role {} is a system role", role.name)));
        }

        let users = self.users.count_with_role_ref(id).await?;
        if users > 0 {
            return Err(PlatformError::conflict(format!(
                "Role {} is assigned to {} user(s)",
                role.name, users
            )));
        }

        self.roles.delete(id).await?;
        self.activity
            .log(actor, ActivityAction::Delete, "role", id, format!("Deleted role {}", role.name))
            .await;
        Ok(())
    }

    pub async fn list_permissions(&self, resource: Option<&str>) -> Result<Vec<Permission>> {
        self.permissions.find_all(resource).await
    }

    pub async fn get_permission(&self, id: &str) -> Result<Permission> {
        self.permissions.get(id).await
    }

    pub async fn create_permission(&self, input: CreatePermissionInput, actor: &AuthContext) -> Result<Permission> {
        let permission = Permission::create(input, Some(actor.actor()), Utc::now())?;
        if self.permissions.exists_by_name(&permission.name).await? {
            return Err(PlatformError::duplicate("Permission", "name", &permission.name));
        }

        self.permissions.insert(&permission).await?;
        self.activity
            .log(
                actor,
                ActivityAction::Create,
                "permission",
                &permission.id,
                format!("Created permission {}", permission.name),
            )
            .await;
        Ok(permission)
    }

    pub async fn update_permission(&self, id: &str, patch: UpdatePermissionInput, actor: &AuthContext) -> Result<Permission> {
        let mut permission = self.permissions.get(id).await?;
        permission.apply(patch, Utc::now())?;
        self.permissions.update(&permission).await?;
        self.activity
            .log(
                actor,
                ActivityAction::Update,
                "permission",
                &permission.id,
                format!("Updated permission {}", permission.name),
            )
            .await;
        Ok(permission)
    }

    /// Permissions granted by a role or directly to a user cannot be deleted.
    pub async fn delete_permission(&self, id: &str, actor: &AuthContext) -> Result<()> {
        let permission = self.permissions.get(id).await?;

        let roles = self.roles.count_with_permission(&permission.name).await?;
        let users = self.users.count_with_permission(&permission.name).await?;
        if roles + users > 0 {
            return Err(PlatformError::conflict(format!(
                "Permission {} is still granted by {} role(s) and {} user(s)",
                permission.name, roles, users
            )));
        }

        self.permissions.delete(id).await?;
        self.activity
            .log(
                actor,
                ActivityAction::Delete,
                "permission",
                id,
                format!("Deleted permission {}", permission.name),
            )
            .await;
        Ok(())
    }

    async fn ensure_permissions_exist(&self, names: &[String]) -> Result<()> {
        let existing = self.permissions.existing_names(names).await?;
        let missing: Vec<&str> = names
            .iter()
            .filter(|n| !existing.contains(*n))
            .map(String::as_str)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PlatformError::validation(format!(
                "permissions: unknown or inactive permissions: {}",
                missing.join(", ")
            )))
        }
    }
}
