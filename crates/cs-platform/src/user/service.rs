//! User administration

use std::collections::HashSet;
use std::sync::Arc;

use bson::Document;
use chrono::Utc;
use tracing::info;

use crate::activity::{ActivityAction, ActivityService};
use crate::auth::password_service::PasswordService;
use crate::role::repository::RoleRepository;
use crate::shared::api_common::{Page, PageRequest};
use crate::shared::authorization_service::{checks, AuthContext};
use crate::shared::error::{PlatformError, Result};
use crate::user::entity::{CreateUserInput, UpdateUserInput, User, UserRole, UserStatus};
use crate::user::repository::UserRepository;
use crate::TsidGenerator;

#[derive(Clone)]
pub struct UserService {
    users: Arc<UserRepository>,
    roles: Arc<RoleRepository>,
    passwords: Arc<PasswordService>,
    activity: ActivityService,
}

impl UserService {
    pub fn new(
        users: Arc<UserRepository>,
        roles: Arc<RoleRepository>,
        passwords: Arc<PasswordService>,
        activity: ActivityService,
    ) -> Self {
        Self {
            users,
            roles,
            passwords,
            activity,
        }
    }

    pub async fn search(&self, filter: Document, page: PageRequest) -> Result<Page<User>> {
        self.users.search(filter, page).await
    }

    pub async fn get(&self, id: &str) -> Result<User> {
        self.users.get(id).await
    }

    pub async fn count(&self, filter: Document) -> Result<u64> {
        self.users.count(filter).await
    }

    pub async fn create(&self, input: CreateUserInput, actor: &AuthContext) -> Result<User> {
        if self.users.exists_by_email(&input.email).await? {
            return Err(PlatformError::duplicate("User", "email", input.email.trim().to_lowercase()));
        }
        if input.role == Some(UserRole::SuperAdmin) {
            checks::require_super_admin(actor)?;
        }

        let hash = self.passwords.hash_password(&input.password)?;
        let user = User::create(input, hash, Some(actor.actor()), Utc::now())?;
        self.users.insert(&user).await?;

        info!(user_id = %user.id, role = user.role.as_str(), "User created");
        self.activity
            .log(actor, ActivityAction::Create, "user", &user.id, format!("Created user {}", user.email))
            .await;
        Ok(user)
    }

    pub async fn update(&self, id: &str, patch: UpdateUserInput, actor: &AuthContext) -> Result<User> {
        let mut user = self.users.get(id).await?;

        if let Some(email) = patch.email.as_deref() {
            let email = email.trim().to_lowercase();
            if email != user.email && self.users.exists_by_email(&email).await? {
                return Err(PlatformError::duplicate("User", "email", email));
            }
        }
        if let Some(role) = patch.role {
            if role != user.role {
                self.guard_role_change(&user, role, actor).await?;
            }
        }
        if matches!(patch.status, Some(s) if s != UserStatus::Active) {
            checks::not_self(actor, id, "deactivate")?;
        }

        user.apply(patch, Some(actor.actor()), Utc::now())?;
        self.users.update(&user).await?;

        self.activity
            .log(actor, ActivityAction::Update, "user", &user.id, format!("Updated user {}", user.email))
            .await;
        Ok(user)
    }

    pub async fn set_status(&self, id: &str, status: UserStatus, actor: &AuthContext) -> Result<User> {
        if status != UserStatus::Active {
            checks::not_self(actor, id, "deactivate")?;
        }
        let mut user = self.users.get(id).await?;
        if user.role == UserRole::SuperAdmin && status != UserStatus::Active {
            self.guard_last_super_admin().await?;
        }

        user.status = status;
        user.updated_at = Utc::now();
        user.updated_by = Some(actor.actor().to_string());
        self.users.update(&user).await?;

        self.activity
            .log(
                actor,
                ActivityAction::StatusChange,
                "user",
                &user.id,
                format!("Set status of {} to {:?}", user.email, status),
            )
            .await;
        Ok(user)
    }

    /// Replace the user's role references. Every id must name an existing,
    /// active role.
    pub async fn assign_roles(&self, id: &str, role_ids: Vec<String>, actor: &AuthContext) -> Result<User> {
        let mut user = self.users.get(id).await?;

        let mut seen = HashSet::new();
        let role_ids: Vec<String> = role_ids
            .into_iter()
            .map(|r| r.trim().to_uppercase())
            .filter(|r| seen.insert(r.clone()))
            .collect();

        if let Some(bad) = role_ids.iter().find(|r| !TsidGenerator::is_valid(r)) {
            return Err(PlatformError::validation(format!("roleIds: '{}' is not a valid id", bad)));
        }

        let found = self.roles.find_active_by_ids(&role_ids).await?;
        if found.len() != role_ids.len() {
            let known: HashSet<&str> = found.iter().map(|r| r.id.as_str()).collect();
            let missing: Vec<&str> = role_ids
                .iter()
                .map(String::as_str)
                .filter(|r| !known.contains(r))
                .collect();
            return Err(PlatformError::validation(format!(
                "roleIds: unknown or inactive roles: {}",
                missing.join(", ")
            )));
        }

        user.role_refs = role_ids;
        user.updated_at = Utc::now();
        user.updated_by = Some(actor.actor().to_string());
        self.users.update(&user).await?;

        let names: Vec<&str> = found.iter().map(|r| r.name.as_str()).collect();
        self.activity
            .log(
                actor,
                ActivityAction::Update,
                "user",
                &user.id,
                format!("Assigned roles [{}] to {}", names.join(", "), user.email),
            )
            .await;
        Ok(user)
    }

    pub async fn delete(&self, id: &str, actor: &AuthContext) -> Result<()> {
        checks::not_self(actor, id, "delete")?;
        let user = self.users.get(id).await?;
        if user.role == UserRole::SuperAdmin {
            checks::require_super_admin(actor)?;
            self.guard_last_super_admin().await?;
        }

        if !self.users.delete(id).await? {
            return Err(PlatformError::not_found("User", id));
        }

        info!(user_id = %id, "User deleted");
        self.activity
            .log(actor, ActivityAction::Delete, "user", id, format!("Deleted user {}", user.email))
            .await;
        Ok(())
    }

    async fn guard_role_change(&self, user: &User, role: UserRole, actor: &AuthContext) -> Result<()> {
        if role == UserRole::SuperAdmin || user.role == UserRole::SuperAdmin {
            checks::require_super_admin(actor)?;
        }
        if user.role == UserRole::SuperAdmin {
            checks::not_self(actor, &user.id, "demote")?;
            self.guard_last_super_admin().await?;
        }
        Ok(())
    }

    async fn guard_last_super_admin(&self) -> Result<()> {
        let remaining = self
            .users
            .count(bson::doc! { "role": UserRole::SuperAdmin.as_str(), "status": "active" })
            .await?;
        if remaining <= 1 {
            return Err(PlatformError::conflict("At least one active super admin must remain"));
        }
        Ok(())
    }
}
