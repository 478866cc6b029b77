//! Authorization Service
//!
//! Resolves a validated token into the request's [`AuthContext`]. The admin
//! gate is coarse and role based; permission strings are resolved so callers
//! can inspect them, but no route requires a specific one.

use std::collections::HashSet;
use std::sync::Arc;

use crate::auth::auth_service::TokenClaims;
use crate::role::entity::Role;
use crate::role::repository::RoleRepository;
use crate::shared::error::{PlatformError, Result};
use crate::user::entity::{User, UserRole};
use crate::user::repository::UserRepository;

/// Authorization context for a request
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: String,

    pub email: String,

    pub full_name: String,

    /// Coarse role, as currently stored (not as issued in the token)
    pub role: UserRole,

    /// Role document ids
    pub role_refs: Vec<String>,

    /// Permissions granted directly plus those of every active role
    pub permissions: HashSet<String>,
}

impl AuthContext {
    pub fn from_user(user: &User, permissions: HashSet<String>) -> Self {
        Self {
            user_id: user.id.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
            role_refs: user.role_refs.clone(),
            permissions,
        }
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    /// Whether the role is on the allow-list
    pub fn has_any_role(&self, allowed: &[String]) -> bool {
        allowed.iter().any(|r| r == self.role.as_str())
    }

    /// Id stamped into `createdBy` / `updatedBy`
    pub fn actor(&self) -> &str {
        &self.user_id
    }
}

/// Union of direct grants and the permissions of active roles.
pub fn resolve_permissions(direct: &[String], roles: &[Role]) -> HashSet<String> {
    direct
        .iter()
        .cloned()
        .chain(
            roles
                .iter()
                .filter(|r| r.is_active)
                .flat_map(|r| r.permissions.iter().cloned()),
        )
        .collect()
}

pub struct AuthorizationService {
    user_repo: Arc<UserRepository>,
    role_repo: Arc<RoleRepository>,
    admin_roles: Vec<String>,
}

impl AuthorizationService {
    pub fn new(user_repo: Arc<UserRepository>, role_repo: Arc<RoleRepository>, admin_roles: Vec<String>) -> Self {
        Self {
            user_repo,
            role_repo,
            admin_roles,
        }
    }

    pub fn admin_roles(&self) -> &[String] {
        &self.admin_roles
    }

    /// Load the token's subject and resolve its permissions. The account must
    /// still exist and be active.
    pub async fn build_context(&self, claims: &TokenClaims) -> Result<AuthContext> {
        let user = self
            .user_repo
            .find_by_id(&claims.sub)
            .await?
            .ok_or_else(|| PlatformError::unauthorized("User no longer exists"))?;

        if !user.is_active() {
            return Err(PlatformError::unauthorized("Account is not active"));
        }

        let roles = self.role_repo.find_active_by_ids(&user.role_refs).await?;
        let permissions = resolve_permissions(&user.permissions, &roles);

        Ok(AuthContext::from_user(&user, permissions))
    }
}

pub mod checks {
    use super::*;

    /// Role allow-list gate
    pub fn require_role(context: &AuthContext, allowed: &[String]) -> Result<()> {
        if context.has_any_role(allowed) {
            Ok(())
        } else {
            Err(PlatformError::forbidden("Insufficient role"))
        }
    }

    pub fn require_super_admin(context: &AuthContext) -> Result<()> {
        if context.role == UserRole::SuperAdmin {
            Ok(())
        } else {
            Err(PlatformError::forbidden("Super admin access required"))
        }
    }

    /// Users may not delete or demote themselves.
    pub fn not_self(context: &AuthContext, target_id: &str, action: &str) -> Result<()> {
        if context.user_id == target_id {
            Err(PlatformError::validation(format!("You cannot {} your own account", action)))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn context(role: UserRole) -> AuthContext {
        AuthContext {
            user_id: "0HZXEQ5Y8JY5Z".to_string(),
            email: "a@b.vn".to_string(),
            full_name: "Test".to_string(),
            role,
            role_refs: vec![],
            permissions: HashSet::new(),
        }
    }

    #[test]
    fn test_resolve_permissions_skips_inactive_roles() {
        let editor = Role::system("editor", "Editor", vec!["news:create".into(), "news:update".into()], Utc::now());
        let mut legacy = Role::system("legacy", "Legacy", vec!["users:delete".into()], Utc::now());
        legacy.is_active = false;

        let resolved = resolve_permissions(&["news:create".to_string(), "uploads:create".to_string()], &[editor, legacy]);
        assert_eq!(resolved.len(), 3);
        assert!(resolved.contains("news:update"));
        assert!(!resolved.contains("users:delete"));

        let mut ctx = context(UserRole::Editor);
        ctx.permissions = resolved;
        assert!(ctx.has_permission("uploads:create"));
        assert!(!ctx.has_permission("users:delete"));
    }

    #[test]
    fn test_role_gate() {
        let allowed = vec!["admin".to_string(), "super_admin".to_string()];
        assert!(checks::require_role(&context(UserRole::Admin), &allowed).is_ok());
        assert!(checks::require_role(&context(UserRole::SuperAdmin), &allowed).is_ok());
        assert!(matches!(
            checks::require_role(&context(UserRole::Editor), &allowed),
            Err(PlatformError::Forbidden { .. })
        ));
    }

    #[test]
    fn test_not_self() {
        let ctx = context(UserRole::Admin);
        assert!(checks::not_self(&ctx, "0HZXEQ5Y8JY5Z", "delete").is_err());
        assert!(checks::not_self(&ctx, "0HZXEQ5Y8JY60", "delete").is_ok());
    }
}
