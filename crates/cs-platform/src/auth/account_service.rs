//! Account Service
//!
//! Login, registration, token refresh and the password / email-verification
//! flows. Unknown emails and wrong passwords produce the same error.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::activity::{ActivityAction, ActivityLog, ActivityService};
use crate::auth::auth_service::{AuthService, IssuedToken, TokenClaims, TokenType};
use crate::auth::notifier::{build_link, Notifier};
use crate::auth::password_service::PasswordService;
use crate::shared::authorization_service::AuthContext;
use crate::shared::error::{PlatformError, Result};
use crate::shared::middleware::ClientMeta;
use crate::user::entity::{normalize_email, UpdateProfileInput, User};
use crate::user::repository::UserRepository;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone: Option<String>,
}

/// Tokens issued on login or refresh
pub struct SessionTokens {
    pub user: User,
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<UserRepository>,
    auth: Arc<AuthService>,
    passwords: Arc<PasswordService>,
    notifier: Arc<dyn Notifier>,
    activity: ActivityService,
    public_base_url: String,
}

impl AccountService {
    pub fn new(
        users: Arc<UserRepository>,
        auth: Arc<AuthService>,
        passwords: Arc<PasswordService>,
        notifier: Arc<dyn Notifier>,
        activity: ActivityService,
        public_base_url: String,
    ) -> Self {
        Self {
            users,
            auth,
            passwords,
            notifier,
            activity,
            public_base_url,
        }
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    fn issue_session(&self, user: User) -> Result<SessionTokens> {
        let access = self.auth.generate_access_token(&user)?;
        let refresh = self.auth.generate_refresh_token(&user)?;
        Ok(SessionTokens { user, access, refresh })
    }

    pub async fn login(&self, email: &str, password: &str, meta: &ClientMeta) -> Result<SessionTokens> {
        let user = self.users.find_by_email(email).await?;
        let stored = user.as_ref().map(|u| u.password_hash.as_str());
        let password_ok = self.passwords.verify_or_dummy(password, stored)?;
        let mut user = check_login(user, password_ok)?;

        let now = Utc::now();
        self.users.record_login(&user.id, now).await?;
        user.record_login(now);

        info!(user_id = %user.id, "User logged in");
        self.activity
            .record(
                ActivityLog::new(ActivityAction::Login, "user", "Logged in", now)
                    .by_user(&user.id, &user.email)
                    .on(&user.id)
                    .from_client(meta),
            )
            .await;

        self.issue_session(user)
    }

    /// New accounts start `pending`; a verification link goes to the notifier.
    pub async fn register(&self, input: RegisterInput, meta: &ClientMeta) -> Result<User> {
        let email = normalize_email(&input.email);
        if self.users.exists_by_email(&email).await? {
            return Err(PlatformError::duplicate("User", "email", email));
        }

        let hash = self.passwords.hash_password(&input.password)?;
        let user = User::register(&email, input.full_name, input.phone, hash, Utc::now())?;
        self.users.insert(&user).await?;

        self.send_verification(&user).await;

        info!(user_id = %user.id, "User registered");
        self.activity
            .record(
                ActivityLog::new(ActivityAction::Create, "user", "Registered", Utc::now())
                    .by_user(&user.id, &user.email)
                    .on(&user.id)
                    .from_client(meta),
            )
            .await;
        Ok(user)
    }

    async fn send_verification(&self, user: &User) {
        let result = match self.auth.issue(user, TokenType::EmailVerification, Utc::now()) {
            Ok(token) => {
                let link = build_link(&self.public_base_url, "verify-email", &token.token);
                self.notifier.send_email_verification(user, &link).await
            }
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!(user_id = %user.id, error = %e, "Failed to send verification link");
        }
    }

    /// Exchange a refresh token for a new pair. The account must still be active.
    pub async fn refresh(&self, refresh_token: &str) -> Result<SessionTokens> {
        let claims = self.auth.validate(refresh_token, TokenType::Refresh)?;
        let user = self.active_subject(&claims).await?;
        self.issue_session(user)
    }

    pub async fn logout(&self, actor: &AuthContext, meta: &ClientMeta) {
        self.activity
            .record(
                ActivityLog::new(ActivityAction::Logout, "user", "Logged out", Utc::now())
                    .by(actor)
                    .on(&actor.user_id)
                    .from_client(meta),
            )
            .await;
    }

    pub async fn current_user(&self, actor: &AuthContext) -> Result<User> {
        self.users.get(&actor.user_id).await
    }

    pub async fn update_profile(&self, actor: &AuthContext, patch: UpdateProfileInput) -> Result<User> {
        let mut user = self.users.get(&actor.user_id).await?;
        user.apply_profile(patch, Utc::now())?;
        self.users.update(&user).await?;
        Ok(user)
    }

    pub async fn change_password(&self, actor: &AuthContext, current: &str, new_password: &str) -> Result<()> {
        let mut user = self.users.get(&actor.user_id).await?;

        if !self.passwords.verify_password(current, &user.password_hash)? {
            return Err(PlatformError::validation("currentPassword: is incorrect"));
        }
        if current == new_password {
            return Err(PlatformError::validation("newPassword: must differ from the current password"));
        }

        let hash = self.passwords.hash_password(new_password)?;
        user.set_password_hash(hash, Utc::now());
        self.users.update(&user).await?;

        info!(user_id = %user.id, "Password changed");
        self.activity
            .log(actor, ActivityAction::Update, "user", &user.id, "Changed password")
            .await;
        Ok(())
    }

    /// Always succeeds so callers cannot tell which emails exist.
    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let Some(user) = self.users.find_by_email(email).await? else {
            return Ok(());
        };
        if !user.is_active() {
            return Ok(());
        }

        let token = self.auth.issue(&user, TokenType::PasswordReset, Utc::now())?;
        let link = build_link(&self.public_base_url, "reset-password", &token.token);
        if let Err(e) = self.notifier.send_password_reset(&user, &link).await {
            warn!(user_id = %user.id, error = %e, "Failed to send password reset link");
        }
        Ok(())
    }

    /// Redeem a reset token. Tokens issued before the last password change
    /// are spent.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<()> {
        let claims = self.auth.validate(token, TokenType::PasswordReset)?;
        let mut user = self.active_subject(&claims).await?;

        if reset_link_spent(claims.iat, user.password_changed_at) {
            return Err(PlatformError::InvalidToken {
                message: "reset link has already been used".to_string(),
            });
        }

        let hash = self.passwords.hash_password(new_password)?;
        user.set_password_hash(hash, Utc::now());
        self.users.update(&user).await?;

        info!(user_id = %user.id, "Password reset");
        Ok(())
    }

    /// Redeem an email verification token; a pending account becomes active.
    pub async fn verify_email(&self, token: &str) -> Result<User> {
        let claims = self.auth.validate(token, TokenType::EmailVerification)?;
        let mut user = self
            .users
            .find_by_id(&claims.sub)
            .await?
            .ok_or_else(|| PlatformError::InvalidToken {
                message: "account no longer exists".to_string(),
            })?;

        if !user.email_verified {
            user.mark_email_verified(Utc::now());
            self.users.update(&user).await?;
            info!(user_id = %user.id, "Email verified");
        }
        Ok(user)
    }

    async fn active_subject(&self, claims: &TokenClaims) -> Result<User> {
        let user = self
            .users
            .find_by_id(&claims.sub)
            .await?
            .ok_or_else(|| PlatformError::unauthorized("User no longer exists"))?;
        if !user.is_active() {
            return Err(PlatformError::unauthorized("Account is not active"));
        }
        Ok(user)
    }
}

/// Unknown accounts and wrong passwords fail alike; only a correct password
/// learns that the account is not active.
fn check_login(user: Option<User>, password_ok: bool) -> Result<User> {
    let user = match user {
        Some(user) if password_ok => user,
        Some(user) => {
            warn!(user_id = %user.id, "Login failed: wrong password");
            return Err(PlatformError::InvalidCredentials);
        }
        None => return Err(PlatformError::InvalidCredentials),
    };
    if !user.is_active() {
        return Err(PlatformError::unauthorized("Account is not active"));
    }
    Ok(user)
}

/// Token `iat` has second precision, so a token from the same second as the
/// last password change counts as spent.
fn reset_link_spent(issued_at: i64, password_changed_at: Option<DateTime<Utc>>) -> bool {
    password_changed_at.is_some_and(|changed| issued_at <= changed.timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    use crate::user::entity::UserStatus;

    fn user(status: UserStatus) -> User {
        let mut user =
            User::register("khach@example.vn", "Khách Hàng".to_string(), None, "h".to_string(), Utc::now()).unwrap();
        user.status = status;
        user
    }

    #[test]
    fn test_unknown_email_and_wrong_password_fail_alike() {
        let unknown = check_login(None, false).unwrap_err();
        let wrong = check_login(Some(user(UserStatus::Active)), false).unwrap_err();

        assert!(matches!(unknown, PlatformError::InvalidCredentials));
        assert!(matches!(wrong, PlatformError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert_eq!(unknown.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_inactive_accounts_are_refused() {
        for status in [UserStatus::Pending, UserStatus::Inactive, UserStatus::Suspended] {
            let err = check_login(Some(user(status)), true).unwrap_err();
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
            assert!(err.to_string().contains("not active"), "{}", err);
        }
        // A wrong password never reveals the account state.
        let err = check_login(Some(user(UserStatus::Suspended)), false).unwrap_err();
        assert!(matches!(err, PlatformError::InvalidCredentials));
    }

    #[test]
    fn test_active_account_with_right_password_logs_in() {
        let user = check_login(Some(user(UserStatus::Active)), true).unwrap();
        assert_eq!(user.email, "khach@example.vn");
    }

    #[test]
    fn test_reset_link_spent_after_password_change() {
        let changed = Utc::now();
        let at = changed.timestamp();

        assert!(!reset_link_spent(at, None));
        assert!(reset_link_spent(at - 60, Some(changed)));
        assert!(reset_link_spent(at, Some(changed)));
        assert!(!reset_link_spent(at + 1, Some(changed)));
    }
}
