//! User Entity
//!
//! Back-office accounts. The coarse `role` drives the admin gate; `roleRefs`
//! point at [`Role`](crate::role::Role) documents whose permissions are
//! resolved into the request's auth context.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::types::to_rfc3339_opt;
use crate::shared::validation::{clean, clean_list, clean_opt, normalize_phone, Validation};
use crate::{Result, TsidGenerator};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    SuperAdmin,
    Admin,
    Editor,
    #[default]
    User,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::SuperAdmin => "super_admin",
            UserRole::Admin => "admin",
            UserRole::Editor => "editor",
            UserRole::User => "user",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Inactive,
    Suspended,
    #[default]
    Pending,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,

    /// Lowercased, unique
    pub email: String,

    /// Argon2id PHC string
    pub password_hash: String,

    pub full_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,

    #[serde(default)]
    pub role: UserRole,

    /// Role document ids
    #[serde(default)]
    pub role_refs: Vec<String>,

    /// Directly granted permission names
    #[serde(default)]
    pub permissions: Vec<String>,

    #[serde(default)]
    pub status: UserStatus,

    #[serde(default)]
    pub email_verified: bool,

    #[serde(skip_serializing_if = "Option::is_none", default, with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional")]
    pub last_login_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none", default, with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional")]
    pub password_changed_at: Option<DateTime<Utc>>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

/// Admin-side user creation
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateUserInput {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    pub role: Option<UserRole>,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub status: Option<UserStatus>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateUserInput {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    pub role: Option<UserRole>,
    pub permissions: Option<Vec<String>>,
    pub status: Option<UserStatus>,
}

/// Self-service profile update
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateProfileInput {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl User {
    pub fn create(input: CreateUserInput, password_hash: String, actor: Option<&str>, now: DateTime<Utc>) -> Result<Self> {
        let user = Self {
            id: TsidGenerator::generate(),
            email: normalize_email(&input.email),
            password_hash,
            full_name: clean(input.full_name),
            phone: clean_opt(input.phone).map(|p| normalize_phone(&p)),
            avatar: clean_opt(input.avatar),
            role: input.role.unwrap_or_default(),
            role_refs: Vec::new(),
            permissions: clean_list(input.permissions),
            status: input.status.unwrap_or(UserStatus::Active),
            email_verified: false,
            last_login_at: None,
            password_changed_at: None,
            created_at: now,
            updated_at: now,
            created_by: actor.map(String::from),
            updated_by: actor.map(String::from),
        };
        user.validate()?;
        Ok(user)
    }

    /// Self-registration: starts `pending` until the email is verified.
    pub fn register(email: &str, full_name: String, phone: Option<String>, password_hash: String, now: DateTime<Utc>) -> Result<Self> {
        let input = CreateUserInput {
            email: email.to_string(),
            password: String::new(),
            full_name,
            phone,
            avatar: None,
            role: Some(UserRole::User),
            permissions: Vec::new(),
            status: Some(UserStatus::Pending),
        };
        Self::create(input, password_hash, None, now)
    }

    pub fn apply(&mut self, patch: UpdateUserInput, actor: Option<&str>, now: DateTime<Utc>) -> Result<()> {
        if let Some(email) = patch.email {
            let email = normalize_email(&email);
            if email != self.email {
                self.email = email;
                self.email_verified = false;
            }
        }
        if let Some(name) = patch.full_name {
            self.full_name = clean(name);
        }
        if let Some(phone) = patch.phone {
            self.phone = clean_opt(Some(phone)).map(|p| normalize_phone(&p));
        }
        if let Some(avatar) = patch.avatar {
            self.avatar = clean_opt(Some(avatar));
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
        if let Some(permissions) = patch.permissions {
            self.permissions = clean_list(permissions);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.touch(actor, now);
        self.validate()
    }

    pub fn apply_profile(&mut self, patch: UpdateProfileInput, now: DateTime<Utc>) -> Result<()> {
        let id = self.id.clone();
        self.apply(
            UpdateUserInput {
                full_name: patch.full_name,
                phone: patch.phone,
                avatar: patch.avatar,
                ..Default::default()
            },
            Some(&id),
            now,
        )
    }

    pub fn set_password_hash(&mut self, hash: String, now: DateTime<Utc>) {
        self.password_hash = hash;
        self.password_changed_at = Some(now);
        self.updated_at = now;
    }

    /// Email verification activates a pending account.
    pub fn mark_email_verified(&mut self, now: DateTime<Utc>) {
        self.email_verified = true;
        if self.status == UserStatus::Pending {
            self.status = UserStatus::Active;
        }
        self.updated_at = now;
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    pub fn record_login(&mut self, now: DateTime<Utc>) {
        self.last_login_at = Some(now);
    }

    fn touch(&mut self, actor: Option<&str>, now: DateTime<Utc>) {
        self.updated_at = now;
        if let Some(actor) = actor {
            self.updated_by = Some(actor.to_string());
        }
    }

    fn validate(&self) -> Result<()> {
        let mut v = Validation::new();
        v.email("email", &self.email);
        v.text("fullName", &self.full_name, 2, 100);
        v.phone_opt("phone", self.phone.as_deref());
        v.url("avatar", self.avatar.as_deref());
        v.max_items("permissions", self.permissions.len(), 200);
        v.into_result()
    }
}

/// User as returned by the API; the password hash never leaves the server.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    pub role: UserRole,
    pub role_refs: Vec<String>,
    pub permissions: Vec<String>,
    pub status: UserStatus,
    pub email_verified: bool,
    pub last_login_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            full_name: u.full_name,
            phone: u.phone,
            avatar: u.avatar,
            role: u.role,
            role_refs: u.role_refs,
            permissions: u.permissions,
            status: u.status,
            email_verified: u.email_verified,
            last_login_at: to_rfc3339_opt(u.last_login_at),
            created_at: u.created_at.to_rfc3339(),
            updated_at: u.updated_at.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> CreateUserInput {
        CreateUserInput {
            email: "  Editor@Example.VN ".to_string(),
            password: "secret123".to_string(),
            full_name: " Nguyễn Văn A ".to_string(),
            phone: Some("0912 345 678".to_string()),
            avatar: None,
            role: Some(UserRole::Editor),
            permissions: vec![],
            status: None,
        }
    }

    #[test]
    fn test_create_normalizes() {
        let user = User::create(input(), "$argon2id$x".to_string(), Some("ADMIN"), Utc::now()).unwrap();
        assert_eq!(user.email, "editor@example.vn");
        assert_eq!(user.full_name, "Nguyễn Văn A");
        assert_eq!(user.phone.as_deref(), Some("0912345678"));
        assert_eq!(user.status, UserStatus::Active);
        assert_eq!(user.created_by.as_deref(), Some("ADMIN"));
    }

    #[test]
    fn test_invalid_fields_rejected() {
        let mut bad = input();
        bad.email = "nope".to_string();
        bad.full_name = "A".to_string();
        let err = User::create(bad, String::new(), None, Utc::now()).unwrap_err().to_string();
        assert!(err.contains("email") && err.contains("fullName"), "{}", err);
    }

    #[test]
    fn test_registration_is_pending_until_verified() {
        let mut user = User::register("a@b.vn", "Khách Hàng".to_string(), None, "h".to_string(), Utc::now()).unwrap();
        assert_eq!(user.status, UserStatus::Pending);
        assert!(!user.is_active());

        user.mark_email_verified(Utc::now());
        assert!(user.is_active());
        assert!(user.email_verified);
    }

    #[test]
    fn test_record_login_stamps_time() {
        let mut user = User::create(input(), "h".to_string(), None, Utc::now()).unwrap();
        assert!(user.last_login_at.is_none());
        let updated_at = user.updated_at;

        let now = Utc::now();
        user.record_login(now);
        assert_eq!(user.last_login_at, Some(now));
        assert_eq!(user.updated_at, updated_at);
    }

    #[test]
    fn test_changing_email_resets_verification() {
        let mut user = User::create(input(), "h".to_string(), None, Utc::now()).unwrap();
        user.email_verified = true;
        user.apply(
            UpdateUserInput { email: Some("new@example.vn".to_string()), ..Default::default() },
            Some("ADMIN"),
            Utc::now(),
        )
        .unwrap();
        assert!(!user.email_verified);
        assert_eq!(user.updated_by.as_deref(), Some("ADMIN"));
    }

    #[test]
    fn test_response_hides_hash() {
        let user = User::create(input(), "$argon2id$secret".to_string(), None, Utc::now()).unwrap();
        let json = serde_json::to_string(&UserResponse::from(user)).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"role\":\"editor\""));
    }
}
