//! Auth API Endpoints
//!
//! - POST /auth/register, /auth/login, /auth/refresh, /auth/logout
//! - GET /auth/me, PUT /auth/profile, PUT /auth/change-password
//! - POST /auth/forgot-password, /auth/reset-password, /auth/verify-email

use axum::{extract::State, response::IntoResponse};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::auth::account_service::{AccountService, RegisterInput, SessionTokens};
use crate::shared::api_common::{ApiResponse, JsonBody};
use crate::shared::error::PlatformError;
use crate::shared::middleware::{Authenticated, ClientMeta};
use crate::user::entity::{UpdateProfileInput, UserResponse};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VerifyEmailRequest {
    pub token: String,
}

/// Session issued on login and refresh
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

impl From<SessionTokens> for LoginResponse {
    fn from(s: SessionTokens) -> Self {
        Self {
            user: s.user.into(),
            access_token: s.access.token,
            refresh_token: s.refresh.token,
            expires_in: s.access.expires_in,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user: UserResponse,
    /// Resolved from direct grants and active roles
    pub permissions: Vec<String>,
}

#[derive(Clone)]
pub struct AuthState {
    pub accounts: AccountService,
}

impl AuthState {
    fn session_cookie(&self, token: String, max_age_secs: i64) -> Cookie<'static> {
        let config = self.accounts.auth().config();
        Cookie::build((config.cookie_name.clone(), token))
            .path("/")
            .http_only(true)
            .secure(config.cookie_secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(max_age_secs))
            .build()
    }

    fn session_response(&self, jar: CookieJar, session: SessionTokens) -> (CookieJar, ApiResponse<LoginResponse>) {
        let cookie = self.session_cookie(session.access.token.clone(), session.access.expires_in);
        (jar.add(cookie), ApiResponse::ok(session.into()))
    }
}

/// Create an account
#[utoipa::path(
    post,
    path = "/register",
    tag = "auth",
    operation_id = "postAuthRegister",
    request_body = RegisterInput,
    responses(
        (status = 201, description = "Account created, pending email verification", body = UserResponse),
        (status = 400, description = "Validation error or email already registered")
    )
)]
pub async fn register(
    State(state): State<AuthState>,
    meta: ClientMeta,
    JsonBody(input): JsonBody<RegisterInput>,
) -> Result<ApiResponse<UserResponse>, PlatformError> {
    let user = state.accounts.register(input, &meta).await?;
    Ok(ApiResponse::created(user.into()).with_message("Registration successful, please verify your email"))
}

/// Login with email and password
///
/// Sets the session cookie and returns both tokens.
#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    operation_id = "postAuthLogin",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials or inactive account")
    )
)]
pub async fn login(
    State(state): State<AuthState>,
    jar: CookieJar,
    meta: ClientMeta,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, PlatformError> {
    let session = state.accounts.login(&req.email, &req.password, &meta).await?;
    let (jar, body) = state.session_response(jar, session);
    Ok((jar, body.with_message("Login successful")))
}

/// Exchange a refresh token for a new session
#[utoipa::path(
    post,
    path = "/refresh",
    tag = "auth",
    operation_id = "postAuthRefresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New tokens issued", body = LoginResponse),
        (status = 401, description = "Invalid or expired refresh token")
    )
)]
pub async fn refresh_token(
    State(state): State<AuthState>,
    jar: CookieJar,
    JsonBody(req): JsonBody<RefreshRequest>,
) -> Result<impl IntoResponse, PlatformError> {
    let session = state.accounts.refresh(&req.refresh_token).await?;
    Ok(state.session_response(jar, session))
}

/// Logout
///
/// Tokens are stateless; this clears the session cookie and records the event.
#[utoipa::path(
    post,
    path = "/logout",
    tag = "auth",
    operation_id = "postAuthLogout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = []))
)]
pub async fn logout(
    State(state): State<AuthState>,
    jar: CookieJar,
    meta: ClientMeta,
    auth: Authenticated,
) -> impl IntoResponse {
    state.accounts.logout(&auth, &meta).await;
    let cookie = state.session_cookie(String::new(), 0);
    (jar.add(cookie), ApiResponse::message("Logged out"))
}

/// Current user and resolved permissions
#[utoipa::path(
    get,
    path = "/me",
    tag = "auth",
    operation_id = "getAuthMe",
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_current_user(
    State(state): State<AuthState>,
    auth: Authenticated,
) -> Result<ApiResponse<MeResponse>, PlatformError> {
    let user = state.accounts.current_user(&auth).await?;
    let mut permissions: Vec<String> = auth.permissions.iter().cloned().collect();
    permissions.sort();
    Ok(ApiResponse::ok(MeResponse {
        user: user.into(),
        permissions,
    }))
}

/// Update own profile
#[utoipa::path(
    put,
    path = "/profile",
    tag = "auth",
    operation_id = "putAuthProfile",
    request_body = UpdateProfileInput,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Validation error")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_profile(
    State(state): State<AuthState>,
    auth: Authenticated,
    JsonBody(patch): JsonBody<UpdateProfileInput>,
) -> Result<ApiResponse<UserResponse>, PlatformError> {
    let user = state.accounts.update_profile(&auth, patch).await?;
    Ok(ApiResponse::ok(user.into()).with_message("Profile updated"))
}

/// Change own password
#[utoipa::path(
    put,
    path = "/change-password",
    tag = "auth",
    operation_id = "putAuthChangePassword",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Current password incorrect or new password rejected")
    ),
    security(("bearer_auth" = []))
)]
pub async fn change_password(
    State(state): State<AuthState>,
    auth: Authenticated,
    JsonBody(req): JsonBody<ChangePasswordRequest>,
) -> Result<ApiResponse<()>, PlatformError> {
    state
        .accounts
        .change_password(&auth, &req.current_password, &req.new_password)
        .await?;
    Ok(ApiResponse::message("Password changed"))
}

/// Request a password reset link
///
/// Succeeds whether or not the email is registered.
#[utoipa::path(
    post,
    path = "/forgot-password",
    tag = "auth",
    operation_id = "postAuthForgotPassword",
    request_body = ForgotPasswordRequest,
    responses((status = 200, description = "Reset link sent if the account exists"))
)]
pub async fn forgot_password(
    State(state): State<AuthState>,
    JsonBody(req): JsonBody<ForgotPasswordRequest>,
) -> Result<ApiResponse<()>, PlatformError> {
    state.accounts.forgot_password(&req.email).await?;
    Ok(ApiResponse::message(
        "If the email is registered, a password reset link has been sent",
    ))
}

/// Set a new password with a reset token
#[utoipa::path(
    post,
    path = "/reset-password",
    tag = "auth",
    operation_id = "postAuthResetPassword",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset"),
        (status = 401, description = "Invalid or expired token")
    )
)]
pub async fn reset_password(
    State(state): State<AuthState>,
    JsonBody(req): JsonBody<ResetPasswordRequest>,
) -> Result<ApiResponse<()>, PlatformError> {
    state.accounts.reset_password(&req.token, &req.new_password).await?;
    Ok(ApiResponse::message("Password has been reset"))
}

/// Confirm an email address
#[utoipa::path(
    post,
    path = "/verify-email",
    tag = "auth",
    operation_id = "postAuthVerifyEmail",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Email verified", body = UserResponse),
        (status = 401, description = "Invalid or expired token")
    )
)]
pub async fn verify_email(
    State(state): State<AuthState>,
    JsonBody(req): JsonBody<VerifyEmailRequest>,
) -> Result<ApiResponse<UserResponse>, PlatformError> {
    let user = state.accounts.verify_email(&req.token).await?;
    Ok(ApiResponse::ok(user.into()).with_message("Email verified"))
}

pub fn auth_router(state: AuthState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(register))
        .routes(routes!(login))
        .routes(routes!(refresh_token))
        .routes(routes!(logout))
        .routes(routes!(get_current_user))
        .routes(routes!(update_profile))
        .routes(routes!(change_password))
        .routes(routes!(forgot_password))
        .routes(routes!(reset_password))
        .routes(routes!(verify_email))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_rejects_unknown_fields() {
        assert!(serde_json::from_str::<LoginRequest>(r#"{"email":"a@b.vn","password":"x"}"#).is_ok());
        assert!(serde_json::from_str::<LoginRequest>(r#"{"email":"a@b.vn","password":"x","role":"admin"}"#).is_err());
    }

    #[test]
    fn test_refresh_request_is_camel_case() {
        let req: RefreshRequest = serde_json::from_str(r#"{"refreshToken":"abc"}"#).unwrap();
        assert_eq!(req.refresh_token, "abc");
    }
}
