//! API Middleware
//!
//! Authentication extractors for Axum. The token is read from the
//! `Authorization: Bearer` header, falling back to the session cookie.
//! Rejections are [`PlatformError`]s so they render the failure envelope.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{
        header::{AUTHORIZATION, USER_AGENT},
        request::Parts,
        HeaderMap,
    },
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tower::{Layer, Service};

use crate::auth::auth_service::{extract_bearer_token, AuthService};
use crate::shared::authorization_service::{checks, AuthContext, AuthorizationService};
use crate::shared::error::PlatformError;

/// Shared services the extractors need
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub authz_service: Arc<AuthorizationService>,
}

fn app_state(parts: &Parts) -> Result<&AppState, PlatformError> {
    parts
        .extensions
        .get::<AppState>()
        .ok_or_else(|| PlatformError::internal("Auth service not configured"))
}

/// Bearer header first, then the session cookie.
pub fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer_token)
        .map(String::from)
        .or_else(|| {
            CookieJar::from_headers(headers)
                .get(cookie_name)
                .map(|c| c.value().to_string())
                .filter(|v| !v.is_empty())
        })
}

async fn authenticate(parts: &Parts) -> Result<AuthContext, PlatformError> {
    let state = app_state(parts)?;

    let token = extract_token(&parts.headers, &state.auth_service.config().cookie_name)
        .ok_or_else(|| PlatformError::unauthorized("Missing authentication token"))?;

    let claims = state.auth_service.validate_token(&token)?;
    state.authz_service.build_context(&claims).await
}

/// Authenticated user extractor
pub struct Authenticated(pub AuthContext);

impl std::ops::Deref for Authenticated {
    type Target = AuthContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = PlatformError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        authenticate(parts).await.map(Authenticated)
    }
}

/// Authenticated and holding one of the configured admin roles
pub struct RequireAdmin(pub AuthContext);

impl std::ops::Deref for RequireAdmin {
    type Target = AuthContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = PlatformError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let context = authenticate(parts).await?;
        checks::require_role(&context, app_state(parts)?.authz_service.admin_roles())?;
        Ok(RequireAdmin(context))
    }
}

/// Optional authentication extractor
pub struct OptionalAuth(pub Option<AuthContext>);

#[async_trait]
impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuth(authenticate(parts).await.ok()))
    }
}

/// Caller address and user agent, recorded on leads and activity entries
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientMeta {
    pub fn from_parts(parts: &Parts) -> Self {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let real_ip = || {
            parts
                .headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().to_string())
        };

        let peer = || {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        };

        Self {
            ip_address: forwarded.or_else(real_ip).or_else(peer),
            user_agent: parts
                .headers
                .get(USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.chars().take(500).collect()),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientMeta
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientMeta::from_parts(parts))
    }
}

/// Layer that injects [`AppState`] into request extensions so the
/// extractors above work under any router state.
#[derive(Clone)]
pub struct AuthLayer {
    state: AppState,
}

impl AuthLayer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            state: self.state.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    state: AppState,
}

impl<S, B> Service<axum::http::Request<B>> for AuthMiddleware<S>
where
    S: Service<axum::http::Request<B>, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        req.extensions_mut().insert(self.state.clone());
        Box::pin(self.inner.call(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Request};

    #[test]
    fn test_bearer_preferred_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer header-token"));
        headers.insert("cookie", HeaderValue::from_static("token=cookie-token"));
        assert_eq!(extract_token(&headers, "token").as_deref(), Some("header-token"));
    }

    #[test]
    fn test_cookie_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", HeaderValue::from_static("theme=dark; token=cookie-token"));
        assert_eq!(extract_token(&headers, "token").as_deref(), Some("cookie-token"));
        assert_eq!(extract_token(&headers, "session"), None);
    }

    #[test]
    fn test_client_meta_prefers_forwarded_for() {
        let (parts, _) = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .header("x-real-ip", "10.0.0.2")
            .header("user-agent", "Mozilla/5.0")
            .body(())
            .unwrap()
            .into_parts();
        let meta = ClientMeta::from_parts(&parts);
        assert_eq!(meta.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(meta.user_agent.as_deref(), Some("Mozilla/5.0"));
    }
}
