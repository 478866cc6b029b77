//! Platform API Integration Tests
//!
//! Exercises the assembled router end to end. MongoDB is never contacted:
//! the client is created lazily and every request here is answered before
//! a query would run.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use cs_common::ServiceInfo;
use cs_platform::auth::TokenType;
use cs_platform::user::entity::CreateUserInput;
use cs_platform::user::{User, UserRole};
use cs_platform::{AuthService, MemoryBlobStore, Platform};

const SECRET: &str = "integration-secret-that-is-long-enough";

fn config() -> cs_config::AppConfig {
    let mut config = cs_config::AppConfig::default();
    config.auth.jwt_secret = SECRET.to_string();
    config
}

async fn app() -> Router {
    let client = mongodb::Client::with_uri_str("mongodb://127.0.0.1:27017").await.unwrap();
    let db = client.database("corpsite_api_tests");
    let store = Arc::new(MemoryBlobStore::new("http://files.test"));
    Platform::new(&db, &config(), store)
        .unwrap()
        .router(ServiceInfo::new("cs-server", "test"))
}

fn admin() -> User {
    User::create(
        CreateUserInput {
            email: "admin@corpsite.vn".to_string(),
            password: String::new(),
            full_name: "Admin".to_string(),
            phone: None,
            avatar: None,
            role: Some(UserRole::Admin),
            permissions: vec![],
            status: None,
        },
        "hash".to_string(),
        None,
        Utc::now(),
    )
    .unwrap()
}

fn token(typ: TokenType, issued_at: chrono::DateTime<Utc>) -> String {
    AuthService::new(config().auth).issue(&admin(), typ, issued_at).unwrap().token
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

mod auth_gate_tests {
    use super::*;

    #[tokio::test]
    async fn test_admin_routes_require_token() {
        for uri in [
            "/api/v1/admin/projects",
            "/api/v1/admin/users",
            "/api/v1/admin/contacts",
            "/api/v1/admin/dashboard/overview",
            "/api/v1/admin/analytics/summary",
        ] {
            let (status, body) = send(app().await, get(uri)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
            assert_eq!(body["success"], false);
            assert_eq!(body["error"], "UNAUTHORIZED");
        }
    }

    #[tokio::test]
    async fn test_malformed_bearer_token() {
        let request = Request::builder()
            .uri("/api/v1/admin/projects")
            .header(header::AUTHORIZATION, "Bearer not-a-jwt")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app().await, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn test_malformed_cookie_token() {
        let request = Request::builder()
            .uri("/api/v1/admin/banners")
            .header(header::COOKIE, "token=garbage")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app().await, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_token_rejected_as_access() {
        let request = Request::builder()
            .uri("/api/v1/admin/settings")
            .header(header::AUTHORIZATION, format!("Bearer {}", token(TokenType::Refresh, Utc::now())))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app().await, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn test_expired_access_token() {
        let request = Request::builder()
            .uri("/api/v1/admin/news")
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", token(TokenType::Access, Utc::now() - Duration::days(3))),
            )
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app().await, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "TOKEN_EXPIRED");
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret() {
        let mut other = config().auth;
        other.jwt_secret = "some-other-secret-of-sufficient-length".to_string();
        let forged = AuthService::new(other)
            .issue(&admin(), TokenType::Access, Utc::now())
            .unwrap()
            .token;
        let request = Request::builder()
            .uri("/api/v1/admin/projects")
            .header(header::AUTHORIZATION, format!("Bearer {}", forged))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app().await, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

mod envelope_tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_field_is_validation_error() {
        let request = post_json(
            "/api/v1/analytics/track",
            json!({ "eventType": "page_view", "page": "/", "sessionId": "s1", "admin": true }),
        );
        let (status, body) = send(app().await, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_invalid_event_rejected_before_storage() {
        let request = post_json(
            "/api/v1/analytics/track",
            json!({ "eventType": "page_view", "page": "", "sessionId": "s1" }),
        );
        let (status, body) = send(app().await, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_malformed_json_body() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/analytics/track")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(app().await, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }
}

mod docs_tests {
    use super::*;

    #[tokio::test]
    async fn test_openapi_document_lists_auth_routes() {
        let (status, body) = send(app().await, get("/api-docs/openapi.json")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["info"]["title"], "CorpSite API");
        assert!(body["paths"]["/api/v1/auth/login"].is_object());
    }
}

mod domain_tests {
    use cs_platform::analytics::Device;
    use cs_platform::seed::system_role_permissions;
    use cs_platform::shared::slug::slugify;
    use cs_platform::user::UserRole;
    use cs_platform::TsidGenerator;

    #[test]
    fn test_tsids_are_unique_and_valid() {
        let ids: std::collections::HashSet<String> = (0..1000).map(|_| TsidGenerator::generate()).collect();
        assert_eq!(ids.len(), 1000);
        assert!(ids.iter().all(|id| TsidGenerator::is_valid(id)));
    }

    #[test]
    fn test_vietnamese_slugs() {
        assert_eq!(slugify("Khu đô thị Sala"), "khu-do-thi-sala");
    }

    #[test]
    fn test_editor_cannot_manage_users() {
        let editor = system_role_permissions(UserRole::Editor);
        assert!(editor.contains(&"projects:update".to_string()));
        assert!(!editor.iter().any(|p| p.starts_with("users:") || p.ends_with(":delete")));
    }

    #[test]
    fn test_device_classification() {
        assert_eq!(
            Device::from_user_agent(Some("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)")),
            Device::Mobile
        );
        assert_eq!(Device::from_user_agent(None), Device::Other);
    }
}
