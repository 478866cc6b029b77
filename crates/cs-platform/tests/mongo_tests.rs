//! Platform Tests Against MongoDB
//!
//! Ignored by default. Run with a live server:
//! `CS_TEST_MONGODB_URI=mongodb://127.0.0.1:27017 cargo test -- --ignored`
//! Every test works in its own throwaway database.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use mongodb::Database;
use serde_json::{json, Value};
use tower::ServiceExt;

use cs_common::ServiceInfo;
use cs_platform::auth::TokenType;
use cs_platform::user::entity::CreateUserInput;
use cs_platform::user::{User, UserRepository, UserRole, UserStatus};
use cs_platform::{AuthService, MemoryBlobStore, PasswordService, Platform, TsidGenerator};

const SECRET: &str = "integration-secret-that-is-long-enough";
const PASSWORD: &str = "matkhau2024";

struct TestSite {
    db: Database,
    app: Router,
    admin_token: String,
}

impl TestSite {
    async fn start() -> Self {
        let uri = std::env::var("CS_TEST_MONGODB_URI").unwrap_or_else(|_| "mongodb://127.0.0.1:27017".to_string());
        let client = mongodb::Client::with_uri_str(&uri).await.unwrap();
        let db = client.database(&format!("corpsite_it_{}", TsidGenerator::generate().to_lowercase()));

        let mut config = cs_config::AppConfig::default();
        config.auth.jwt_secret = SECRET.to_string();
        let app = Platform::new(&db, &config, Arc::new(MemoryBlobStore::new("http://files.test")))
            .unwrap()
            .router(ServiceInfo::new("cs-server", "test"));

        let admin = user("admin@corpsite.vn", UserRole::Admin, None);
        UserRepository::new(&db).insert(&admin).await.unwrap();
        let admin_token = AuthService::new(config.auth).issue(&admin, TokenType::Access, Utc::now()).unwrap().token;

        Self { db, app, admin_token }
    }

    async fn finish(self) {
        self.db.drop().await.unwrap();
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>, admin: bool) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if admin {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", self.admin_token));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn admin_post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body), true).await
    }

    async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "email": email, "password": password })),
            false,
        )
        .await
    }
}

fn user(email: &str, role: UserRole, status: Option<UserStatus>) -> User {
    let hash = PasswordService::testing().hash_password(PASSWORD).unwrap();
    User::create(
        CreateUserInput {
            email: email.to_string(),
            password: String::new(),
            full_name: "Nguyễn Văn A".to_string(),
            phone: None,
            avatar: None,
            role: Some(role),
            permissions: vec![],
            status,
        },
        hash,
        None,
        Utc::now(),
    )
    .unwrap()
}

fn project(name: &str) -> Value {
    json!({
        "name": name,
        "description": "Khu căn hộ cao cấp ven sông với đầy đủ tiện ích",
        "projectType": "apartment",
        "location": { "address": "12 Bạch Đằng, Hải Châu", "city": "Đà Nẵng" },
        "priceRange": { "min": 2e9, "max": 4e9 },
        "areaRange": { "min": 45.0, "max": 120.0 }
    })
}

mod login_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "needs MongoDB"]
    async fn test_unknown_email_and_wrong_password_look_the_same() {
        let site = TestSite::start().await;
        let member = user("editor@corpsite.vn", UserRole::Editor, None);
        UserRepository::new(&site.db).insert(&member).await.unwrap();

        let unknown = site.login("nobody@corpsite.vn", PASSWORD).await;
        let wrong = site.login("editor@corpsite.vn", "matkhau2025").await;

        assert_eq!(unknown.0, StatusCode::UNAUTHORIZED);
        assert_eq!(unknown.1["error"], "INVALID_CREDENTIALS");
        assert_eq!(unknown, wrong);
        site.finish().await;
    }

    #[tokio::test]
    #[ignore = "needs MongoDB"]
    async fn test_suspended_account_cannot_log_in() {
        let site = TestSite::start().await;
        let member = user("locked@corpsite.vn", UserRole::Editor, Some(UserStatus::Suspended));
        UserRepository::new(&site.db).insert(&member).await.unwrap();

        let (status, body) = site.login("locked@corpsite.vn", PASSWORD).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "UNAUTHORIZED");
        site.finish().await;
    }

    #[tokio::test]
    #[ignore = "needs MongoDB"]
    async fn test_login_stamps_last_login() {
        let site = TestSite::start().await;
        let member = user("editor@corpsite.vn", UserRole::Editor, None);
        let users = UserRepository::new(&site.db);
        users.insert(&member).await.unwrap();

        let (status, body) = site.login("Editor@CorpSite.vn", PASSWORD).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert!(body["data"]["accessToken"].is_string());
        assert!(body["data"]["user"]["lastLoginAt"].is_string());

        let stored = users.find_by_email("editor@corpsite.vn").await.unwrap().unwrap();
        assert!(stored.last_login_at.is_some());
        site.finish().await;
    }
}

mod catalog_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "needs MongoDB"]
    async fn test_category_with_products_cannot_be_deleted() {
        let site = TestSite::start().await;
        let (_, category) = site
            .admin_post("/api/v1/admin/ginseng/categories", json!({ "name": "Hồng sâm" }))
            .await;
        let (_, origin) = site
            .admin_post("/api/v1/admin/ginseng/origins", json!({ "name": "Geumsan", "country": "Hàn Quốc" }))
            .await;
        let category_id = category["data"]["id"].as_str().unwrap().to_string();
        let (status, product) = site
            .admin_post(
                "/api/v1/admin/ginseng/products",
                json!({
                    "name": "Hồng sâm 6 năm",
                    "categoryId": category_id,
                    "originId": origin["data"]["id"],
                    "ageYears": 6,
                    "weightGrams": 100.0,
                    "price": 1_500_000.0
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", product);

        let uri = format!("/api/v1/admin/ginseng/categories/{}", category_id);
        let (status, body) = site.send(Method::DELETE, &uri, None, true).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "BUSINESS_RULE");

        let (status, _) = site.send(Method::GET, &uri, None, true).await;
        assert_eq!(status, StatusCode::OK);
        site.finish().await;
    }
}

mod project_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "needs MongoDB"]
    async fn test_derived_slug_must_be_unique() {
        let site = TestSite::start().await;
        let (status, first) = site.admin_post("/api/v1/admin/projects", project("Đà Nẵng Riverside")).await;
        assert_eq!(status, StatusCode::CREATED, "{}", first);
        assert_eq!(first["data"]["slug"], "da-nang-riverside");

        let (status, body) = site.admin_post("/api/v1/admin/projects", project("Da Nang  Riverside")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "DUPLICATE");
        site.finish().await;
    }

    #[tokio::test]
    #[ignore = "needs MongoDB"]
    async fn test_hidden_project_leaves_public_listings() {
        let site = TestSite::start().await;
        let (_, created) = site.admin_post("/api/v1/admin/projects", project("Sky Garden")).await;
        let id = created["data"]["id"].as_str().unwrap().to_string();
        let admin_uri = format!("/api/v1/admin/projects/{}", id);

        let (status, _) = site
            .send(Method::PUT, &admin_uri, Some(json!({ "isActive": false })), true)
            .await;
        assert_eq!(status, StatusCode::OK);

        let (_, listing) = site.send(Method::GET, "/api/v1/projects", None, false).await;
        assert_eq!(listing["data"], json!([]));
        let (status, _) = site.send(Method::GET, &format!("/api/v1/projects/{}", id), None, false).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = site.send(Method::GET, "/api/v1/projects/slug/sky-garden", None, false).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = site.send(Method::GET, &admin_uri, None, true).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["isActive"], false);
        site.finish().await;
    }
}
