//! 인증/인가 흐름 통합 테스트
//!
//! 실제 라우터와 보안 체인을 메모리 저장소로 구성하여
//! 로그인 → 보호 경로 접근 → 갱신 → 로그아웃 시나리오를 검증합니다.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    routing::get,
    Router,
};
use chrono::{Duration, Utc};
use leadx_api::auth::CurrentIdentity;
use leadx_api::routes::{create_api_router, secure};
use leadx_api::state::{memory_store_from_seed, AppState};
use leadx_api::SecurityChain;
use leadx_core::{AppConfig, CacheStore, CredentialStore, Role, SeedUser, StoreError, StoreResult};
use leadx_data::{MemoryCache, MemoryCredentialStore};
use serde_json::{json, Value};
use tower::ServiceExt;

const SECRET: &str = "integration-test-secret-with-enough-bytes-for-hs512";
const PASSWORD: &str = "password123!";

struct TestApp {
    router: Router,
    state: Arc<AppState>,
    store: Arc<MemoryCredentialStore>,
}

async fn lead_handler(CurrentIdentity(identity): CurrentIdentity) -> String {
    format!("lead for {}", identity.subject)
}

async fn admin_handler(CurrentIdentity(identity): CurrentIdentity) -> String {
    format!("admin {}", identity.subject)
}

async fn public_handler() -> &'static str {
    "public leads"
}

/// 항상 실패하거나 응답하지 않는 블랙리스트 저장소.
struct BrokenCache {
    hang: bool,
}

#[async_trait]
impl CacheStore for BrokenCache {
    async fn get(&self, _key: &str) -> StoreResult<Option<String>> {
        if self.hang {
            tokio::time::sleep(StdDuration::from_secs(30)).await;
        }
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: StdDuration) -> StoreResult<()> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn delete(&self, _key: &str) -> StoreResult<bool> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn ping(&self) -> StoreResult<()> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

fn test_app() -> TestApp {
    test_app_with_cache(Arc::new(MemoryCache::new()))
}

fn test_app_with_cache(cache: Arc<dyn CacheStore>) -> TestApp {
    let config = AppConfig::from_toml_str(&format!(
        "[jwt]\nsecret = \"{}\"\n\n[store]\ntimeout_ms = 50\n",
        SECRET
    ))
    .unwrap();

    let seed = vec![
        SeedUser {
            username: "alice".to_string(),
            password: PASSWORD.to_string(),
            roles: vec![Role::User],
        },
        SeedUser {
            username: "root".to_string(),
            password: PASSWORD.to_string(),
            roles: vec![Role::Admin],
        },
    ];
    let store = Arc::new(memory_store_from_seed(&seed).unwrap());

    let state = Arc::new(
        AppState::from_config(
            &config,
            store.clone(),
            Some(cache),
            None,
        )
        .unwrap(),
    );

    let business = create_api_router()
        .route("/api/lead/{id}", get(lead_handler))
        .route("/api/admin/x", get(admin_handler))
        .route("/api/public/leads", get(public_handler));

    let router = secure(business, state.clone(), &SecurityChain::standard());
    TestApp {
        router,
        state,
        store,
    }
}

async fn send(app: &TestApp, request: Request<Body>) -> Response {
    app.router.clone().oneshot(request).await.unwrap()
}

fn get_with(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn login(app: &TestApp, username: &str, password: &str) -> Response {
    send(
        app,
        post_json(
            "/api/auth/login",
            json!({"username": username, "password": password}),
        ),
    )
    .await
}

async fn login_tokens(app: &TestApp, username: &str) -> (String, String) {
    let response = login(app, username, PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    (
        body["accessToken"].as_str().unwrap().to_string(),
        body["refreshToken"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn test_login_access_and_role_checks() {
    let app = test_app();
    let (access, _) = login_tokens(&app, "alice").await;

    let response = send(&app, get_with("/api/lead/7", Some(&access))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, get_with("/api/admin/x", Some(&access))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["code"], "FORBIDDEN");

    let response = send(&app, get_with("/api/admin/x", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["code"], "UNAUTHENTICATED");

    let (admin_access, _) = login_tokens(&app, "root").await;
    let response = send(&app, get_with("/api/admin/x", Some(&admin_access))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_me_returns_identity() {
    let app = test_app();
    let (access, _) = login_tokens(&app, "alice").await;

    let response = send(&app, get_with("/api/auth/me", Some(&access))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["username"], "alice");
    assert_eq!(body["roles"], json!(["USER"]));
    assert_eq!(body["tokenType"], "access");
}

#[tokio::test]
async fn test_public_route_ignores_invalid_token() {
    let app = test_app();

    let response = send(&app, get_with("/api/public/leads", Some("garbage"))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, get_with("/health", Some("garbage"))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_protected_route_reports_token_reason() {
    let app = test_app();

    let expired = app
        .state
        .tokens
        .issue_access_token_at("alice", &[Role::User], Utc::now() - Duration::days(2))
        .unwrap();
    let response = send(&app, get_with("/api/lead/1", Some(&expired))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        "Bearer"
    );
    assert_eq!(json_body(response).await["code"], "TOKEN_EXPIRED");

    let (access, _) = login_tokens(&app, "alice").await;
    let mut tampered = access.clone();
    tampered.push('x');
    let response = send(&app, get_with("/api/lead/1", Some(&tampered))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["code"], "TOKEN_SIGNATURE_INVALID");
}

#[tokio::test]
async fn test_refresh_token_cannot_access_business_routes() {
    let app = test_app();
    let (_, refresh) = login_tokens(&app, "alice").await;

    let response = send(&app, get_with("/api/lead/1", Some(&refresh))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["code"], "WRONG_TOKEN_TYPE");
}

#[tokio::test]
async fn test_refresh_uses_current_roles() {
    let app = test_app();
    let (_, refresh) = login_tokens(&app, "alice").await;

    // 로그인 이후 관리자로 승격
    let mut promoted = app.store.find_by_username("alice").await.unwrap().unwrap();
    promoted.roles = vec![Role::Admin, Role::User];
    app.store.insert(promoted).await;

    let response = send(
        &app,
        post_json("/api/auth/refresh", json!({"refreshToken": refresh})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["tokenType"], "Bearer");
    let access = body["accessToken"].as_str().unwrap().to_string();

    let response = send(&app, get_with("/api/admin/x", Some(&access))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_rechecks_account_state() {
    let app = test_app();
    let (_, refresh) = login_tokens(&app, "alice").await;

    let mut disabled = app.store.find_by_username("alice").await.unwrap().unwrap();
    disabled.enabled = false;
    app.store.insert(disabled).await;

    let response = send(
        &app,
        post_json("/api/auth/refresh", json!({"refreshToken": refresh})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["code"], "ACCOUNT_DISABLED");
}

#[tokio::test]
async fn test_logout_revokes_access_token() {
    let app = test_app();
    let (access, _) = login_tokens(&app, "alice").await;

    let response = send(
        &app,
        post_json("/api/auth/logout", json!({"accessToken": access})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, get_with("/api/lead/1", Some(&access))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["code"], "TOKEN_REVOKED");
}

#[tokio::test]
async fn test_logout_with_header_token() {
    let app = test_app();
    let (access, _) = login_tokens(&app, "alice").await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/logout")
        .header(header::AUTHORIZATION, format!("Bearer {}", access))
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, request).await.status(), StatusCode::OK);

    let response = send(&app, get_with("/api/auth/me", Some(&access))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_lockout_after_repeated_failures() {
    let app = test_app();

    for _ in 0..5 {
        let response = login(&app, "alice", "wrong-password").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = login(&app, "alice", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::LOCKED);
    assert_eq!(json_body(response).await["code"], "ACCOUNT_LOCKED");

    // 다른 계정은 영향 없음
    let response = login(&app, "root", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);
}

async fn assert_blacklist_outage_fails_closed(app: &TestApp) {
    let (access, refresh) = login_tokens(app, "alice").await;

    let response = send(app, get_with("/api/lead/1", Some(&access))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["code"], "UNAUTHENTICATED");

    let response = send(app, get_with("/api/public/leads", Some(&access))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        app,
        post_json("/api/auth/refresh", json!({"refreshToken": refresh})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["code"], "UNAUTHENTICATED");

    let response = send(app, get_with("/health/ready", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "degraded");

    // 로그아웃은 블랙리스트 기록 실패와 무관하게 200
    let response = send(
        app,
        post_json("/api/auth/logout", json!({"accessToken": access})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_blacklist_unavailable_fails_closed() {
    let app = test_app_with_cache(Arc::new(BrokenCache { hang: false }));
    assert_blacklist_outage_fails_closed(&app).await;
}

#[tokio::test]
async fn test_blacklist_timeout_fails_closed() {
    let app = test_app_with_cache(Arc::new(BrokenCache { hang: true }));
    assert_blacklist_outage_fails_closed(&app).await;
}
