//! 인증 endpoint.
//!
//! - `POST /api/auth/login`: 자격증명 검증 후 토큰 쌍 발급
//! - `POST /api/auth/refresh`: Refresh Token으로 Access Token 재발급
//! - `POST /api/auth/logout`: Access Token 폐기 (최선 노력)
//! - `GET /api/auth/me`: 현재 신원 조회

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use validator::Validate;

use crate::auth::{CurrentIdentity, TokenService, TokenType};
use crate::error::{ApiResult, AuthRejection};
use crate::metrics::record_login;
use crate::middleware::extract_bearer;
use crate::state::AppState;

const BEARER: &str = "Bearer";

/// 로그인 요청.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// 사용자 이름
    #[validate(length(min = 1, max = 64, message = "사용자 이름은 1-64자여야 합니다"))]
    pub username: String,
    /// 비밀번호
    #[validate(length(min = 1, max = 128, message = "비밀번호는 1-128자여야 합니다"))]
    pub password: String,
}

/// 로그인 응답.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// 항상 "Bearer"
    pub token_type: String,
    /// Access Token 만료 시간 (초)
    pub expires_in: i64,
    pub username: String,
}

/// 토큰 갱신 요청.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// 토큰 갱신 응답.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// 로그아웃 요청. 본문이 없으면 Authorization 헤더의 토큰을 사용합니다.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    #[serde(default)]
    pub access_token: Option<String>,
}

/// 로그아웃 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub message: String,
}

/// 현재 신원 응답.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub username: String,
    pub roles: Vec<String>,
    pub token_type: TokenType,
}

fn validation_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{}: 유효하지 않은 값", field))
            })
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// 로그인.
///
/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(request) =
        payload.map_err(|e| AuthRejection::InvalidRequest(e.body_text()))?;

    if let Err(errors) = request.validate() {
        record_login("invalid_request");
        return Err(AuthRejection::InvalidRequest(validation_message(&errors)));
    }

    let principal = match state
        .provider
        .authenticate(&request.username, &request.password)
        .await
    {
        Ok(principal) => principal,
        Err(e) => {
            let rejection = AuthRejection::from(e);
            record_login(&rejection.code().to_lowercase());
            warn!(
                username = %request.username,
                reason = rejection.code(),
                "Login failed"
            );
            return Err(rejection);
        }
    };

    let pair = state
        .tokens
        .issue_token_pair(&principal.username, &principal.roles)?;

    record_login("success");
    info!(username = %principal.username, roles = ?principal.roles, "Login succeeded");

    Ok(Json(LoginResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        token_type: BEARER.to_string(),
        expires_in: pair.expires_in,
        username: principal.username,
    }))
}

/// Access Token 재발급.
///
/// 역할은 Refresh Token이 아니라 사용자 저장소에서 다시 조회합니다.
///
/// POST /api/auth/refresh
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<Json<RefreshResponse>> {
    let Json(request) =
        payload.map_err(|e| AuthRejection::InvalidRequest(e.body_text()))?;

    let claims = state.tokens.validate(&request.refresh_token)?;
    if !TokenService::is_refresh_token(&claims) {
        return Err(AuthRejection::WrongTokenType);
    }

    if let Some(blacklist) = &state.blacklist {
        match blacklist.is_revoked(&claims.jti).await {
            Ok(true) => return Err(AuthRejection::Revoked),
            Ok(false) => {}
            Err(e) => {
                warn!(error = %e, "Blacklist lookup failed during refresh");
                return Err(AuthRejection::Unauthenticated);
            }
        }
    }

    let principal = state.provider.resolve(&claims.sub).await.map_err(|e| {
        let rejection = AuthRejection::from(e);
        warn!(username = %claims.sub, reason = rejection.code(), "Token refresh denied");
        rejection
    })?;

    let access_token = state
        .tokens
        .issue_access_token(&principal.username, &principal.roles)?;

    debug!(username = %principal.username, "Access token refreshed");

    Ok(Json(RefreshResponse {
        access_token,
        token_type: BEARER.to_string(),
        expires_in: state.tokens.access_ttl_secs(),
    }))
}

/// 로그아웃.
///
/// 유효한 토큰이면 남은 수명 동안 블랙리스트에 기록합니다. 토큰이 없거나
/// 유효하지 않거나 블랙리스트 기록에 실패해도 항상 200을 반환합니다.
///
/// POST /api/auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<LogoutResponse> {
    let from_body = if body.is_empty() {
        None
    } else {
        serde_json::from_slice::<LogoutRequest>(&body)
            .map_err(|e| debug!(error = %e, "Ignoring unparseable logout body"))
            .ok()
            .and_then(|request| request.access_token)
    };
    let token = from_body.or_else(|| extract_bearer(&headers).map(str::to_string));

    if let (Some(token), Some(blacklist)) = (token, &state.blacklist) {
        match state.tokens.validate(&token) {
            Ok(claims) => match blacklist.revoke(&claims, Utc::now()).await {
                Ok(_) => info!(username = %claims.sub, "Logged out"),
                Err(e) => warn!(error = %e, "Failed to blacklist token on logout"),
            },
            Err(e) => debug!(error = %e, "Logout with invalid token, nothing to revoke"),
        }
    }

    Json(LogoutResponse {
        message: "로그아웃되었습니다".to_string(),
    })
}

/// 현재 신원 조회.
///
/// GET /api/auth/me
pub async fn me(CurrentIdentity(identity): CurrentIdentity) -> Json<MeResponse> {
    Json(MeResponse {
        username: identity.subject,
        roles: identity
            .roles
            .iter()
            .map(|role| role.as_str().to_string())
            .collect(),
        token_type: identity.token_type,
    })
}

/// 인증 라우터 생성.
pub fn auth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::SecurityChain;
    use crate::state::create_test_state;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app(state: Arc<AppState>) -> Router {
        let router = Router::new().nest("/api/auth", auth_router());
        SecurityChain::standard()
            .apply(router, &state)
            .with_state(state)
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
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_login_success() {
        let state = Arc::new(create_test_state());
        let response = app(state.clone())
            .oneshot(post_json(
                "/api/auth/login",
                json!({"username": "alice", "password": "password123!"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["tokenType"], "Bearer");
        assert_eq!(body["username"], "alice");
        assert_eq!(body["expiresIn"], 86400);

        let access = body["accessToken"].as_str().unwrap();
        let claims = state.tokens.validate(access).unwrap();
        assert_eq!(claims.authorities, vec!["USER".to_string()]);
    }

    #[tokio::test]
    async fn test_login_bad_credentials_same_for_unknown_user() {
        let state = Arc::new(create_test_state());

        let wrong = app(state.clone())
            .oneshot(post_json(
                "/api/auth/login",
                json!({"username": "alice", "password": "nope"}),
            ))
            .await
            .unwrap();
        let unknown = app(state)
            .oneshot(post_json(
                "/api/auth/login",
                json!({"username": "mallory", "password": "nope"}),
            ))
            .await
            .unwrap();

        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
        let wrong = json_body(wrong).await;
        let unknown = json_body(unknown).await;
        assert_eq!(wrong["code"], "INVALID_CREDENTIALS");
        assert_eq!(wrong["code"], unknown["code"]);
        assert_eq!(wrong["message"], unknown["message"]);
    }

    #[tokio::test]
    async fn test_login_validation_error() {
        let state = Arc::new(create_test_state());
        let response = app(state)
            .oneshot(post_json(
                "/api/auth/login",
                json!({"username": "", "password": "x"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let state = Arc::new(create_test_state());
        let access = state
            .tokens
            .issue_access_token("alice", &[leadx_core::Role::User])
            .unwrap();

        let response = app(state)
            .oneshot(post_json("/api/auth/refresh", json!({"refreshToken": access})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["code"], "WRONG_TOKEN_TYPE");
    }

    #[tokio::test]
    async fn test_refresh_unknown_subject() {
        let state = Arc::new(create_test_state());
        let refresh = state.tokens.issue_refresh_token("ghost").unwrap();

        let response = app(state)
            .oneshot(post_json("/api/auth/refresh", json!({"refreshToken": refresh})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn test_logout_without_token_is_ok() {
        let state = Arc::new(create_test_state());
        let response = app(state)
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/auth/logout")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_me_requires_authentication() {
        let state = Arc::new(create_test_state());
        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri("/api/auth/me")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
