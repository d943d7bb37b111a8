//! 헬스 체크 endpoint.
//!
//! 두 경로 모두 공개 경로이며 보안 체인은 토큰 검증을 생략합니다.
//! 사용자 저장소 장애는 로그인 불가이므로 `unhealthy`(503), 블랙리스트 장애는
//! 보호 경로가 익명으로 처리될 뿐이므로 `degraded`(200)로 보고합니다.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::state::AppState;

/// 전체 서비스 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Readiness {
    Healthy,
    Degraded,
    Unhealthy,
}

/// 컴포넌트 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentStatus {
    Up,
    Down,
    NotConfigured,
}

impl ComponentStatus {
    fn probe(configured: bool, healthy: bool) -> Self {
        match (configured, healthy) {
            (false, _) => ComponentStatus::NotConfigured,
            (true, true) => ComponentStatus::Up,
            (true, false) => ComponentStatus::Down,
        }
    }
}

/// 컴포넌트별 상태.
#[derive(Debug, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub database: ComponentStatus,
    pub blacklist: ComponentStatus,
}

impl ComponentHealth {
    /// 컴포넌트 상태로부터 전체 상태 판정.
    pub fn readiness(&self) -> Readiness {
        if self.database == ComponentStatus::Down {
            Readiness::Unhealthy
        } else if self.blacklist == ComponentStatus::Down {
            Readiness::Degraded
        } else {
            Readiness::Healthy
        }
    }
}

/// 상세 헬스 체크 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: Readiness,
    pub version: String,
    pub uptime_secs: i64,
    pub components: ComponentHealth,
}

/// GET /health (liveness)
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /health/ready (readiness)
pub async fn health_ready(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let components = ComponentHealth {
        database: ComponentStatus::probe(state.database.is_some(), state.is_db_healthy().await),
        blacklist: ComponentStatus::probe(
            state.blacklist.is_some(),
            state.is_blacklist_healthy().await,
        ),
    };

    let status = components.readiness();
    let code = match status {
        Readiness::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        Readiness::Healthy | Readiness::Degraded => StatusCode::OK,
    };

    let response = HealthResponse {
        status,
        version: state.version.clone(),
        uptime_secs: state.uptime_secs(),
        components,
    };

    (code, Json(response))
}

/// 헬스 체크 라우터 생성.
pub fn health_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(health_check))
        .route("/ready", get(health_ready))
}
