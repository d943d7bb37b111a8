//! API 라우트.
//!
//! 인증 및 헬스 체크 엔드포인트를 정의하고 라우터를 구성합니다.
//!
//! # 라우트 구조
//!
//! - `/health` - 헬스 체크 (liveness)
//! - `/health/ready` - 상세 헬스 체크 (readiness)
//! - `/api/auth/login` - 로그인
//! - `/api/auth/refresh` - Access Token 재발급
//! - `/api/auth/logout` - 로그아웃
//! - `/api/auth/me` - 현재 신원

pub mod auth;
pub mod health;

pub use auth::{
    auth_router, LoginRequest, LoginResponse, LogoutRequest, LogoutResponse, MeResponse,
    RefreshRequest, RefreshResponse,
};
pub use health::{health_router, ComponentHealth, ComponentStatus, HealthResponse, Readiness};

use axum::Router;
use std::sync::Arc;

use crate::middleware::SecurityChain;
use crate::state::AppState;

/// 전체 API 라우터 생성.
///
/// 업무 라우터는 이 라우터에 병합한 뒤 [`secure`]로 보안 체인을 적용합니다.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/health", health_router())
        .nest("/api/auth", auth_router())
}

/// 라우터에 보안 체인을 적용하고 상태를 주입합니다.
///
/// 체인은 라우터에 이미 등록된 모든 경로에 적용됩니다.
pub fn secure(router: Router<Arc<AppState>>, state: Arc<AppState>, chain: &SecurityChain) -> Router {
    chain.apply(router, &state).with_state(state)
}
