//! 리드 거래소 인증 REST API.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - HS512 JWT 발급/검증 및 토큰 블랙리스트
//! - 사용자 이름/비밀번호 인증과 로그인 실패 잠금
//! - 경로 패턴 기반 역할 인가
//! - 선언 순서가 검증되는 보안 미들웨어 체인
//! - 인증/헬스 체크 엔드포인트와 Prometheus 메트릭
//!
//! # 모듈 구성
//!
//! - [`state`]: 애플리케이션 공유 상태 (AppState)
//! - [`routes`]: REST API 엔드포인트
//! - [`auth`]: 토큰, 자격증명, 인가 정책
//! - [`middleware`]: 보안 체인 및 메트릭 미들웨어
//! - [`metrics`]: Prometheus 메트릭 수집
//! - [`error`]: 거부 사유와 에러 응답

pub mod auth;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use auth::{
    AuthOutcome, AuthorizationPolicy, CurrentIdentity, Identity, TokenClaims, TokenService,
    TokenType,
};
pub use error::{ApiErrorResponse, ApiResult, AuthRejection, RejectionCode};
pub use metrics::setup_metrics_recorder;
pub use middleware::{metrics_layer, security_headers, SecurityChain, Stage};
pub use routes::*;
pub use state::AppState;
