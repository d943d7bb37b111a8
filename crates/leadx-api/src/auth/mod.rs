//! 인증 및 권한 부여.
//!
//! 상태 없는 JWT 인증과 경로 패턴 기반 역할 인가(RBAC)를 제공합니다.
//!
//! # 구성 요소
//!
//! - [`ClaimsCodec`]: HS512 서명/검증 및 클레임 직렬화
//! - [`TokenService`]: Access/Refresh Token 발급 및 검증
//! - [`CredentialValidator`]: 계정 상태와 비밀번호 검증
//! - [`AuthenticationProvider`]: 자격증명 출처 추상화
//! - [`AuthorizationPolicy`]: 경로/메서드별 필요 역할 결정
//! - [`TokenBlacklist`]: 로그아웃 토큰 폐기 목록
//!
//! # 사용 예시
//!
//! ```rust,ignore
//! // 보호된 라우트에서 CurrentIdentity 추출기 사용
//! async fn protected_handler(
//!     CurrentIdentity(identity): CurrentIdentity,
//! ) -> impl IntoResponse {
//!     format!("Hello, {}!", identity.subject)
//! }
//! ```

mod blacklist;
mod claims;
mod credentials;
mod identity;
mod password;
mod policy;
mod provider;
mod token;

use std::future::Future;
use std::time::Duration;

use leadx_core::{StoreError, StoreResult};

pub use blacklist::{TokenBlacklist, BLACKLIST_KEY_PREFIX};
pub use claims::{ClaimsCodec, TokenClaims, TokenType};
pub use credentials::{CredentialError, CredentialValidator};
pub use identity::{AuthOutcome, CurrentIdentity, Identity};
pub use password::{hash_password, verify_password, PasswordError};
pub use policy::{
    Access, AuthorizationPolicy, Decision, DenyReason, PolicyError, PublicPaths, RoutePattern,
};
pub use provider::{AuthenticationProvider, PasswordAuthenticationProvider, Principal};
pub use token::{TokenError, TokenPair, TokenService};

/// 저장소 호출에 시간 제한을 적용합니다.
///
/// 제한 시간 초과는 [`StoreError::Timeout`]으로 변환됩니다.
pub(crate) async fn bounded<T, F>(timeout: Duration, fut: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(timeout.as_millis() as u64)),
    }
}
