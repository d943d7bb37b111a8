//! 외부 협력자 계약.
//!
//! 인증 서브시스템이 의존하는 두 가지 외부 저장소를 정의합니다.
//! 두 계약의 모든 호출은 네트워크/데이터베이스 I/O이므로 호출 측에서
//! 타임아웃으로 감싸야 합니다.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{Credential, FailedLogin, LockoutPolicy};
use crate::error::StoreResult;

/// 사용자 자격증명 저장소.
///
/// 로그인 실패 카운터와 잠금 시각은 이 저장소만 변경합니다.
/// 각 변경은 한 번의 원자적 호출로 수행되어야 합니다.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// 사용자 이름으로 자격증명 조회.
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<Credential>>;

    /// 실패 카운터를 원자적으로 증가시키고, 정책 임계값에 도달하면 잠금을 설정합니다.
    async fn record_failed_login(
        &self,
        username: &str,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> StoreResult<FailedLogin>;

    /// 로그인 성공 시 실패 카운터와 잠금을 초기화합니다.
    async fn record_successful_login(&self, username: &str, now: DateTime<Utc>) -> StoreResult<()>;

    /// 잠금을 명시적으로 해제합니다.
    async fn unlock(&self, username: &str) -> StoreResult<()>;
}

/// 단순 키-값 캐시 저장소 (get/set/delete).
///
/// 토큰 블랙리스트 저장소로만 사용됩니다.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// 값 조회.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// TTL과 함께 값 저장.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    /// 키 삭제. 삭제된 키가 있으면 `true`.
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// 저장소 상태 확인.
    async fn ping(&self) -> StoreResult<()>;
}
