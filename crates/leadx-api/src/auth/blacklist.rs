//! 로그아웃 토큰 블랙리스트.
//!
//! 토큰 원문 대신 `jti`를 키로 저장하고, 토큰의 남은 수명을 TTL로 사용합니다.
//! 영구 폐기 목록이 아니며 저장소 장애 시 기록이 유실될 수 있습니다.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use leadx_core::{CacheStore, StoreResult};
use tracing::debug;

use super::bounded;
use super::claims::TokenClaims;

/// 블랙리스트 키 접두사.
pub const BLACKLIST_KEY_PREFIX: &str = "blacklist_token:";

/// 캐시 저장소 기반 토큰 블랙리스트.
#[derive(Clone)]
pub struct TokenBlacklist {
    cache: Arc<dyn CacheStore>,
    timeout: Duration,
}

impl TokenBlacklist {
    /// 새 블랙리스트 생성.
    pub fn new(cache: Arc<dyn CacheStore>, timeout: Duration) -> Self {
        Self { cache, timeout }
    }

    fn key(jti: &str) -> String {
        format!("{}{}", BLACKLIST_KEY_PREFIX, jti)
    }

    /// 토큰을 폐기 목록에 추가합니다.
    ///
    /// 이미 만료된 토큰은 기록하지 않고 `Ok(false)`를 반환합니다.
    pub async fn revoke(&self, claims: &TokenClaims, now: DateTime<Utc>) -> StoreResult<bool> {
        let remaining = claims.exp - now.timestamp();
        if remaining <= 0 {
            return Ok(false);
        }

        let ttl = Duration::from_secs(remaining as u64);
        bounded(
            self.timeout,
            self.cache.set(&Self::key(&claims.jti), &claims.sub, ttl),
        )
        .await?;

        debug!(ttl_secs = remaining, "Token blacklisted");
        Ok(true)
    }

    /// 폐기된 토큰인지 확인합니다.
    pub async fn is_revoked(&self, jti: &str) -> StoreResult<bool> {
        let value = bounded(self.timeout, self.cache.get(&Self::key(jti))).await?;
        Ok(value.is_some())
    }

    /// 캐시 저장소 상태 확인.
    pub async fn ping(&self) -> StoreResult<()> {
        bounded(self.timeout, self.cache.ping()).await
    }
}
