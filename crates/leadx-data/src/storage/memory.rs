//! 메모리 저장소.
//!
//! 외부 데이터베이스나 Redis 없이 서버를 실행하거나 테스트할 때 사용합니다.
//! 프로세스가 종료되면 모든 상태가 사라집니다.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use leadx_core::{
    CacheStore, Credential, CredentialStore, FailedLogin, LockoutPolicy, StoreResult,
};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::warn;

/// TTL을 지원하는 메모리 캐시.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    /// 빈 캐시 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// 만료된 항목을 제거하고 제거된 개수를 반환합니다.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        before - entries.len()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|(_, expires_at)| *expires_at > Instant::now())
            .map(|(value, _)| value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let expires_at = Instant::now() + ttl;
        self.entries
            .write()
            .await
            .insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// 메모리 자격증명 저장소.
///
/// 실패 카운터 증가와 잠금 설정은 하나의 쓰기 잠금 안에서 수행됩니다.
#[derive(Default)]
pub struct MemoryCredentialStore {
    users: RwLock<HashMap<String, Credential>>,
}

impl MemoryCredentialStore {
    /// 빈 저장소 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// 초기 자격증명으로 저장소 생성.
    pub fn with_credentials(credentials: impl IntoIterator<Item = Credential>) -> Self {
        let users = credentials
            .into_iter()
            .map(|c| (c.username.clone(), c))
            .collect();
        Self {
            users: RwLock::new(users),
        }
    }

    /// 자격증명 추가 또는 교체.
    pub async fn insert(&self, credential: Credential) {
        self.users
            .write()
            .await
            .insert(credential.username.clone(), credential);
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<Credential>> {
        Ok(self.users.read().await.get(username).cloned())
    }

    async fn record_failed_login(
        &self,
        username: &str,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> StoreResult<FailedLogin> {
        let mut users = self.users.write().await;
        let Some(credential) = users.get_mut(username) else {
            return Ok(FailedLogin {
                attempts: 0,
                locked_until: None,
            });
        };

        credential.failed_attempts = credential.failed_attempts.saturating_add(1);
        if credential.failed_attempts >= policy.max_attempts {
            let until = now + policy.lock_duration();
            credential.locked_until = Some(until);
            warn!(
                username,
                attempts = credential.failed_attempts,
                locked_until = %until,
                "Account locked after repeated login failures"
            );
        }

        Ok(FailedLogin {
            attempts: credential.failed_attempts,
            locked_until: credential.locked_until,
        })
    }

    async fn record_successful_login(&self, username: &str, _now: DateTime<Utc>) -> StoreResult<()> {
        if let Some(credential) = self.users.write().await.get_mut(username) {
            credential.failed_attempts = 0;
            credential.locked_until = None;
        }
        Ok(())
    }

    async fn unlock(&self, username: &str) -> StoreResult<()> {
        self.record_successful_login(username, Utc::now()).await
    }
}
