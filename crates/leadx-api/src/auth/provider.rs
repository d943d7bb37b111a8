//! 인증 제공자.
//!
//! 자격증명 출처를 추상화하는 좁은 인터페이스입니다. 현재 구현은 사용자 저장소의
//! 비밀번호 해시를 검증하는 [`PasswordAuthenticationProvider`] 하나입니다.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use leadx_core::{CredentialStore, LockoutPolicy, Role, StoreResult};
use tracing::{info, warn};

use super::bounded;
use super::credentials::{CredentialError, CredentialValidator};

/// 인증된 주체.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// 사용자 이름
    pub username: String,
    /// 현재 역할
    pub roles: Vec<Role>,
}

/// 인증 제공자 계약.
#[async_trait]
pub trait AuthenticationProvider: Send + Sync {
    /// 사용자 이름/비밀번호로 인증합니다.
    async fn authenticate(&self, username: &str, password: &str)
        -> Result<Principal, CredentialError>;

    /// 비밀번호 없이 현재 계정 상태와 역할을 다시 조회합니다 (토큰 재발급용).
    async fn resolve(&self, username: &str) -> Result<Principal, CredentialError>;
}

/// 비밀번호 기반 인증 제공자.
///
/// 실패 시 저장소의 원자적 카운터 증가를, 성공 시 카운터 초기화를 호출합니다.
/// 카운터를 로컬에 캐시하거나 변경하지 않습니다.
pub struct PasswordAuthenticationProvider {
    validator: CredentialValidator,
    store: Arc<dyn CredentialStore>,
    timeout: Duration,
}

impl PasswordAuthenticationProvider {
    /// 새 제공자 생성.
    pub fn new(store: Arc<dyn CredentialStore>, policy: LockoutPolicy, timeout: Duration) -> Self {
        Self {
            validator: CredentialValidator::new(store.clone(), policy, timeout),
            store,
            timeout,
        }
    }

    /// 주어진 시각 기준으로 인증합니다.
    pub async fn authenticate_at(
        &self,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<Principal, CredentialError> {
        match self.validator.authenticate_at(username, password, now).await {
            Ok(credential) => {
                if let Err(e) = self.record_success(username, now).await {
                    warn!(error = %e, "Failed to reset login failure counter");
                }
                Ok(Principal {
                    username: credential.username,
                    roles: credential.roles,
                })
            }
            Err(CredentialError::BadPassword { should_lock }) => {
                let policy = *self.validator.policy();
                match bounded(
                    self.timeout,
                    self.store.record_failed_login(username, &policy, now),
                )
                .await
                {
                    Ok(failed) => {
                        if failed.locked_until.is_some() {
                            warn!(
                                attempts = failed.attempts,
                                "Login failure threshold reached, account locked"
                            );
                        }
                    }
                    Err(e) => warn!(error = %e, "Failed to record login failure"),
                }
                Err(CredentialError::BadPassword { should_lock })
            }
            Err(e) => Err(e),
        }
    }

    /// 주어진 시각 기준으로 계정 상태와 역할을 다시 조회합니다.
    pub async fn resolve_at(
        &self,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<Principal, CredentialError> {
        let credential = self.validator.lookup(username).await?;
        CredentialValidator::check_account_state(&credential, now)?;
        Ok(Principal {
            username: credential.username,
            roles: credential.roles,
        })
    }

    /// 계정 잠금을 명시적으로 해제합니다.
    pub async fn unlock(&self, username: &str) -> StoreResult<()> {
        bounded(self.timeout, self.store.unlock(username)).await?;
        info!(username = %username, "Account unlocked");
        Ok(())
    }

    async fn record_success(&self, username: &str, now: DateTime<Utc>) -> StoreResult<()> {
        bounded(
            self.timeout,
            self.store.record_successful_login(username, now),
        )
        .await
    }
}

#[async_trait]
impl AuthenticationProvider for PasswordAuthenticationProvider {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Principal, CredentialError> {
        self.authenticate_at(username, password, Utc::now()).await
    }

    async fn resolve(&self, username: &str) -> Result<Principal, CredentialError> {
        self.resolve_at(username, Utc::now()).await
    }
}
