//! 사용자 이름/비밀번호 검증.
//!
//! 검사 순서: 존재 → 비활성 → 잠금 → 만료 → 비밀번호.
//! 첫 번째 실패에서 중단하므로 존재하지 않는 계정에는 비밀번호 해시 비교가
//! 수행되지 않습니다.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use leadx_core::{Credential, CredentialStore, LockoutPolicy, StoreError};
use tracing::{debug, error};

use super::bounded;
use super::password::verify_password;

/// 자격증명 검증 에러.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("사용자를 찾을 수 없습니다")]
    NotFound,
    #[error("비활성화된 계정입니다")]
    Disabled,
    #[error("잠긴 계정입니다 (해제 시각: {until})")]
    Locked { until: DateTime<Utc> },
    #[error("만료된 계정 또는 비밀번호입니다")]
    Expired,
    #[error("비밀번호가 일치하지 않습니다")]
    BadPassword {
        /// 이번 실패로 잠금 임계값에 도달하는지 여부
        should_lock: bool,
    },
    #[error("사용자 저장소를 사용할 수 없습니다: {0}")]
    Unavailable(#[from] StoreError),
}

/// 자격증명 검증기.
///
/// 저장소의 레코드를 읽기만 합니다. 실패 카운터 갱신은 호출 측이
/// [`CredentialStore::record_failed_login`]으로 위임합니다.
#[derive(Clone)]
pub struct CredentialValidator {
    store: Arc<dyn CredentialStore>,
    policy: LockoutPolicy,
    timeout: Duration,
}

impl CredentialValidator {
    /// 새 검증기 생성.
    pub fn new(store: Arc<dyn CredentialStore>, policy: LockoutPolicy, timeout: Duration) -> Self {
        Self {
            store,
            policy,
            timeout,
        }
    }

    /// 잠금 정책.
    pub fn policy(&self) -> &LockoutPolicy {
        &self.policy
    }

    /// 사용자 이름과 비밀번호 검증.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Credential, CredentialError> {
        self.authenticate_at(username, password, Utc::now()).await
    }

    /// 주어진 시각 기준으로 사용자 이름과 비밀번호 검증.
    pub async fn authenticate_at(
        &self,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<Credential, CredentialError> {
        let credential = self.lookup(username).await?;
        Self::check_account_state(&credential, now)?;

        let matches = verify_password(password, &credential.password_hash).unwrap_or_else(|e| {
            error!(error = %e, "Stored password hash could not be parsed");
            false
        });

        if !matches {
            let should_lock = self.policy.should_lock_after(credential.failed_attempts);
            debug!(
                attempts = credential.failed_attempts + 1,
                should_lock, "Password mismatch"
            );
            return Err(CredentialError::BadPassword { should_lock });
        }

        Ok(credential)
    }

    /// 자격증명 조회.
    pub async fn lookup(&self, username: &str) -> Result<Credential, CredentialError> {
        bounded(self.timeout, self.store.find_by_username(username))
            .await?
            .ok_or(CredentialError::NotFound)
    }

    /// 계정 상태 검사 (비활성 → 잠금 → 만료).
    pub fn check_account_state(
        credential: &Credential,
        now: DateTime<Utc>,
    ) -> Result<(), CredentialError> {
        if !credential.enabled {
            return Err(CredentialError::Disabled);
        }
        if let Some(until) = credential.locked_until.filter(|until| *until > now) {
            return Err(CredentialError::Locked { until });
        }
        if credential.is_expired_at(now) {
            return Err(CredentialError::Expired);
        }
        Ok(())
    }
}
