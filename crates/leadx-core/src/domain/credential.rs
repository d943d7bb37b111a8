//! 자격증명 레코드 및 잠금 정책.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::Role;

/// 외부 사용자 저장소가 소유한 자격증명.
///
/// 인증 서브시스템은 이 레코드를 읽기만 합니다. 실패 카운터와 잠금 시각의
/// 변경은 [`CredentialStore`](super::CredentialStore)에 위임됩니다.
#[derive(Debug, Clone)]
pub struct Credential {
    /// 고유 사용자 이름
    pub username: String,
    /// 저장된 비밀번호 해시 (PHC 형식, 불투명 검증자)
    pub password_hash: String,
    /// 계정 활성화 여부
    pub enabled: bool,
    /// 잠금 해제 시각 (미래면 잠김)
    pub locked_until: Option<DateTime<Utc>>,
    /// 계정 만료 시각
    pub account_expires_at: Option<DateTime<Utc>>,
    /// 비밀번호 만료 시각
    pub credentials_expire_at: Option<DateTime<Utc>>,
    /// 연속 로그인 실패 횟수
    pub failed_attempts: u32,
    /// 부여된 역할
    pub roles: Vec<Role>,
}

impl Credential {
    /// 활성 상태의 자격증명 생성.
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            username: username.into(),
            password_hash: password_hash.into(),
            enabled: true,
            locked_until: None,
            account_expires_at: None,
            credentials_expire_at: None,
            failed_attempts: 0,
            roles,
        }
    }

    /// 주어진 시각에 잠겨 있는지 확인.
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }

    /// 주어진 시각에 계정 또는 비밀번호가 만료되었는지 확인.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        let expired = |at: Option<DateTime<Utc>>| at.is_some_and(|at| at <= now);
        expired(self.account_expires_at) || expired(self.credentials_expire_at)
    }
}

/// 로그인 실패 잠금 정책.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutPolicy {
    /// 잠금까지 허용되는 연속 실패 횟수
    pub max_attempts: u32,
    /// 잠금 유지 시간 (분)
    pub lock_minutes: i64,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lock_minutes: 30,
        }
    }
}

impl LockoutPolicy {
    /// 잠금 유지 시간.
    pub fn lock_duration(&self) -> Duration {
        Duration::minutes(self.lock_minutes)
    }

    /// 현재 실패 횟수에서 한 번 더 실패하면 잠겨야 하는지 확인.
    pub fn should_lock_after(&self, failed_attempts: u32) -> bool {
        failed_attempts.saturating_add(1) >= self.max_attempts
    }
}

/// 실패 카운터 증가 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailedLogin {
    /// 증가 후 연속 실패 횟수
    pub attempts: u32,
    /// 설정된 잠금 해제 시각
    pub locked_until: Option<DateTime<Utc>>,
}
