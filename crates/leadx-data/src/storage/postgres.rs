//! PostgreSQL 자격증명 저장소.
//!
//! 기존 `sys_user` 테이블에서 자격증명을 읽고 로그인 실패 카운터와 잠금 시각을
//! 갱신합니다. 카운터 증가와 잠금 설정은 단일 `UPDATE ... RETURNING` 문으로
//! 수행되므로 동시 로그인 시도에서도 증가분이 유실되지 않습니다.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use leadx_core::{
    Credential, CredentialStore, DatabaseConfig, FailedLogin, LockoutPolicy, Role, StoreResult,
};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use tracing::{debug, info, instrument, warn};

use crate::error::{DataError, Result};

/// `sys_user.status`에서 활성 계정을 나타내는 값.
const STATUS_ENABLED: i32 = 1;

/// 데이터베이스 연결 풀 래퍼.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 새로운 데이터베이스 연결 풀을 생성합니다.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| DataError::ConnectionError(e.to_string()))?;

        info!("Database connection established");

        Ok(Self { pool })
    }

    /// 내부 연결 풀을 반환합니다.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 데이터베이스 마이그레이션을 실행합니다.
    pub async fn migrate(&self) -> Result<()> {
        info!("Running database migrations...");

        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DataError::MigrationError(e.to_string()))?;

        info!("Migrations completed successfully");
        Ok(())
    }

    /// 데이터베이스 상태를 확인합니다.
    pub async fn health_check(&self) -> Result<bool> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(true)
    }
}

/// `sys_user` 조회 결과.
#[derive(Debug, FromRow)]
struct SysUserRow {
    username: String,
    password: String,
    status: Option<i32>,
    user_type: Option<i32>,
    login_fail_count: Option<i32>,
    lock_time: Option<DateTime<Utc>>,
    account_expire_time: Option<DateTime<Utc>>,
    credential_expire_time: Option<DateTime<Utc>>,
}

impl From<SysUserRow> for Credential {
    fn from(row: SysUserRow) -> Self {
        Credential {
            username: row.username,
            password_hash: row.password,
            enabled: row.status == Some(STATUS_ENABLED),
            locked_until: row.lock_time,
            account_expires_at: row.account_expire_time,
            credentials_expire_at: row.credential_expire_time,
            failed_attempts: row.login_fail_count.unwrap_or(0).max(0) as u32,
            roles: Role::from_user_type(row.user_type.unwrap_or(1)),
        }
    }
}

/// 실패 카운터 갱신 결과.
#[derive(Debug, FromRow)]
struct FailCountRow {
    login_fail_count: i32,
    lock_time: Option<DateTime<Utc>>,
}

/// `sys_user` 테이블 기반 자격증명 저장소.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    /// 연결 풀로 저장소 생성.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    #[instrument(skip(self))]
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<Credential>> {
        let row = sqlx::query_as::<_, SysUserRow>(
            r#"
            SELECT username, password, status, user_type, login_fail_count, lock_time,
                   account_expire_time, credential_expire_time
            FROM sys_user
            WHERE username = $1 AND deleted = 0
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(DataError::from)?;

        debug!(found = row.is_some(), "Credential lookup");
        Ok(row.map(Credential::from))
    }

    #[instrument(skip(self, policy))]
    async fn record_failed_login(
        &self,
        username: &str,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> StoreResult<FailedLogin> {
        let lock_until = now + policy.lock_duration();
        let row = sqlx::query_as::<_, FailCountRow>(
            r#"
            UPDATE sys_user
            SET login_fail_count = COALESCE(login_fail_count, 0) + 1,
                lock_time = CASE
                    WHEN COALESCE(login_fail_count, 0) + 1 >= $2 THEN $3
                    ELSE lock_time
                END,
                update_time = $4
            WHERE username = $1 AND deleted = 0
            RETURNING login_fail_count, lock_time
            "#,
        )
        .bind(username)
        .bind(policy.max_attempts as i32)
        .bind(lock_until)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(DataError::from)?;

        let Some(row) = row else {
            return Ok(FailedLogin {
                attempts: 0,
                locked_until: None,
            });
        };

        let attempts = row.login_fail_count.max(0) as u32;
        if attempts >= policy.max_attempts {
            warn!(attempts, locked_until = ?row.lock_time, "Account locked after repeated login failures");
        }

        Ok(FailedLogin {
            attempts,
            locked_until: row.lock_time,
        })
    }

    #[instrument(skip(self))]
    async fn record_successful_login(&self, username: &str, now: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE sys_user
            SET login_fail_count = 0, lock_time = NULL, last_login_time = $2, update_time = $2
            WHERE username = $1 AND deleted = 0
            "#,
        )
        .bind(username)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(DataError::from)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn unlock(&self, username: &str) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE sys_user
            SET login_fail_count = 0, lock_time = NULL, update_time = NOW()
            WHERE username = $1 AND deleted = 0
            "#,
        )
        .bind(username)
        .execute(&self.pool)
        .await
        .map_err(DataError::from)?;

        info!(rows = result.rows_affected(), "Account unlocked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> SysUserRow {
        SysUserRow {
            username: "corp".to_string(),
            password: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
            status: Some(1),
            user_type: Some(2),
            login_fail_count: Some(3),
            lock_time: None,
            account_expire_time: None,
            credential_expire_time: None,
        }
    }

    #[test]
    fn test_row_to_credential() {
        let credential = Credential::from(row());
        assert_eq!(credential.username, "corp");
        assert!(credential.enabled);
        assert_eq!(credential.failed_attempts, 3);
        assert_eq!(credential.roles, vec![Role::Enterprise]);
    }

    #[test]
    fn test_disabled_status() {
        let mut disabled = row();
        disabled.status = Some(0);
        assert!(!Credential::from(disabled).enabled);

        let mut missing = row();
        missing.status = None;
        assert!(!Credential::from(missing).enabled);
    }

    #[test]
    fn test_admin_user_type() {
        let mut admin = row();
        admin.user_type = Some(3);
        admin.login_fail_count = None;
        let credential = Credential::from(admin);
        assert_eq!(credential.roles, vec![Role::Admin, Role::User]);
        assert_eq!(credential.failed_attempts, 0);
    }
}
