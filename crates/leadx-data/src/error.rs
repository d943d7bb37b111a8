//! 데이터 모듈 오류 타입.

use leadx_core::StoreError;
use thiserror::Error;

/// 데이터 관련 오류.
#[derive(Debug, Error)]
pub enum DataError {
    /// 데이터베이스 연결 오류
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    /// 쿼리 실행 오류
    #[error("Query error: {0}")]
    QueryError(String),

    /// 캐시 오류
    #[error("Cache error: {0}")]
    CacheError(String),

    /// 마이그레이션 오류
    #[error("Migration error: {0}")]
    MigrationError(String),

    /// 연결 풀 소진
    #[error("Connection pool exhausted")]
    PoolExhausted,
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => DataError::PoolExhausted,
            sqlx::Error::Io(e) => DataError::ConnectionError(e.to_string()),
            sqlx::Error::PoolClosed => DataError::ConnectionError("pool closed".to_string()),
            sqlx::Error::Database(db_err) => DataError::QueryError(db_err.message().to_string()),
            _ => DataError::QueryError(err.to_string()),
        }
    }
}

impl From<redis::RedisError> for DataError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error() || err.is_connection_refusal() || err.is_connection_dropped() {
            DataError::ConnectionError(err.to_string())
        } else {
            DataError::CacheError(err.to_string())
        }
    }
}

impl From<DataError> for StoreError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::ConnectionError(msg) => StoreError::Unavailable(msg),
            DataError::PoolExhausted => StoreError::Unavailable(err.to_string()),
            DataError::QueryError(msg)
            | DataError::CacheError(msg)
            | DataError::MigrationError(msg) => StoreError::Query(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
