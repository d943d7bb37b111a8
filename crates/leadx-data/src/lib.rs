//! 자격증명 및 토큰 블랙리스트 저장소.
//!
//! 이 crate는 다음을 제공합니다:
//! - PostgreSQL `sys_user` 테이블 기반 자격증명 저장소
//! - Redis 캐시 저장소 (토큰 블랙리스트)
//! - 개발/테스트용 메모리 저장소

pub mod error;
pub mod storage;

pub use error::{DataError, Result};

// 저장소 타입 재내보내기
pub use storage::memory::{MemoryCache, MemoryCredentialStore};
pub use storage::postgres::{Database, PgCredentialStore};
pub use storage::redis::RedisCache;
