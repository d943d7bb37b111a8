//! Redis 캐시 구현.
//!
//! 로그아웃된 토큰의 블랙리스트 저장소로 사용됩니다. 모든 항목은 TTL과 함께
//! 저장되어 토큰이 자연 만료되면 함께 사라집니다.

use std::time::Duration;

use async_trait::async_trait;
use leadx_core::{CacheStore, RedisConfig, StoreResult};
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use tracing::{debug, info, instrument};

use crate::error::{DataError, Result};

/// Redis 연결 래퍼.
#[derive(Clone)]
pub struct RedisCache {
    connection: MultiplexedConnection,
}

impl RedisCache {
    /// 새로운 Redis 캐시 연결을 생성합니다.
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        info!("Connecting to Redis...");

        let client = Client::open(config.url.as_str())
            .map_err(|e| DataError::ConnectionError(e.to_string()))?;

        let connection = client.get_multiplexed_async_connection().await?;

        info!("Redis connection established");

        Ok(Self { connection })
    }

    /// Redis 상태를 확인합니다.
    pub async fn health_check(&self) -> Result<bool> {
        let mut conn = self.connection.clone();
        let result: String = redis::cmd("PING").query_async(&mut conn).await?;

        Ok(result == "PONG")
    }

    /// Redis `SETEX`는 0초 TTL을 거부하므로 최소 1초로 올립니다.
    fn ttl_secs(ttl: Duration) -> u64 {
        let secs = ttl.as_secs();
        if ttl.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs.max(1)
        }
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await.map_err(DataError::from)?;
        Ok(value)
    }

    #[instrument(skip(self, value))]
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let ttl_secs = Self::ttl_secs(ttl);
        let mut conn = self.connection.clone();
        let _: () = conn
            .set_ex(key, value, ttl_secs)
            .await
            .map_err(DataError::from)?;

        debug!(ttl_secs, "Cache entry stored");
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.connection.clone();
        let deleted: i64 = conn.del(key).await.map_err(DataError::from)?;
        Ok(deleted > 0)
    }

    async fn ping(&self) -> StoreResult<()> {
        if self.health_check().await? {
            Ok(())
        } else {
            Err(DataError::CacheError("unexpected PING reply".to_string()).into())
        }
    }
}
