use async_trait::async_trait;
use redis::cmd;

use crate::core::redis::RedisHandle;
use crate::session::store::{StoreError, TimeStore};

/// [`TimeStore`] backed by Redis. Every expiring write refreshes the key's TTL.
#[derive(Clone)]
pub(crate) struct RedisTimeStore {
    redis: RedisHandle,
    ttl_seconds: u64,
}

impl RedisTimeStore {
    pub(crate) fn new(redis: RedisHandle, ttl_seconds: u64) -> Self {
        Self { redis, ttl_seconds }
    }
}

#[async_trait]
impl TimeStore for RedisTimeStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut connection = self.redis.connection().await.ok_or(StoreError::Unavailable)?;
        let value = cmd("GET").arg(key).query_async::<_, Option<String>>(&mut connection).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut connection = self.redis.connection().await.ok_or(StoreError::Unavailable)?;
        let mut command = cmd("SET");
        command.arg(key).arg(value);
        if self.ttl_seconds > 0 {
            command.arg("EX").arg(self.ttl_seconds);
        }
        command.query_async::<_, ()>(&mut connection).await?;
        Ok(())
    }

    async fn set_permanent(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut connection = self.redis.connection().await.ok_or(StoreError::Unavailable)?;
        cmd("SET").arg(key).arg(value).query_async::<_, ()>(&mut connection).await?;
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<(), StoreError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut connection = self.redis.connection().await.ok_or(StoreError::Unavailable)?;
        cmd("DEL").arg(keys).query_async::<_, ()>(&mut connection).await?;
        Ok(())
    }
}
