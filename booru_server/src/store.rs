use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use serde_json::Value;

use booru_core::{CacheStore, Error as CoreError, Result as CoreResult};

/// Redis-backed cache. Values are stored as JSON strings under `{prefix}{key}`.
#[derive(Clone)]
pub struct RedisStore {
    connection: MultiplexedConnection,
    prefix: String,
}

impl RedisStore {
    pub async fn connect(url: &str, prefix: &str) -> anyhow::Result<Self> {
        let client = Client::open(url)?;
        let connection = client.get_multiplexed_async_connection().await?;
        tracing::info!("Connected to Redis at {}", url);
        Ok(RedisStore {
            connection,
            prefix: prefix.to_string(),
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

fn store_error(command: &str, err: redis::RedisError) -> CoreError {
    CoreError::StoreError(format!("Redis {} error: {}", command, err))
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> CoreResult<Option<Value>> {
        let mut conn = self.connection.clone();
        let raw: Option<String> = conn.get(self.key(key)).await.map_err(|e| store_error("GET", e))?;
        let value = raw.map(|s| serde_json::from_str(&s)).transpose()?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &Value, ttl_seconds: u64) -> CoreResult<()> {
        let mut conn = self.connection.clone();
        let raw = serde_json::to_string(value)?;
        if ttl_seconds > 0 {
            let _: () = conn
                .set_ex(self.key(key), raw, ttl_seconds)
                .await
                .map_err(|e| store_error("SETEX", e))?;
        } else {
            let _: () = conn.set(self.key(key), raw).await.map_err(|e| store_error("SET", e))?;
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> CoreResult<()> {
        let mut conn = self.connection.clone();
        let _: i64 = conn.del(self.key(key)).await.map_err(|e| store_error("DEL", e))?;
        Ok(())
    }

    async fn expire(&self, key: &str, seconds: u64) -> CoreResult<()> {
        let mut conn = self.connection.clone();
        let seconds = i64::try_from(seconds).unwrap_or(i64::MAX);
        let _: bool = conn
            .expire(self.key(key), seconds)
            .await
            .map_err(|e| store_error("EXPIRE", e))?;
        Ok(())
    }
}
