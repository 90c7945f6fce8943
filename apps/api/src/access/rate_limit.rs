//! Per-token write throttling for the public chat path.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::errors::AppError;

#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Records one request for `key`. Returns `false` when the key is over its limit.
    async fn check(&self, key: &str) -> Result<bool, AppError>;
}

/// Fixed one-minute window counter in Redis, shared by every API replica.
pub struct RedisRateLimiter {
    client: redis::Client,
    limit: u32,
    window_secs: i64,
}

impl RedisRateLimiter {
    pub fn new(client: redis::Client, limit_per_minute: u32) -> Self {
        Self {
            client,
            limit: limit_per_minute,
            window_secs: 60,
        }
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn check(&self, key: &str) -> Result<bool, AppError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let redis_key = format!("screening:ratelimit:{key}");
        let count: i64 = conn.incr(&redis_key, 1).await?;
        if count == 1 {
            let _: () = conn.expire(&redis_key, self.window_secs).await?;
        }
        Ok(count <= i64::from(self.limit))
    }
}

/// Sliding-window limiter kept in process memory. Used with the memory backend.
/// Keys with no hit inside the window are dropped on the next check.
pub struct MemoryRateLimiter {
    limit: usize,
    window: Duration,
    hits: Mutex<HashMap<String, Vec<Instant>>>,
}

impl MemoryRateLimiter {
    pub fn new(limit_per_minute: u32) -> Self {
        Self {
            limit: limit_per_minute as usize,
            window: Duration::from_secs(60),
            hits: Mutex::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    async fn tracked_keys(&self) -> usize {
        self.hits.lock().await.len()
    }
}

#[async_trait]
impl RateLimiter for MemoryRateLimiter {
    async fn check(&self, key: &str) -> Result<bool, AppError> {
        let now = Instant::now();
        let window = self.window;
        let mut hits = self.hits.lock().await;
        hits.retain(|_, times| {
            times.retain(|t| now.duration_since(*t) < window);
            !times.is_empty()
        });
        let entry = hits.entry(key.to_string()).or_default();
        if entry.len() >= self.limit {
            return Ok(false);
        }
        entry.push(now);
        Ok(true)
    }
}
