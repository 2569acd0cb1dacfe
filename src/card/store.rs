//! Consumed payment intent tracking
//!
//! Once an intent has paid for a request it is recorded here; later attempts
//! to reuse it are refused.

use crate::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Record of payment intents that already paid for a request
#[async_trait]
pub trait ConsumedIntentStore: Send + Sync {
    /// Whether the intent has been consumed
    async fn is_consumed(&self, intent_id: &str) -> Result<bool>;

    /// Consume the intent; returns `true` only for the call that consumed it
    async fn consume(&self, intent_id: &str) -> Result<bool>;

    /// Forget a consumed intent (e.g. after a refund)
    async fn release(&self, intent_id: &str) -> Result<()>;
}

/// In-memory store, lost on restart
#[derive(Debug, Clone, Default)]
pub struct InMemoryIntentStore {
    consumed: Arc<RwLock<HashSet<String>>>,
}

impl InMemoryIntentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConsumedIntentStore for InMemoryIntentStore {
    async fn is_consumed(&self, intent_id: &str) -> Result<bool> {
        Ok(self.consumed.read().await.contains(intent_id))
    }

    async fn consume(&self, intent_id: &str) -> Result<bool> {
        Ok(self.consumed.write().await.insert(intent_id.to_string()))
    }

    async fn release(&self, intent_id: &str) -> Result<()> {
        self.consumed.write().await.remove(intent_id);
        Ok(())
    }
}

#[cfg(feature = "redis")]
pub mod redis_store {
    use super::{ConsumedIntentStore, Result};
    use crate::X402Error;
    use redis::aio::MultiplexedConnection;
    use redis::{AsyncCommands, Client};

    /// Consumed intents expire after 24 hours
    const CONSUMED_TTL_SECONDS: u64 = 86400;

    /// Redis-backed store, shared between server instances
    #[derive(Debug, Clone)]
    pub struct RedisIntentStore {
        client: Client,
        key_prefix: String,
    }

    impl RedisIntentStore {
        /// Create a store for `redis_url`; keys default to the `x402:intent:` prefix
        pub fn new(redis_url: &str, key_prefix: Option<&str>) -> Result<Self> {
            let client = Client::open(redis_url)
                .map_err(|e| X402Error::config(format!("Invalid Redis URL: {}", e)))?;

            Ok(Self {
                client,
                key_prefix: key_prefix.unwrap_or("x402:intent:").to_string(),
            })
        }

        fn make_key(&self, intent_id: &str) -> String {
            format!("{}{}", self.key_prefix, intent_id)
        }

        async fn connection(&self) -> Result<MultiplexedConnection> {
            self.client
                .get_multiplexed_async_connection()
                .await
                .map_err(|e| X402Error::storage(format!("Failed to get Redis connection: {}", e)))
        }
    }

    #[async_trait::async_trait]
    impl ConsumedIntentStore for RedisIntentStore {
        async fn is_consumed(&self, intent_id: &str) -> Result<bool> {
            let mut conn = self.connection().await?;
            conn.exists(self.make_key(intent_id))
                .await
                .map_err(|e| X402Error::storage(format!("Redis EXISTS failed: {}", e)))
        }

        async fn consume(&self, intent_id: &str) -> Result<bool> {
            let mut conn = self.connection().await?;
            let reply: Option<String> = redis::cmd("SET")
                .arg(self.make_key(intent_id))
                .arg("1")
                .arg("NX")
                .arg("EX")
                .arg(CONSUMED_TTL_SECONDS)
                .query_async(&mut conn)
                .await
                .map_err(|e| X402Error::storage(format!("Redis SET NX failed: {}", e)))?;

            Ok(reply.is_some())
        }

        async fn release(&self, intent_id: &str) -> Result<()> {
            let mut conn = self.connection().await?;
            conn.del::<_, ()>(self.make_key(intent_id))
                .await
                .map_err(|e| X402Error::storage(format!("Redis DEL failed: {}", e)))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        /// Tests are skipped when no Redis is reachable
        async fn redis_store() -> Option<RedisIntentStore> {
            let redis_url = std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string());
            let prefix = format!("test:{}:", uuid::Uuid::new_v4());
            let store = RedisIntentStore::new(&redis_url, Some(&prefix)).ok()?;
            match store.connection().await {
                Ok(_) => Some(store),
                Err(_) => {
                    println!("Skipping Redis test: Redis not available at {}", redis_url);
                    None
                }
            }
        }

        #[tokio::test]
        async fn test_redis_consume_once() {
            let Some(store) = redis_store().await else {
                return;
            };

            assert!(!store.is_consumed("pi_redis").await.unwrap());
            assert!(store.consume("pi_redis").await.unwrap());
            assert!(!store.consume("pi_redis").await.unwrap());
            assert!(store.is_consumed("pi_redis").await.unwrap());

            store.release("pi_redis").await.unwrap();
            assert!(!store.is_consumed("pi_redis").await.unwrap());
        }

        #[tokio::test]
        async fn test_redis_consumed_intent_expires() {
            let Some(store) = redis_store().await else {
                return;
            };

            store.consume("pi_ttl").await.unwrap();
            let mut conn = store.connection().await.unwrap();
            let ttl: i64 = conn.ttl(store.make_key("pi_ttl")).await.unwrap();
            assert!(ttl > 0 && ttl <= CONSUMED_TTL_SECONDS as i64);

            store.release("pi_ttl").await.unwrap();
        }
    }
}
