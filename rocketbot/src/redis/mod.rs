use std::time::Duration;

use anyhow::Context;
use redis::AsyncCommands;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::aio::ConnectionManager,
}

impl RedisClient {
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(url).context("failed to create Redis client")?;

        let manager = redis::aio::ConnectionManager::new(client)
            .await
            .context("failed to connect to Redis")?;

        Ok(Self { client: manager })
    }

    /// Store a session value, replacing the previous one and resetting its TTL.
    pub async fn put_session_value(
        &self,
        session_id: &str,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> anyhow::Result<()> {
        let mut conn = self.client.clone();
        let _: () = conn
            .set_ex(session_key(session_id, key), value, ttl.as_secs().max(1))
            .await
            .context("failed to store session value in Redis")?;
        Ok(())
    }

    /// Atomically read and delete a session value.
    pub async fn take_session_value(
        &self,
        session_id: &str,
        key: &str,
    ) -> anyhow::Result<Option<String>> {
        let mut conn = self.client.clone();
        let value: Option<String> = conn
            .get_del(session_key(session_id, key))
            .await
            .context("failed to consume session value from Redis")?;
        Ok(value)
    }
}

fn session_key(session_id: &str, key: &str) -> String {
    format!("session:{session_id}:{key}")
}
