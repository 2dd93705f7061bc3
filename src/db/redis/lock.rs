use redis::Client;
use std::fmt::Display;
use std::time::Duration;

use crate::{
    error::AppResult,
    models::UserId,
    services::run_lock::{LockToken, RunLock},
};

/// Deletes the key only while it still holds the caller's token
const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Resets the expiry only while the key still holds the caller's token
const EXTEND_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("PEXPIRE", KEYS[1], ARGV[2])
else
    return 0
end
"#;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LockKey {
    ComparisonRun(UserId),
}

impl Display for LockKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockKey::ComparisonRun(user) => write!(f, "taste:run:{}", user),
        }
    }
}

/// Creates a Redis client for run locks
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Run lock shared by every process pointed at the same Redis
///
/// Locks carry a TTL so a run whose process died stops blocking new runs
/// once the TTL passes. A live run keeps its lock by extending it every
/// third of the TTL.
#[derive(Clone)]
pub struct RedisRunLock {
    redis_client: Client,
    ttl_secs: u64,
}

impl RedisRunLock {
    pub fn new(redis_client: Client, ttl_secs: u64) -> Self {
        Self {
            redis_client,
            ttl_secs: ttl_secs.max(1),
        }
    }
}

#[async_trait::async_trait]
impl RunLock for RedisRunLock {
    async fn try_acquire(&self, user: &UserId) -> AppResult<Option<LockToken>> {
        let key = LockKey::ComparisonRun(user.clone()).to_string();
        let token = LockToken::new();
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;

        let reply: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(token.to_string())
            .arg("NX")
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async(&mut conn)
            .await?;

        if reply.is_some() {
            tracing::debug!(user = %user, ttl = self.ttl_secs, "Run lock acquired");
            Ok(Some(token))
        } else {
            tracing::debug!(user = %user, "Run lock already held");
            Ok(None)
        }
    }

    async fn extend(&self, user: &UserId, token: LockToken) -> AppResult<bool> {
        let key = LockKey::ComparisonRun(user.clone()).to_string();
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;

        let extended: i64 = redis::Script::new(EXTEND_SCRIPT)
            .key(&key)
            .arg(token.to_string())
            .arg(self.ttl_secs * 1000)
            .invoke_async(&mut conn)
            .await?;

        Ok(extended == 1)
    }

    async fn release(&self, user: &UserId, token: LockToken) -> AppResult<bool> {
        let key = LockKey::ComparisonRun(user.clone()).to_string();
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;

        let deleted: i64 = redis::Script::new(RELEASE_SCRIPT)
            .key(&key)
            .arg(token.to_string())
            .invoke_async(&mut conn)
            .await?;

        if deleted == 0 {
            tracing::warn!(user = %user, "Run lock expired before release");
        }

        Ok(deleted == 1)
    }

    fn renew_every(&self) -> Option<Duration> {
        Some(Duration::from_millis(self.ttl_secs * 1000 / 3))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_key_display() {
        let key = LockKey::ComparisonRun(UserId::parse("4812").unwrap());
        assert_eq!(format!("{}", key), "taste:run:4812");
    }

    #[test]
    fn test_renews_every_third_of_ttl() {
        let client = create_redis_client("redis://localhost:6379").unwrap();
        let lock = RedisRunLock::new(client.clone(), 30);
        assert_eq!(lock.renew_every(), Some(Duration::from_secs(10)));

        let lock = RedisRunLock::new(client, 0);
        assert_eq!(lock.renew_every(), Some(Duration::from_millis(333)));
    }

    fn test_lock() -> RedisRunLock {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        RedisRunLock::new(create_redis_client(&redis_url).unwrap(), 30)
    }

    // Needs a live Redis; run with `cargo test -- --ignored`
    #[tokio::test]
    #[ignore]
    async fn test_acquire_is_exclusive_until_release() {
        let lock = test_lock();
        let user = UserId::parse("redis-lock-exclusive").unwrap();

        let token = lock.try_acquire(&user).await.unwrap().unwrap();
        assert!(lock.try_acquire(&user).await.unwrap().is_none());

        assert!(lock.release(&user, token).await.unwrap());
        let again = lock.try_acquire(&user).await.unwrap().unwrap();
        lock.release(&user, again).await.unwrap();
    }

    #[tokio::test]
    #[ignore]
    async fn test_extend_keeps_lock_for_holder_only() {
        let lock = test_lock();
        let user = UserId::parse("redis-lock-extend").unwrap();

        let token = lock.try_acquire(&user).await.unwrap().unwrap();
        assert!(lock.extend(&user, token).await.unwrap());
        assert!(!lock.extend(&user, LockToken::new()).await.unwrap());

        lock.release(&user, token).await.unwrap();
        assert!(!lock.extend(&user, token).await.unwrap());
    }

    #[tokio::test]
    #[ignore]
    async fn test_foreign_token_cannot_release() {
        let lock = test_lock();
        let user = UserId::parse("redis-lock-foreign").unwrap();

        let token = lock.try_acquire(&user).await.unwrap().unwrap();
        assert!(!lock.release(&user, LockToken::new()).await.unwrap());
        assert!(lock.try_acquire(&user).await.unwrap().is_none());

        lock.release(&user, token).await.unwrap();
    }
}
