/// Token Revocation Blocklist
///
/// Revocation is keyed by the token's `jti`: presence of the key means
/// revoked, absence (including natural TTL expiry) means not revoked.
/// Entries expire on their own; the entry TTL is clamped to at least the
/// access-token lifetime so a revoked token can never outlive its entry.
///
/// Two implementations: Redis for deployments, an in-memory map for tests
/// and single-node runs. Both are idempotent on repeated revokes.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::configuration::RedisSettings;
use crate::error::AppError;

/// Floor for revocation entry lifetime in seconds (1 hour).
const JTI_EXPIRY_SECONDS: u64 = 3600;

/// Redis key namespace for revoked token identifiers.
const KEY_PREFIX: &str = "token_blocklist";

/// Entry lifetime: never shorter than the longest-lived access token it
/// has to shadow, otherwise a revoked-but-unexpired token could be
/// replayed after the entry lapses.
fn entry_ttl_seconds(access_token_expiry: i64) -> u64 {
    JTI_EXPIRY_SECONDS.max(access_token_expiry.max(0) as u64)
}

/// Expiring key-value store of revoked token identifiers.
#[async_trait]
pub trait TokenBlocklist: Send + Sync {
    /// Idempotently mark `jti` as revoked with the configured TTL.
    async fn revoke(&self, jti: &str) -> Result<(), AppError>;

    /// True only if `jti` is present and its entry has not yet expired.
    async fn is_revoked(&self, jti: &str) -> Result<bool, AppError>;
}

/// Redis-backed blocklist using `SET key "" EX ttl` / `GET key`.
#[derive(Clone)]
pub struct RedisBlocklist {
    conn: ConnectionManager,
    entry_ttl: u64,
}

impl RedisBlocklist {
    pub fn new(conn: ConnectionManager, access_token_expiry: i64) -> Self {
        Self {
            conn,
            entry_ttl: entry_ttl_seconds(access_token_expiry),
        }
    }

    /// Connect to Redis and build the blocklist client.
    ///
    /// # Errors
    /// Returns error if the connection cannot be established; callers
    /// treat this as fatal at startup.
    pub async fn connect(
        config: &RedisSettings,
        access_token_expiry: i64,
    ) -> Result<Self, AppError> {
        let client = redis::Client::open(config.connection_string())
            .map_err(|e| AppError::Store(format!("Redis client setup failed: {}", e)))?;

        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| AppError::Store(format!("Redis connection failed: {}", e)))?;

        tracing::info!(
            host = %config.host,
            port = config.port,
            "connected to revocation store"
        );

        Ok(Self::new(conn, access_token_expiry))
    }

    fn key(&self, jti: &str) -> String {
        format!("{}:{}", KEY_PREFIX, jti)
    }
}

#[async_trait]
impl TokenBlocklist for RedisBlocklist {
    async fn revoke(&self, jti: &str) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(self.key(jti), "", self.entry_ttl)
            .await
            .map_err(|e| AppError::Store(format!("SET failed: {}", e)))?;
        Ok(())
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool, AppError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn
            .get(self.key(jti))
            .await
            .map_err(|e| AppError::Store(format!("GET failed: {}", e)))?;
        Ok(value.is_some())
    }
}

/// In-memory blocklist with per-entry deadlines.
pub struct MemoryBlocklist {
    entries: Mutex<HashMap<String, Instant>>,
    entry_ttl: Duration,
}

impl MemoryBlocklist {
    pub fn new(access_token_expiry: i64) -> Self {
        Self::with_entry_ttl(Duration::from_secs(entry_ttl_seconds(access_token_expiry)))
    }

    /// Build with an explicit entry TTL. Test-oriented; the production
    /// constructor enforces the TTL floor.
    pub fn with_entry_ttl(entry_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            entry_ttl,
        }
    }
}

#[async_trait]
impl TokenBlocklist for MemoryBlocklist {
    async fn revoke(&self, jti: &str) -> Result<(), AppError> {
        let now = Instant::now();
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| AppError::Store("blocklist lock poisoned".to_string()))?;
        // Sweep lapsed entries while holding the lock, so identifiers of
        // tokens that are never replayed do not accumulate forever.
        entries.retain(|_, deadline| *deadline > now);
        entries.insert(jti.to_string(), now + self.entry_ttl);
        Ok(())
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool, AppError> {
        let now = Instant::now();
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| AppError::Store("blocklist lock poisoned".to_string()))?;
        match entries.get(jti) {
            Some(deadline) if *deadline > now => Ok(true),
            Some(_) => {
                // Lapsed entry, drop it eagerly.
                entries.remove(jti);
                Ok(false)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_ttl_floor() {
        assert_eq!(entry_ttl_seconds(60), 3600);
        assert_eq!(entry_ttl_seconds(3600), 3600);
        assert_eq!(entry_ttl_seconds(-5), 3600);
    }

    #[test]
    fn test_entry_ttl_tracks_long_access_tokens() {
        assert_eq!(entry_ttl_seconds(7200), 7200);
    }

    #[tokio::test]
    async fn test_revoke_then_check() {
        let blocklist = MemoryBlocklist::new(3600);

        assert!(!blocklist.is_revoked("some-jti").await.unwrap());
        blocklist.revoke("some-jti").await.unwrap();
        assert!(blocklist.is_revoked("some-jti").await.unwrap());
        assert!(!blocklist.is_revoked("other-jti").await.unwrap());
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let blocklist = MemoryBlocklist::new(3600);

        blocklist.revoke("some-jti").await.unwrap();
        blocklist.revoke("some-jti").await.unwrap();
        assert!(blocklist.is_revoked("some-jti").await.unwrap());
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let blocklist = MemoryBlocklist::with_entry_ttl(Duration::from_millis(20));

        blocklist.revoke("some-jti").await.unwrap();
        assert!(blocklist.is_revoked("some-jti").await.unwrap());

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(!blocklist.is_revoked("some-jti").await.unwrap());
    }

    #[tokio::test]
    async fn test_lapsed_entries_are_swept_on_revoke() {
        let blocklist = MemoryBlocklist::with_entry_ttl(Duration::from_millis(20));

        // Entries for tokens that are never checked again.
        blocklist.revoke("stale-a").await.unwrap();
        blocklist.revoke("stale-b").await.unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;
        blocklist.revoke("fresh").await.unwrap();

        let entries = blocklist.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key("fresh"));
    }
}
