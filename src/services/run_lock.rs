use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{error::AppResult, models::UserId};

/// Proof of holding a user's run lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LockToken(pub Uuid);

impl LockToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LockToken {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for LockToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-user exclusion for comparison runs
///
/// At most one run per user may hold the lock. Release only succeeds for the
/// token that acquired it, so a holder whose lock expired and was re-acquired
/// by another run cannot release the newer one.
///
/// Backends whose locks expire report a renewal period; the holder must call
/// `extend` at least that often for as long as its run is in flight.
#[async_trait::async_trait]
pub trait RunLock: Send + Sync {
    /// Returns `None` when another run already holds the lock
    async fn try_acquire(&self, user: &UserId) -> AppResult<Option<LockToken>>;

    /// Pushes the expiry back; returns whether `token` still holds the lock
    async fn extend(&self, user: &UserId, token: LockToken) -> AppResult<bool>;

    /// Returns whether the lock was still held by `token`
    async fn release(&self, user: &UserId, token: LockToken) -> AppResult<bool>;

    /// How often a holder must call `extend`, `None` when locks never expire
    fn renew_every(&self) -> Option<Duration> {
        None
    }
}

/// Run lock for a single process
#[derive(Clone, Default)]
pub struct LocalRunLock {
    held: Arc<Mutex<HashMap<UserId, LockToken>>>,
}

impl LocalRunLock {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl RunLock for LocalRunLock {
    async fn try_acquire(&self, user: &UserId) -> AppResult<Option<LockToken>> {
        let mut held = self.held.lock().await;
        if held.contains_key(user) {
            return Ok(None);
        }
        let token = LockToken::new();
        held.insert(user.clone(), token);
        Ok(Some(token))
    }

    async fn extend(&self, user: &UserId, token: LockToken) -> AppResult<bool> {
        Ok(self.held.lock().await.get(user) == Some(&token))
    }

    async fn release(&self, user: &UserId, token: LockToken) -> AppResult<bool> {
        let mut held = self.held.lock().await;
        if held.get(user) == Some(&token) {
            held.remove(user);
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
