//! Anti-forgery token storage.
//!
//! The store is a single-process, best-effort cache. Consumption is atomic:
//! a token is removed in the same critical section that validates it, so two
//! concurrent submissions can never both use one token.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Metadata recorded for an issued token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub issued_at: SystemTime,
    pub expires_at: SystemTime,
    /// Address of the issuing request. Audit only, never enforced.
    pub requester_address: Option<String>,
}

impl TokenRecord {
    pub fn is_expired(&self, now: SystemTime) -> bool {
        now >= self.expires_at
    }
}

/// Result of consuming a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// The token was valid and has been removed.
    Consumed(TokenRecord),
    NotFound,
    /// The token existed but had expired. It has been removed.
    Expired,
}

/// Storage for outstanding anti-forgery tokens.
pub trait TokenStore: Send + Sync {
    fn insert(&self, token: String, record: TokenRecord);

    fn lookup(&self, token: &str) -> Option<TokenRecord>;

    /// Remove `token` and report whether it was usable at `now`.
    fn consume(&self, token: &str, now: SystemTime) -> ConsumeOutcome;

    /// Drop every token expired at `now`, returning how many were removed.
    fn sweep_expired(&self, now: SystemTime) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Mutex-guarded in-memory token store with a size cap.
pub struct MemoryTokenStore {
    tokens: Mutex<HashMap<String, TokenRecord>>,
    max_tokens: usize,
}

impl MemoryTokenStore {
    pub fn new(max_tokens: usize) -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
            max_tokens: max_tokens.max(1),
        }
    }

    // A panic while holding the lock cannot leave the map half-updated, so a
    // poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, TokenRecord>> {
        self.tokens.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn remove_expired(tokens: &mut HashMap<String, TokenRecord>, now: SystemTime) -> usize {
    let before = tokens.len();
    tokens.retain(|_, record| !record.is_expired(now));
    before - tokens.len()
}

impl TokenStore for MemoryTokenStore {
    fn insert(&self, token: String, record: TokenRecord) {
        let mut tokens = self.lock();

        if !tokens.contains_key(&token) && tokens.len() >= self.max_tokens {
            let swept = remove_expired(&mut tokens, record.issued_at);

            if tokens.len() >= self.max_tokens {
                let oldest = tokens
                    .iter()
                    .min_by_key(|(_, r)| r.issued_at)
                    .map(|(t, _)| t.clone());
                if let Some(oldest) = oldest {
                    tokens.remove(&oldest);
                }
                warn!(
                    max_tokens = self.max_tokens,
                    swept = swept,
                    "csrf_store_full_evicted_oldest"
                );
            }
        }

        tokens.insert(token, record);
    }

    fn lookup(&self, token: &str) -> Option<TokenRecord> {
        self.lock().get(token).cloned()
    }

    fn consume(&self, token: &str, now: SystemTime) -> ConsumeOutcome {
        match self.lock().remove(token) {
            None => ConsumeOutcome::NotFound,
            Some(record) if record.is_expired(now) => ConsumeOutcome::Expired,
            Some(record) => ConsumeOutcome::Consumed(record),
        }
    }

    fn sweep_expired(&self, now: SystemTime) -> usize {
        remove_expired(&mut self.lock(), now)
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

/// Periodically remove expired tokens in the background.
pub fn spawn_sweeper(store: Arc<dyn TokenStore>, interval: Duration) -> JoinHandle<()> {
    info!(interval_seconds = interval.as_secs(), "csrf_sweeper_started");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let removed = store.sweep_expired(SystemTime::now());
            if removed > 0 {
                debug!(removed = removed, remaining = store.len(), "csrf_sweep_complete");
            }
        }
    })
}
