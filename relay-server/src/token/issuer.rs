//! Anti-forgery token issuance.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use rand::rngs::OsRng;
use rand::RngCore;
use tracing::info;

use super::store::{TokenRecord, TokenStore};

/// Number of random bytes in a token (64 hex characters).
pub const TOKEN_BYTES: usize = 32;

/// Default token lifetime.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);

/// A freshly issued token, as handed back to the client.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: SystemTime,
}

/// Generates tokens and records them in the shared store.
#[derive(Clone)]
pub struct TokenIssuer {
    store: Arc<dyn TokenStore>,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(store: Arc<dyn TokenStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Issue a new single-use token for the given requester.
    pub fn issue(&self, requester_address: Option<&str>) -> IssuedToken {
        let token = generate_token();
        let issued_at = SystemTime::now();
        let expires_at = issued_at + self.ttl;

        self.store.insert(
            token.clone(),
            TokenRecord {
                issued_at,
                expires_at,
                requester_address: requester_address.map(str::to_string),
            },
        );

        info!(
            requester = requester_address.unwrap_or("unknown"),
            ttl_seconds = self.ttl.as_secs(),
            outstanding = self.store.len(),
            "csrf_token_issued"
        );

        IssuedToken { token, expires_at }
    }
}

/// Generate a hex-encoded token from the operating system's CSPRNG.
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
