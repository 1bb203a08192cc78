//! Anti-forgery (CSRF) tokens.
//!
//! Tokens are issued by [`TokenIssuer`] on `GET /csrf-token`, held in a
//! [`TokenStore`], and consumed exactly once by the submission pipeline.
//! Expiry is checked lazily on consumption; [`spawn_sweeper`] optionally
//! clears expired entries in the background.

pub mod issuer;
pub mod store;

pub use issuer::{IssuedToken, TokenIssuer, DEFAULT_TOKEN_TTL, TOKEN_BYTES};
pub use store::{spawn_sweeper, ConsumeOutcome, MemoryTokenStore, TokenRecord, TokenStore};
