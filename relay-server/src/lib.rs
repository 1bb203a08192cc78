//! FormRelay - contact form relay service.
//!
//! Accepts contact-form submissions, checks a single-use anti-forgery token
//! and a bot-check token, and forwards the submission to a chat webhook.
//!
//! ## Architecture
//!
//! ```text
//! GET /csrf-token → TokenIssuer → TokenStore
//! POST /submit → Pipeline → TokenStore / BotVerifier / MessageSink
//! ```

pub mod botcheck;
pub mod config;
pub mod error;
pub mod form;
pub mod forward;
pub mod pipeline;
pub mod token;
pub mod web;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use error::SubmitError;
pub use form::FormSubmission;
pub use pipeline::{BotCheck, Pipeline};
pub use token::{MemoryTokenStore, TokenIssuer, TokenStore};
pub use web::{build_router, AppState};
