//! Bot-check (human verification) providers.
//!
//! Both supported providers, Cloudflare Turnstile and Google reCAPTCHA,
//! speak the same form-encoded `siteverify` protocol, so a single
//! [`SiteVerifyClient`] covers them.

pub mod siteverify;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

pub use siteverify::{SiteVerifyClient, SiteVerifyResponse};

/// Verifies a client-supplied bot-check response token.
///
/// Implementations fail closed: anything other than a positive answer from
/// the provider is `false`.
#[async_trait]
pub trait BotVerifier: Send + Sync {
    async fn verify(&self, response_token: &str, remote_address: Option<&str>) -> bool;
}

/// Supported verification providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Turnstile,
    Recaptcha,
}

impl Provider {
    /// The provider's public siteverify endpoint.
    pub fn default_endpoint(self) -> &'static str {
        match self {
            Provider::Turnstile => "https://challenges.cloudflare.com/turnstile/v0/siteverify",
            Provider::Recaptcha => "https://www.google.com/recaptcha/api/siteverify",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Turnstile => "turnstile",
            Provider::Recaptcha => "recaptcha",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownProvider(pub String);

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "turnstile" | "cloudflare" => Ok(Provider::Turnstile),
            "recaptcha" | "google" => Ok(Provider::Recaptcha),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}
