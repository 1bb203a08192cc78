//! `siteverify` client shared by Turnstile and reCAPTCHA.
//!
//! Reference: https://developers.cloudflare.com/turnstile/get-started/server-side-validation/

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::{BotVerifier, Provider};

/// Form body sent to the provider.
#[derive(Serialize)]
struct SiteVerifyRequest<'a> {
    secret: &'a str,
    response: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    remoteip: Option<&'a str>,
}

/// The parts of the provider response we care about.
///
/// `success` is optional so that a body without it deserializes and is
/// treated as a failure rather than a parse error.
#[derive(Debug, Deserialize)]
pub struct SiteVerifyResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default, rename = "error-codes")]
    pub error_codes: Vec<String>,
    #[serde(default)]
    pub hostname: Option<String>,
}

/// Verifies bot-check tokens against a provider's siteverify endpoint.
#[derive(Clone)]
pub struct SiteVerifyClient {
    client: Client,
    provider: Provider,
    secret: String,
    endpoint: String,
}

impl SiteVerifyClient {
    /// Create a client. `endpoint` overrides the provider's default URL.
    pub fn new(client: Client, provider: Provider, secret: String, endpoint: Option<String>) -> Self {
        Self {
            client,
            provider,
            secret,
            endpoint: endpoint.unwrap_or_else(|| provider.default_endpoint().to_string()),
        }
    }
}

#[async_trait]
impl BotVerifier for SiteVerifyClient {
    async fn verify(&self, response_token: &str, remote_address: Option<&str>) -> bool {
        if response_token.trim().is_empty() {
            warn!(provider = %self.provider, "botcheck_empty_response_token");
            return false;
        }

        let form = SiteVerifyRequest {
            secret: &self.secret,
            response: response_token,
            remoteip: remote_address,
        };

        let resp = match self.client.post(&self.endpoint).form(&form).send().await {
            Ok(resp) => resp,
            Err(e) => {
                if e.is_timeout() {
                    error!(provider = %self.provider, error = %e, "botcheck_request_timeout");
                } else {
                    error!(provider = %self.provider, error = %e, "botcheck_request_error");
                }
                return false;
            }
        };

        let status = resp.status();
        if status != StatusCode::OK {
            error!(
                provider = %self.provider,
                status_code = status.as_u16(),
                "botcheck_unexpected_status"
            );
            return false;
        }

        let body: SiteVerifyResponse = match resp.json().await {
            Ok(body) => body,
            Err(e) => {
                error!(provider = %self.provider, error = %e, "botcheck_invalid_response");
                return false;
            }
        };

        let success = body.success.unwrap_or(false);
        if success {
            info!(
                provider = %self.provider,
                hostname = body.hostname.as_deref().unwrap_or(""),
                "botcheck_passed"
            );
        } else {
            warn!(
                provider = %self.provider,
                has_success_field = body.success.is_some(),
                error_codes = ?body.error_codes,
                "botcheck_failed"
            );
        }

        success
    }
}
