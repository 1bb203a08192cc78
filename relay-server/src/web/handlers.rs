//! HTTP endpoint handlers.
//!
//! Handlers stay thin: they pull the transport-level pieces (CSRF header,
//! client address, raw body) out of the request and hand them to the token
//! issuer or the submission pipeline.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::botcheck::SiteVerifyClient;
use crate::config::{Config, ConfigError};
use crate::error::SubmitError;
use crate::forward::{DiscordWebhook, MessageSink};
use crate::pipeline::{BotCheck, Pipeline};
use crate::token::{MemoryTokenStore, TokenIssuer, TokenStore};

/// Header carrying the anti-forgery token in both directions.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub issuer: TokenIssuer,
    pub pipeline: Pipeline,
}

impl AppState {
    /// Build every component from the startup configuration.
    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConfigError::Invalid {
                name: "REQUEST_TIMEOUT_MS",
                reason: e.to_string(),
            })?;

        let bot_check = match (config.botcheck_provider, &config.botcheck_secret) {
            (None, _) => BotCheck::Disabled,
            (Some(provider), Some(secret)) => BotCheck::Enabled(Arc::new(SiteVerifyClient::new(
                client.clone(),
                provider,
                secret.clone(),
                config.botcheck_verify_url.as_ref().map(|u| u.to_string()),
            ))),
            (Some(_), None) => return Err(ConfigError::Missing("BOTCHECK_SECRET")),
        };

        let store: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::new(config.csrf_max_tokens));
        let sink = Arc::new(DiscordWebhook::new(client, config.webhook_url.to_string()));

        Ok(Self::new(config, store, bot_check, sink))
    }

    /// Assemble state from already-built components.
    pub fn new(
        config: Config,
        store: Arc<dyn TokenStore>,
        bot_check: BotCheck,
        sink: Arc<dyn MessageSink>,
    ) -> Self {
        let issuer = TokenIssuer::new(store.clone(), config.csrf_token_ttl);
        let pipeline = Pipeline::new(store, bot_check, sink, config.botcheck_failure_burns_token);

        Self {
            config: Arc::new(config),
            issuer,
            pipeline,
        }
    }

    /// Resolve the caller's address, honouring `X-Forwarded-For` only when
    /// the deployment says the proxy in front of us can be trusted.
    fn client_address(
        &self,
        headers: &HeaderMap,
        connect_info: Option<&ConnectInfo<SocketAddr>>,
    ) -> Option<String> {
        if self.config.trust_proxy_headers {
            let forwarded = headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty());
            if let Some(addr) = forwarded {
                return Some(addr.to_string());
            }
        }

        connect_info.map(|ConnectInfo(addr)| addr.ip().to_string())
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// CSRF Token
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsrfTokenResponse {
    pub csrf_token: String,
    /// Unix timestamp in seconds.
    pub expires_at: u64,
}

/// Issue a fresh anti-forgery token.
///
/// The token is returned in the body and in the `X-CSRF-Token` header; the
/// client echoes it back in the same header on submit.
pub async fn csrf_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
) -> Response {
    let requester = state.client_address(&headers, connect_info.as_ref());
    let issued = state.issuer.issue(requester.as_deref());

    let expires_at = issued
        .expires_at
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let header_value = match HeaderValue::from_str(&issued.token) {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, "csrf_token_header_encode_failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    (
        [
            (HeaderName::from_static(CSRF_HEADER), header_value),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
        ],
        Json(CsrfTokenResponse {
            csrf_token: issued.token,
            expires_at,
        }),
    )
        .into_response()
}

// =============================================================================
// Submit
// =============================================================================

/// Success response for a forwarded submission.
#[derive(Serialize)]
pub struct SubmitResponse {
    pub message: &'static str,
    pub success: bool,
}

/// Contact form submission endpoint.
///
/// The body is taken raw so that malformed JSON is reported through the
/// pipeline's validation error rather than the extractor's rejection.
pub async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    body: Bytes,
) -> Result<Json<SubmitResponse>, SubmitError> {
    let remote = state.client_address(&headers, connect_info.as_ref());
    let csrf_token = headers.get(CSRF_HEADER).and_then(|v| v.to_str().ok());

    info!(
        remote = remote.as_deref().unwrap_or("unknown"),
        body_length = body.len(),
        has_csrf_token = csrf_token.is_some(),
        "submission_received"
    );

    match state
        .pipeline
        .submit(&body, csrf_token, remote.as_deref())
        .await
    {
        Ok(()) => {
            info!(remote = remote.as_deref().unwrap_or("unknown"), "submission_complete");
            Ok(Json(SubmitResponse {
                message: "Form data sent successfully",
                success: true,
            }))
        }
        Err(e) => {
            if e.status().is_server_error() {
                error!(kind = e.kind(), error = %e, "submission_failed");
            } else {
                warn!(kind = e.kind(), error = %e, "submission_rejected");
            }
            Err(e)
        }
    }
}
