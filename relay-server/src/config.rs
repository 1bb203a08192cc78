//! Configuration module for environment variable parsing.
//!
//! All configuration is read once at startup into [`Config`] and passed
//! explicitly to the components that need it. Optional numeric and boolean
//! settings fall back to their defaults with a warning; missing or invalid
//! required settings are a [`ConfigError`] and the server refuses to start.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::botcheck::Provider;
use crate::token::DEFAULT_TOKEN_TTL;

/// Origins allowed to call the API when `CORS_ALLOWED_ORIGINS` is unset.
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] =
    &["https://vicentereyes.org", "https://www.vicentereyes.org"];

/// Startup configuration error. The submit endpoint is never served while
/// any of these is present.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Chat webhook that receives formatted submissions
    pub webhook_url: Url,

    /// Bot-check provider, `None` when verification is disabled
    pub botcheck_provider: Option<Provider>,

    /// Provider secret key, always present when a provider is configured
    pub botcheck_secret: Option<String>,

    /// Override for the provider's siteverify endpoint
    pub botcheck_verify_url: Option<Url>,

    /// Origins allowed by the CORS layer, each a bare `scheme://host[:port]`
    pub allowed_origins: Vec<HeaderValue>,

    /// Timeout applied to every outbound HTTP call
    pub request_timeout: Duration,

    /// Lifetime of an issued anti-forgery token
    pub csrf_token_ttl: Duration,

    /// Maximum number of outstanding anti-forgery tokens
    pub csrf_max_tokens: usize,

    /// Interval of the expired-token sweep, `None` when disabled
    pub csrf_sweep_interval: Option<Duration>,

    /// Whether a failed bot-check still consumes the anti-forgery token
    pub botcheck_failure_burns_token: bool,

    /// Take the client address from `X-Forwarded-For`
    pub trust_proxy_headers: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_source<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let webhook_raw = get("WEBHOOK_URL")
            .or_else(|| get("FASTAPI_DISCORD_WEBHOOK_URL"))
            .ok_or(ConfigError::Missing("WEBHOOK_URL"))?;
        let webhook_url = parse_http_url("WEBHOOK_URL", webhook_raw.trim())?;

        let botcheck_provider = match get("BOTCHECK_PROVIDER") {
            None => Some(Provider::Turnstile),
            Some(raw) => parse_provider(&raw)?,
        };

        let botcheck_secret = get("BOTCHECK_SECRET").map(|s| s.trim().to_string());
        if botcheck_provider.is_some() && botcheck_secret.is_none() {
            return Err(ConfigError::Missing("BOTCHECK_SECRET"));
        }

        let botcheck_verify_url = get("BOTCHECK_VERIFY_URL")
            .map(|raw| parse_http_url("BOTCHECK_VERIFY_URL", raw.trim()))
            .transpose()?;

        let allowed_origins = get("CORS_ALLOWED_ORIGINS")
            .map(|raw| parse_csv(&raw))
            .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect())
            .iter()
            .map(|origin| parse_origin(origin))
            .collect::<Result<Vec<_>, _>>()?;

        let sweep_secs: u64 = parse_or(&get, "CSRF_SWEEP_INTERVAL_SECS", 300);

        Ok(Config {
            port: parse_or(&get, "PORT", 8080),
            webhook_url,
            botcheck_secret: botcheck_provider.and(botcheck_secret),
            botcheck_provider,
            botcheck_verify_url,
            allowed_origins,
            request_timeout: Duration::from_millis(parse_or(&get, "REQUEST_TIMEOUT_MS", 5000)),
            csrf_token_ttl: Duration::from_secs(parse_or(
                &get,
                "CSRF_TOKEN_TTL_SECS",
                DEFAULT_TOKEN_TTL.as_secs(),
            )),
            csrf_max_tokens: parse_or::<usize, _>(&get, "CSRF_MAX_TOKENS", 10_000).max(1),
            csrf_sweep_interval: (sweep_secs > 0).then(|| Duration::from_secs(sweep_secs)),
            botcheck_failure_burns_token: parse_bool(&get, "BOTCHECK_FAILURE_BURNS_TOKEN", true),
            trust_proxy_headers: parse_bool(&get, "TRUST_PROXY_HEADERS", false),
        })
    }
}

// The webhook URL embeds its own credential, so neither it nor the secret
// is ever printed.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("webhook_host", &self.webhook_url.host_str())
            .field("botcheck_provider", &self.botcheck_provider)
            .field("botcheck_secret_set", &self.botcheck_secret.is_some())
            .field("botcheck_verify_url", &self.botcheck_verify_url)
            .field("allowed_origins", &self.allowed_origins)
            .field("request_timeout", &self.request_timeout)
            .field("csrf_token_ttl", &self.csrf_token_ttl)
            .field("csrf_max_tokens", &self.csrf_max_tokens)
            .field("csrf_sweep_interval", &self.csrf_sweep_interval)
            .field("botcheck_failure_burns_token", &self.botcheck_failure_burns_token)
            .field("trust_proxy_headers", &self.trust_proxy_headers)
            .finish()
    }
}

fn parse_http_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::Invalid {
            name,
            reason: format!("unsupported scheme {other:?}"),
        }),
    }
}

/// Parse one CORS origin. Wildcards are refused: credentials are allowed,
/// so every origin must be listed explicitly.
fn parse_origin(raw: &str) -> Result<HeaderValue, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        name: "CORS_ALLOWED_ORIGINS",
        reason,
    };

    if raw.contains('*') {
        return Err(invalid(format!("{raw:?}: wildcard origins are not allowed")));
    }

    let url = parse_http_url("CORS_ALLOWED_ORIGINS", raw)?;
    let bare = url.host_str().is_some()
        && url.path() == "/"
        && !raw.ends_with('/')
        && url.query().is_none()
        && url.fragment().is_none()
        && url.username().is_empty()
        && url.password().is_none();
    if !bare {
        return Err(invalid(format!("{raw:?} is not a bare scheme://host[:port] origin")));
    }

    HeaderValue::from_str(raw).map_err(|_| invalid(format!("{raw:?} is not a valid header value")))
}

fn parse_provider(raw: &str) -> Result<Option<Provider>, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "none" | "disabled" | "off" => Ok(None),
        other => other.parse::<Provider>().map(Some).map_err(|_| ConfigError::Invalid {
            name: "BOTCHECK_PROVIDER",
            reason: format!("unknown provider {other:?}"),
        }),
    }
}

/// Parse an optional value, falling back to `default` when absent or invalid.
fn parse_or<T, G>(get: &G, name: &str, default: T) -> T
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }),
    }
}

fn parse_bool<G>(get: &G, name: &str, default: bool) -> bool
where
    G: Fn(&str) -> Option<String>,
{
    match get(name).map(|v| v.trim().to_ascii_lowercase()) {
        None => default,
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        Some(v) => {
            warn!(env_var = name, value = %v, "Invalid boolean, using default");
            default
        }
    }
}

/// Parse a comma-separated list of strings.
fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_source(|name| map.get(name).cloned())
    }

    const WEBHOOK: (&str, &str) = ("WEBHOOK_URL", "https://discord.com/api/webhooks/1/abc");

    #[test]
    fn test_defaults() {
        let config = load(&[WEBHOOK, ("BOTCHECK_SECRET", "s3cret")]).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.botcheck_provider, Some(Provider::Turnstile));
        assert_eq!(config.botcheck_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.request_timeout, Duration::from_millis(5000));
        assert_eq!(config.csrf_token_ttl, Duration::from_secs(3600));
        assert_eq!(config.csrf_max_tokens, 10_000);
        assert_eq!(config.csrf_sweep_interval, Some(Duration::from_secs(300)));
        assert!(config.botcheck_failure_burns_token);
        assert!(!config.trust_proxy_headers);
        assert_eq!(config.allowed_origins.len(), DEFAULT_ALLOWED_ORIGINS.len());
    }

    #[test]
    fn test_missing_webhook_url() {
        let err = load(&[("BOTCHECK_SECRET", "s3cret")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("WEBHOOK_URL"));

        let err = load(&[("WEBHOOK_URL", "   "), ("BOTCHECK_SECRET", "s3cret")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("WEBHOOK_URL"));
    }

    #[test]
    fn test_legacy_webhook_variable() {
        let config = load(&[
            ("FASTAPI_DISCORD_WEBHOOK_URL", "https://discord.com/api/webhooks/2/def"),
            ("BOTCHECK_PROVIDER", "none"),
        ])
        .unwrap();
        assert_eq!(config.webhook_url.as_str(), "https://discord.com/api/webhooks/2/def");
    }

    #[test]
    fn test_invalid_webhook_url() {
        let err = load(&[("WEBHOOK_URL", "not a url"), ("BOTCHECK_PROVIDER", "none")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "WEBHOOK_URL", .. }));

        let err = load(&[("WEBHOOK_URL", "ftp://example.com/x"), ("BOTCHECK_PROVIDER", "none")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "WEBHOOK_URL", .. }));
    }

    #[test]
    fn test_missing_secret_when_enabled() {
        let err = load(&[WEBHOOK]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("BOTCHECK_SECRET"));

        let err = load(&[WEBHOOK, ("BOTCHECK_PROVIDER", "recaptcha"), ("BOTCHECK_SECRET", " ")])
            .unwrap_err();
        assert_eq!(err, ConfigError::Missing("BOTCHECK_SECRET"));
    }

    #[test]
    fn test_botcheck_disabled() {
        let config = load(&[WEBHOOK, ("BOTCHECK_PROVIDER", "none"), ("BOTCHECK_SECRET", "x")])
            .unwrap();
        assert_eq!(config.botcheck_provider, None);
        assert_eq!(config.botcheck_secret, None);
    }

    #[test]
    fn test_unknown_provider() {
        let err = load(&[WEBHOOK, ("BOTCHECK_PROVIDER", "captchafy")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "BOTCHECK_PROVIDER", .. }));
    }

    #[test]
    fn test_lenient_optional_values() {
        let config = load(&[
            WEBHOOK,
            ("BOTCHECK_PROVIDER", "none"),
            ("PORT", "not-a-port"),
            ("REQUEST_TIMEOUT_MS", "2500"),
            ("CSRF_SWEEP_INTERVAL_SECS", "0"),
            ("BOTCHECK_FAILURE_BURNS_TOKEN", "false"),
            ("TRUST_PROXY_HEADERS", "maybe"),
            ("CORS_ALLOWED_ORIGINS", "https://a.example, ,https://b.example"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.request_timeout, Duration::from_millis(2500));
        assert_eq!(config.csrf_sweep_interval, None);
        assert!(!config.botcheck_failure_burns_token);
        assert!(!config.trust_proxy_headers);
        assert_eq!(config.allowed_origins, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = load(&[WEBHOOK, ("BOTCHECK_SECRET", "s3cret")]).unwrap();
        let printed = format!("{config:?}");

        assert!(!printed.contains("s3cret"));
        assert!(!printed.contains("/api/webhooks/1/abc"));
        assert!(printed.contains("discord.com"));
    }

    #[test]
    fn test_invalid_cors_origins() {
        for origins in [
            "*",
            "https://a.example,*",
            "https://*.example",
            "a.example",
            "ftp://a.example",
            "https://a.example/",
            "https://a.example/contact",
            "https://a.example?x=1",
        ] {
            let err = load(&[WEBHOOK, ("BOTCHECK_PROVIDER", "none"), ("CORS_ALLOWED_ORIGINS", origins)])
                .unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { name: "CORS_ALLOWED_ORIGINS", .. }),
                "{origins} should be rejected, got {err:?}"
            );
        }
    }

    #[test]
    fn test_cors_origin_with_port() {
        let config = load(&[
            WEBHOOK,
            ("BOTCHECK_PROVIDER", "none"),
            ("CORS_ALLOWED_ORIGINS", "http://localhost:5173"),
        ])
        .unwrap();
        assert_eq!(config.allowed_origins, vec!["http://localhost:5173"]);
    }

    #[test]
    fn test_token_ttl_default_matches_issuer() {
        let config = load(&[WEBHOOK, ("BOTCHECK_PROVIDER", "none")]).unwrap();
        assert_eq!(config.csrf_token_ttl, DEFAULT_TOKEN_TTL);
    }

    #[test]
    fn test_parse_csv() {
        assert_eq!(parse_csv("foo, bar, baz"), vec!["foo", "bar", "baz"]);
        assert!(parse_csv(" , ").is_empty());
    }
}
