//! Submission pipeline.
//!
//! ## Processing Flow
//!
//! ```text
//! body → parse → consume CSRF token → bot check → format → forward
//! ```
//!
//! Each step either advances or ends the request with a [`SubmitError`].
//! The anti-forgery token is consumed before the bot check, so a request
//! that fails later has still used up its token (unless the burn policy is
//! turned off, in which case a failed bot check gives the token back).

use std::sync::Arc;
use std::time::SystemTime;

use tracing::{info, warn};

use crate::botcheck::BotVerifier;
use crate::error::SubmitError;
use crate::form::FormSubmission;
use crate::forward::{format_message, MessageSink};
use crate::token::{ConsumeOutcome, TokenStore};

/// Whether submissions must pass a bot check.
#[derive(Clone)]
pub enum BotCheck {
    Disabled,
    Enabled(Arc<dyn BotVerifier>),
}

impl BotCheck {
    pub fn is_enabled(&self) -> bool {
        matches!(self, BotCheck::Enabled(_))
    }
}

#[derive(Clone)]
pub struct Pipeline {
    store: Arc<dyn TokenStore>,
    bot_check: BotCheck,
    sink: Arc<dyn MessageSink>,
    burn_token_on_bot_failure: bool,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn TokenStore>,
        bot_check: BotCheck,
        sink: Arc<dyn MessageSink>,
        burn_token_on_bot_failure: bool,
    ) -> Self {
        Self {
            store,
            bot_check,
            sink,
            burn_token_on_bot_failure,
        }
    }

    /// Run one submission through every step.
    pub async fn submit(
        &self,
        body: &[u8],
        csrf_token: Option<&str>,
        remote_address: Option<&str>,
    ) -> Result<(), SubmitError> {
        let form = FormSubmission::parse(body, self.bot_check.is_enabled())?;

        let token = csrf_token.map(str::trim).filter(|t| !t.is_empty()).ok_or_else(|| {
            warn!(remote = remote_address.unwrap_or("unknown"), "csrf_token_missing");
            SubmitError::Forgery
        })?;

        let record = match self.store.consume(token, SystemTime::now()) {
            ConsumeOutcome::Consumed(record) => record,
            ConsumeOutcome::NotFound => {
                warn!(remote = remote_address.unwrap_or("unknown"), "csrf_token_unknown");
                return Err(SubmitError::Forgery);
            }
            ConsumeOutcome::Expired => {
                warn!(remote = remote_address.unwrap_or("unknown"), "csrf_token_expired");
                return Err(SubmitError::Forgery);
            }
        };

        info!(
            issued_to = record.requester_address.as_deref().unwrap_or("unknown"),
            remote = remote_address.unwrap_or("unknown"),
            "csrf_token_consumed"
        );

        if let BotCheck::Enabled(verifier) = &self.bot_check {
            // Parsing guarantees the response is present when enabled.
            let response = form.bot_check_response.as_deref().unwrap_or_default();

            if !verifier.verify(response, remote_address).await {
                if !self.burn_token_on_bot_failure {
                    self.store.insert(token.to_string(), record);
                    info!("csrf_token_restored_after_botcheck_failure");
                }
                return Err(SubmitError::BotCheck);
            }
        }

        let content = format_message(&form);
        self.sink.send(&content).await?;

        info!(
            service = %form.service,
            company = %form.company_name,
            "submission_forwarded"
        );

        Ok(())
    }
}
