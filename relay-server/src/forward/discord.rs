//! Discord-style webhook sink.
//!
//! Posts `{"content": ...}` and expects `204 No Content` back.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{error, info};

use super::{ForwardError, MessageSink};

#[derive(Serialize)]
struct WebhookMessage<'a> {
    content: &'a str,
}

/// Sends messages to a chat webhook URL.
#[derive(Clone)]
pub struct DiscordWebhook {
    client: Client,
    url: String,
}

impl DiscordWebhook {
    pub fn new(client: Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl MessageSink for DiscordWebhook {
    async fn send(&self, content: &str) -> Result<(), ForwardError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&WebhookMessage { content })
            .send()
            .await
            .map_err(|e| {
                let err = ForwardError::from(e);
                if let ForwardError::Transport(e) = &err {
                    if e.is_timeout() {
                        error!(error = %e, "webhook_forward_timeout");
                    } else {
                        error!(error = %e, "webhook_forward_request_error");
                    }
                }
                err
            })?;

        let status = resp.status();
        if status != StatusCode::NO_CONTENT {
            error!(status_code = status.as_u16(), "webhook_forward_rejected");
            return Err(ForwardError::Rejected {
                status: status.as_u16(),
            });
        }

        info!(content_length = content.len(), "webhook_forward_complete");
        Ok(())
    }
}
