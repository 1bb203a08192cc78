//! Forwarding submissions to the chat webhook.
//!
//! ```text
//! FormSubmission → format_message() → MessageSink::send() → webhook
//! ```

pub mod discord;

use async_trait::async_trait;
use thiserror::Error;

use crate::form::FormSubmission;

pub use discord::DiscordWebhook;

/// The webhook did not accept the message.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("webhook responded with status {status}")]
    Rejected { status: u16 },

    /// The request never produced a response. The URL is stripped from the
    /// error because the webhook URL carries its own credential.
    #[error("webhook request failed: {0}")]
    Transport(reqwest::Error),
}

impl From<reqwest::Error> for ForwardError {
    fn from(e: reqwest::Error) -> Self {
        ForwardError::Transport(e.without_url())
    }
}

/// Destination for formatted submissions.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, content: &str) -> Result<(), ForwardError>;
}

/// Render a submission as one chat message.
///
/// Field order is fixed. Values are interpolated exactly as submitted, with
/// no escaping of markup.
pub fn format_message(form: &FormSubmission) -> String {
    format!(
        "New form submission: \n\
         **Name:** {}\n\
         **Email:** {}\n\
         **Message:** {}\n\
         **Service:** {}\n\
         **Company Name:** {}\n\
         **Company URL:** {}",
        form.name,
        form.email,
        form.message,
        form.service,
        form.company_name,
        form.company_url.as_deref().unwrap_or(""),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> FormSubmission {
        FormSubmission {
            name: "Grace".to_string(),
            email: "grace@example.com".to_string(),
            message: "Need a compiler".to_string(),
            service: "Consulting".to_string(),
            company_name: "Navy".to_string(),
            company_url: Some("https://navy.example".to_string()),
            bot_check_response: None,
        }
    }

    #[test]
    fn test_format_message_field_order() {
        let text = format_message(&submission());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines,
            vec![
                "New form submission: ",
                "**Name:** Grace",
                "**Email:** grace@example.com",
                "**Message:** Need a compiler",
                "**Service:** Consulting",
                "**Company Name:** Navy",
                "**Company URL:** https://navy.example",
            ]
        );
    }

    #[test]
    fn test_format_message_missing_company_url() {
        let mut form = submission();
        form.company_url = None;

        assert!(format_message(&form).ends_with("**Company URL:** "));
    }

    #[test]
    fn test_format_message_does_not_escape() {
        let mut form = submission();
        form.message = "<b>*hi*</b> @everyone".to_string();

        assert!(format_message(&form).contains("**Message:** <b>*hi*</b> @everyone\n"));
    }
}
