//! Submission error taxonomy.
//!
//! Every pipeline failure ends up as one of these variants. The boundary
//! turns them into a JSON body with a short fixed message; provider output,
//! transport errors and secrets are logged but never returned.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::forward::ForwardError;

#[derive(Debug, Error)]
pub enum SubmitError {
    /// Malformed or incomplete client input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Missing, unknown, expired or reused anti-forgery token.
    #[error("anti-forgery token rejected")]
    Forgery,

    /// The bot-check provider did not confirm a human.
    #[error("bot check failed")]
    BotCheck,

    /// The chat webhook was unreachable or rejected the message.
    #[error(transparent)]
    Forward(#[from] ForwardError),
}

impl SubmitError {
    pub fn status(&self) -> StatusCode {
        match self {
            SubmitError::Validation(_) | SubmitError::Forgery | SubmitError::BotCheck => {
                StatusCode::BAD_REQUEST
            }
            SubmitError::Forward(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the client.
    pub fn public_message(&self) -> String {
        match self {
            SubmitError::Validation(detail) => detail.clone(),
            SubmitError::Forgery => "Invalid or expired CSRF token".to_string(),
            SubmitError::BotCheck => "Bot verification failed".to_string(),
            SubmitError::Forward(_) => "Failed to deliver message".to_string(),
        }
    }

    /// Short label used in log events.
    pub fn kind(&self) -> &'static str {
        match self {
            SubmitError::Validation(_) => "validation",
            SubmitError::Forgery => "forgery",
            SubmitError::BotCheck => "bot_check",
            SubmitError::Forward(_) => "forward",
        }
    }
}

/// JSON body returned for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
}

impl IntoResponse for SubmitError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            message: self.public_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}
