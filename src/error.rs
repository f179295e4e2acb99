use crate::models::chat::TurnId;
use thiserror::Error;

/// Rejections raised before any network call; no turn is started.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a message")]
    EmptyPrompt,

    #[error("Message is too long ({length}/{max} characters)")]
    PromptTooLong {
        length: usize,
        max: usize,
    },

    #[error("Please select a business")]
    MissingBusiness,

    #[error("Please select a template")]
    MissingTemplate,

    #[error("Please enter manual pricing")]
    MissingManualPrice,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Session token missing, invalid or expired.
    #[error("Session expired, please sign in again (HTTP {status})")]
    Unauthorized {
        status: u16,
    },

    #[error("Upstream returned HTTP {status}")]
    Status {
        status: u16,
    },

    #[error("Response has no body")]
    MissingBody,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) if status.as_u16() == 401 || status.as_u16() == 403 =>
                TransportError::Unauthorized { status: status.as_u16() },
            Some(status) => TransportError::Status { status: status.as_u16() },
            None if err.is_decode() => TransportError::InvalidResponse(err.to_string()),
            None => TransportError::Network(err.to_string()),
        }
    }
}

impl From<url::ParseError> for TransportError {
    fn from(err: url::ParseError) -> Self {
        TransportError::InvalidUrl(err.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Turn {turn_id} is still streaming")]
    Busy {
        turn_id: TurnId,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RewriteError {
    #[error("Turn {0} does not exist")]
    UnknownTurn(TurnId),

    #[error("Turn {0} has not completed yet")]
    NotComplete(TurnId),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
