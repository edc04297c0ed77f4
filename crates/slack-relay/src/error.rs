//! Error types for the relay pipeline.

use slack_morphism::errors::SlackClientError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RelayError>;

/// Failure of a single message's relay. Always caught at the dispatcher
/// boundary; never fatal to the process.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Slack API {method} failed: {error}")]
    Slack { method: &'static str, error: String },

    /// Transport or decoding failure inside the Slack client, before any
    /// Web API error code was available.
    #[error("Slack client error in {method}: {source}")]
    SlackClient {
        method: &'static str,
        #[source]
        source: SlackClientError,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Completion API returned {status}: {body}")]
    CompletionStatus { status: u16, body: String },

    #[error("Completion stream error: {0}")]
    CompletionStream(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Response missing field: {0}")]
    MissingField(&'static str),
}
