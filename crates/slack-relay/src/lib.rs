//! Slack to LLM relay: answers mentions and direct messages with a streamed
//! chat completion, edited into a single threaded reply.

pub mod clock;
pub mod config;
pub mod context;
pub mod directory;
pub mod dispatcher;
pub mod env;
pub mod error;
pub mod history;
pub mod listener;
pub mod openai;
pub mod slack_api;
pub mod streaming;

#[cfg(test)]
mod mocks;

pub use clock::{Clock, SystemClock};
pub use config::{ConfigError, RelayConfig};
pub use context::SystemContext;
pub use directory::UserDirectory;
pub use dispatcher::{Disposition, Dispatcher};
pub use error::{RelayError, Result};
pub use openai::{CompletionApi, OpenAiClient};
pub use slack_api::{ChatApi, SlackWebClient, UserLookup};
pub use streaming::{StreamOutcome, StreamingResponder};
