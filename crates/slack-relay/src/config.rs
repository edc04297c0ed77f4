use std::path::PathBuf;
use std::time::Duration;

use crate::env::ReadEnv;

pub const DEFAULT_MODEL: &str = "gpt-4-1106-preview";
pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";
pub const DEFAULT_SYSTEM_CONTEXT_FILE: &str = "context.csv";
/// Minimum time between two edits of the streamed reply.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable(s): {}", .0.join(", "))]
    Missing(Vec<&'static str>),
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Bot token (xoxb-...) used for every Web API call.
    pub bot_token: String,
    /// App signing secret. Socket Mode payloads are not signed, but the app
    /// is not considered configured without it.
    pub signing_secret: String,
    /// App-level token (xapp-...) used to open the Socket Mode connection.
    pub app_token: String,
    pub openai_api_key: String,
    /// Env: `OPENAI_MODEL`.
    pub model: String,
    pub openai_api_base: String,
    pub slack_api_base: String,
    /// CSV file whose `content` rows become the system prefix.
    pub system_context_file: PathBuf,
    /// Env: `STREAM_FLUSH_INTERVAL_MS`. Default: 1000 ms.
    pub flush_interval: Duration,
    /// Skips the `auth.test` identity lookup when set.
    pub bot_user_id: Option<String>,
}

impl RelayConfig {
    pub fn from_env<E: ReadEnv>(env: &E) -> Result<Self, ConfigError> {
        let var = |key: &str| env.var(key).ok().filter(|v| !v.is_empty());

        let mut missing = Vec::new();
        let mut required = |key: &'static str| {
            var(key).unwrap_or_else(|| {
                missing.push(key);
                String::new()
            })
        };
        let bot_token = required("SLACK_BOT_TOKEN");
        let signing_secret = required("SLACK_SIGNING_SECRET");
        let app_token = required("SLACK_APP_TOKEN");
        let openai_api_key = required("OPENAI_API_KEY");
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let model = var("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let openai_api_base = var("OPENAI_API_BASE")
            .unwrap_or_else(|| DEFAULT_OPENAI_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let slack_api_base = var("SLACK_API_BASE")
            .unwrap_or_else(|| DEFAULT_SLACK_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let system_context_file: PathBuf = var("SYSTEM_CONTEXT_FILE")
            .unwrap_or_else(|| DEFAULT_SYSTEM_CONTEXT_FILE.to_string())
            .into();

        let flush_interval = var("STREAM_FLUSH_INTERVAL_MS")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_FLUSH_INTERVAL);

        let bot_user_id = var("SLACK_BOT_USER_ID");

        Ok(Self {
            bot_token,
            signing_secret,
            app_token,
            openai_api_key,
            model,
            openai_api_base,
            slack_api_base,
            system_context_file,
            flush_interval,
            bot_user_id,
        })
    }
}
