use std::sync::Arc;

use slack_morphism::prelude::*;
use slack_relay::env::SystemEnv;
use slack_relay::listener::{RelayState, error_handler, handle_push_event};
use slack_relay::{
    Dispatcher, OpenAiClient, RelayConfig, SlackWebClient, SystemClock, SystemContext,
    UserDirectory,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Before the subscriber, so RUST_LOG may come from .env.
    let dotenv = dotenvy::dotenv();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if let Err(e) = dotenv
        && !e.not_found()
    {
        tracing::warn!(error = %e, "Failed to load .env file");
    }

    let config = RelayConfig::from_env(&SystemEnv)?;

    let slack_client = Arc::new(SlackClient::new(
        SlackClientHyperConnector::new()?.with_slack_api_url(&config.slack_api_base),
    ));
    let slack = SlackWebClient::new(Arc::clone(&slack_client), &config.bot_token);

    let bot_user_id = match config.bot_user_id.clone() {
        Some(id) => id,
        None => {
            tracing::info!("Resolving bot identity via auth.test...");
            slack.auth_test().await?
        }
    };
    tracing::info!(bot_user_id = %bot_user_id, "Authenticated with Slack");

    let directory = Arc::new(UserDirectory::new(slack.clone()));
    match directory.warm().await {
        Ok(count) => tracing::info!(users = count, "User directory populated"),
        Err(e) => tracing::warn!(error = %e, "Failed to populate user directory, continuing lazily"),
    }

    let system = SystemContext::load(&config.system_context_file);
    let completions = OpenAiClient::new(
        reqwest::Client::new(),
        &config.openai_api_base,
        &config.openai_api_key,
        &config.model,
    );

    let dispatcher = Arc::new(Dispatcher::new(
        slack,
        directory,
        completions,
        system,
        SystemClock,
        config.flush_interval,
        bot_user_id,
    ));

    tracing::info!("Connecting to Slack via Socket Mode...");

    let socket_mode_callbacks =
        SlackSocketModeListenerCallbacks::new().with_push_events(handle_push_event);

    let listener_environment = Arc::new(
        SlackClientEventsListenerEnvironment::new(slack_client)
            .with_error_handler(error_handler)
            .with_user_state(RelayState { dispatcher }),
    );

    let socket_mode_listener = SlackClientSocketModeListener::new(
        &SlackClientSocketModeConfig::new(),
        listener_environment,
        socket_mode_callbacks,
    );

    let app_token: SlackApiToken = SlackApiToken::new(config.app_token.clone().into());
    socket_mode_listener.listen_for(&app_token).await?;

    tracing::info!(model = %config.model, "Slack relay running. Press Ctrl+C to stop.");

    tokio::select! {
        _ = socket_mode_listener.serve() => {
            tracing::warn!("Socket Mode listener exited");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
