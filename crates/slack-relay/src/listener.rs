//! Socket Mode ingress: turns Slack push events into dispatcher calls.

use std::sync::Arc;

use slack_morphism::prelude::*;
use slack_relay_types::InboundMessage;

use crate::clock::SystemClock;
use crate::dispatcher::Dispatcher;
use crate::openai::OpenAiClient;
use crate::slack_api::SlackWebClient;

/// The dispatcher wired to the real Slack and completion clients.
pub type LiveDispatcher = Dispatcher<SlackWebClient, OpenAiClient, SystemClock>;

/// Shared state injected into the Socket Mode listener via `with_user_state`.
#[derive(Clone)]
pub struct RelayState {
    pub dispatcher: Arc<LiveDispatcher>,
}

pub async fn handle_push_event(
    event: SlackPushEventCallback,
    _client: Arc<SlackHyperClient>,
    states: SlackClientEventsUserState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let SlackEventCallbackBody::Message(msg) = event.event else {
        return Ok(());
    };

    let state = {
        let states = states.read().await;
        states
            .get_user_state::<RelayState>()
            .ok_or("RelayState missing from listener user state")?
            .clone()
    };

    let Some(inbound) = to_inbound(&msg) else {
        tracing::debug!(ts = %msg.origin.ts.0, "Message event without channel, ignoring");
        return Ok(());
    };

    // Acknowledge immediately; the reply may take many seconds to stream.
    tokio::spawn(async move {
        state.dispatcher.handle(inbound).await;
    });

    Ok(())
}

/// Flatten a Slack message event into the relay's inbound shape.
pub fn to_inbound(msg: &SlackMessageEvent) -> Option<InboundMessage> {
    let channel = msg.origin.channel.as_ref()?.0.clone();
    Some(InboundMessage {
        channel,
        channel_type: msg.origin.channel_type.as_ref().map(|ct| ct.0.clone()),
        user: msg.sender.user.as_ref().map(|u| u.0.clone()),
        text: msg
            .content
            .as_ref()
            .and_then(|c| c.text.clone())
            .unwrap_or_default(),
        ts: msg.origin.ts.0.clone(),
        thread_ts: msg.origin.thread_ts.as_ref().map(|t| t.0.clone()),
        bot_id: msg.sender.bot_id.as_ref().map(|b| b.0.clone()),
        subtype: msg.subtype.as_ref().map(subtype_name),
    })
}

/// Wire name of a subtype (`message_changed`), falling back to the variant
/// name for anything that does not serialize to a string.
fn subtype_name(subtype: &SlackMessageEventType) -> String {
    serde_json::to_value(subtype)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("{subtype:?}"))
}

pub fn error_handler(
    err: Box<dyn std::error::Error + Send + Sync>,
    _client: Arc<SlackHyperClient>,
    _states: SlackClientEventsUserState,
) -> HttpStatusCode {
    tracing::error!(error = %err, "Slack socket mode error");
    HttpStatusCode::OK
}
