//! Per-event entry point: filter, fetch, assemble, stream.

use std::sync::Arc;
use std::time::Duration;

use slack_relay_types::{IgnoreReason, InboundMessage, TriggeredMessage};
use tracing::{debug, error, info};

use crate::clock::Clock;
use crate::context::SystemContext;
use crate::directory::UserDirectory;
use crate::error::{RelayError, Result};
use crate::history::HistoryFetcher;
use crate::openai::CompletionApi;
use crate::slack_api::{ChatApi, UserLookup};
use crate::streaming::{StreamOutcome, StreamingResponder};

/// What became of one inbound event.
#[derive(Debug)]
pub enum Disposition {
    Ignored(IgnoreReason),
    Replied(StreamOutcome),
    /// Processing failed; the error has been logged and the message is left
    /// unanswered.
    Failed(RelayError),
}

pub struct Dispatcher<S, A, K> {
    bot_user_id: String,
    history: HistoryFetcher<S, S>,
    system: SystemContext,
    responder: StreamingResponder<S, K>,
    completions: A,
}

impl<S, A, K> Dispatcher<S, A, K>
where
    S: ChatApi + UserLookup + Clone,
    A: CompletionApi,
    K: Clock,
{
    pub fn new(
        slack: S,
        directory: Arc<UserDirectory<S>>,
        completions: A,
        system: SystemContext,
        clock: K,
        flush_interval: Duration,
        bot_user_id: impl Into<String>,
    ) -> Self {
        let bot_user_id = bot_user_id.into();
        Self {
            history: HistoryFetcher::new(slack.clone(), directory, bot_user_id.clone()),
            responder: StreamingResponder::new(slack, clock, flush_interval),
            bot_user_id,
            system,
            completions,
        }
    }

    /// Handle one `message` event. Never fails: errors are logged and
    /// reported through the returned disposition.
    pub async fn handle(&self, message: InboundMessage) -> Disposition {
        let channel = message.channel.clone();
        let triggered = match message.classify(&self.bot_user_id) {
            Ok(triggered) => triggered,
            Err(reason) => {
                debug!(%channel, ?reason, "Ignoring message");
                return Disposition::Ignored(reason);
            }
        };

        info!(
            %channel,
            user = %triggered.user,
            trigger = ?triggered.trigger,
            threaded = triggered.is_threaded(),
            anchor = %triggered.thread_anchor(),
            "Responding to message"
        );

        match self.process(&triggered).await {
            Ok(outcome) => {
                info!(%channel, flushes = outcome.flushes, chars = outcome.text.chars().count(), "Reply complete");
                Disposition::Replied(outcome)
            }
            Err(e) => {
                error!(%channel, ts = %triggered.ts, error = %e, "Failed to respond to message");
                Disposition::Failed(e)
            }
        }
    }

    async fn process(&self, message: &TriggeredMessage) -> Result<StreamOutcome> {
        let anchor = message.thread_anchor();
        let history = self.history.load(&message.channel, Some(anchor)).await?;
        let context = self.system.assemble(history);
        self.responder
            .respond(&self.completions, &context, &message.channel, anchor)
            .await
    }
}
