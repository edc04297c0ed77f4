//! Throttled relay of a completion stream into one Slack message.
//!
//! Deltas are accumulated locally and pushed to Slack at most once per flush
//! interval: the first flush posts the reply into the thread, later ones
//! replace its full text. Whatever is left when the stream ends is flushed
//! unconditionally, so the message always converges to the complete reply.
//!
//! The window opens when the stream starts, so nothing appears in Slack until
//! a full interval has passed. A reply that completes sooner shows up as a
//! single post at stream end.

use std::time::Duration;

use futures::StreamExt;
use slack_relay_types::ConversationContext;
use tokio::time::Instant;
use tracing::debug;

use crate::clock::Clock;
use crate::error::Result;
use crate::openai::{CompletionApi, DeltaStream};
use crate::slack_api::ChatApi;

/// Result of one relayed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOutcome {
    /// Concatenation of every delta received.
    pub text: String,
    /// The reply message, if one was posted.
    pub message_ts: Option<String>,
    /// Number of `chat.postMessage` + `chat.update` calls made.
    pub flushes: usize,
}

/// Per-response state. Lives for one `relay` call.
struct StreamAccumulator {
    text: String,
    message_ts: Option<String>,
    last_flush: Instant,
    flushed_len: usize,
    flushes: usize,
}

impl StreamAccumulator {
    fn new(started: Instant) -> Self {
        Self {
            text: String::new(),
            message_ts: None,
            last_flush: started,
            flushed_len: 0,
            flushes: 0,
        }
    }

    fn has_content(&self) -> bool {
        !self.text.trim().is_empty()
    }

    /// Text only grows, so a length change means new content.
    fn has_unflushed(&self) -> bool {
        self.text.len() != self.flushed_len
    }

    fn into_outcome(self) -> StreamOutcome {
        StreamOutcome {
            text: self.text,
            message_ts: self.message_ts,
            flushes: self.flushes,
        }
    }
}

/// Streams completions into Slack replies.
pub struct StreamingResponder<C, K> {
    chat: C,
    clock: K,
    flush_interval: Duration,
}

impl<C: ChatApi, K: Clock> StreamingResponder<C, K> {
    pub fn new(chat: C, clock: K, flush_interval: Duration) -> Self {
        Self {
            chat,
            clock,
            flush_interval,
        }
    }

    /// Request a completion for `context` and relay it as a reply threaded
    /// under `thread_anchor`.
    pub async fn respond<A: CompletionApi>(
        &self,
        completions: &A,
        context: &ConversationContext,
        channel: &str,
        thread_anchor: &str,
    ) -> Result<StreamOutcome> {
        let deltas = completions.stream_completion(context).await?;
        self.relay(deltas, channel, thread_anchor).await
    }

    /// Consume `deltas`, flushing to Slack as the interval allows.
    ///
    /// A failed Slack call or stream error aborts the relay; whatever was
    /// already posted stays as it is.
    pub async fn relay(
        &self,
        mut deltas: DeltaStream,
        channel: &str,
        thread_anchor: &str,
    ) -> Result<StreamOutcome> {
        let mut acc = StreamAccumulator::new(self.clock.now());

        while let Some(delta) = deltas.next().await {
            acc.text.push_str(&delta?);

            let now = self.clock.now();
            if now.duration_since(acc.last_flush) >= self.flush_interval && acc.has_content() {
                self.flush(&mut acc, channel, thread_anchor).await?;
                acc.last_flush = now;
            }
        }

        if acc.has_content() && acc.has_unflushed() {
            self.flush(&mut acc, channel, thread_anchor).await?;
        }

        Ok(acc.into_outcome())
    }

    async fn flush(&self, acc: &mut StreamAccumulator, channel: &str, thread_anchor: &str) -> Result<()> {
        match acc.message_ts.as_deref() {
            Some(ts) => self.chat.update_message(channel, ts, &acc.text).await?,
            None => {
                let ts = self
                    .chat
                    .post_message(channel, &acc.text, Some(thread_anchor))
                    .await?;
                acc.message_ts = Some(ts);
            }
        }
        acc.flushed_len = acc.text.len();
        acc.flushes += 1;
        debug!(channel, bytes = acc.text.len(), flush = acc.flushes, "Flushed reply");
        Ok(())
    }
}
