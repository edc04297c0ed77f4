use serde::{Deserialize, Serialize};

/// Channel type Slack reports for a one-to-one conversation with the bot.
pub const DIRECT_MESSAGE_CHANNEL_TYPE: &str = "im";

/// A `message` event as delivered by Slack, before any validation.
///
/// Only the fields the relay reads are modelled; everything else in the
/// payload is ignored on deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub channel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default)]
    pub text: String,
    pub ts: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_id: Option<String>,
    /// Set for edits, joins, deletions and every other non-plain message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
}

/// Why an inbound message produced no response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Posted by a bot, including the relay itself.
    FromBot,
    /// Carries a platform subtype (`message_changed`, `channel_join`, ...).
    Subtype(String),
    /// Neither a direct message nor a mention of the bot.
    NotAddressed,
    /// No author id, so there is nobody to answer.
    NoAuthor,
}

/// How the bot was addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    DirectMessage,
    Mention,
}

/// An inbound message that warrants a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggeredMessage {
    pub trigger: Trigger,
    pub channel: String,
    pub user: String,
    pub text: String,
    pub ts: String,
    pub thread_ts: Option<String>,
}

impl TriggeredMessage {
    /// Timestamp the reply is threaded under: the existing thread root, or the
    /// message itself so that a non-threaded trigger starts a new thread.
    pub fn thread_anchor(&self) -> &str {
        self.thread_ts.as_deref().unwrap_or(&self.ts)
    }

    pub fn is_threaded(&self) -> bool {
        self.thread_ts.is_some()
    }
}

impl InboundMessage {
    /// Validate the raw event and decide whether the bot should answer it.
    ///
    /// Bot authors and subtypes are rejected first; the remaining message is
    /// accepted when it is a direct message or mentions `bot_user_id`.
    pub fn classify(self, bot_user_id: &str) -> Result<TriggeredMessage, IgnoreReason> {
        if self.bot_id.is_some() {
            return Err(IgnoreReason::FromBot);
        }
        if let Some(subtype) = self.subtype {
            return Err(IgnoreReason::Subtype(subtype));
        }

        let trigger = if self.channel_type.as_deref() == Some(DIRECT_MESSAGE_CHANNEL_TYPE) {
            Trigger::DirectMessage
        } else if self.text.contains(&mention(bot_user_id)) {
            Trigger::Mention
        } else {
            return Err(IgnoreReason::NotAddressed);
        };

        let user = self.user.ok_or(IgnoreReason::NoAuthor)?;

        Ok(TriggeredMessage {
            trigger,
            channel: self.channel,
            user,
            text: self.text,
            ts: self.ts,
            thread_ts: self.thread_ts,
        })
    }
}

/// Slack mention markup for a user id, e.g. `<@U123>`.
pub fn mention(user_id: &str) -> String {
    format!("<@{user_id}>")
}

/// One message as returned by `conversations.history` / `conversations.replies`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub ts: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_id: Option<String>,
}

impl HistoryMessage {
    /// True when the message is a thread root or a reply inside a thread.
    pub fn in_thread(&self) -> bool {
        self.thread_ts.is_some()
    }
}
