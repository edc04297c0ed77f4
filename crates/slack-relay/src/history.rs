//! Conversation history retrieval and mapping to role-tagged entries.

use std::sync::Arc;

use futures::future::join_all;
use slack_relay_types::{ContextMessage, HistoryMessage, mention};
use tracing::debug;

use crate::directory::{UNKNOWN_USER_LABEL, UserDirectory};
use crate::error::Result;
use crate::slack_api::{ChatApi, UserLookup};

/// Reads the messages a reply should be grounded on.
pub struct HistoryFetcher<C, U> {
    chat: C,
    directory: Arc<UserDirectory<U>>,
    bot_user_id: String,
}

impl<C: ChatApi, U: UserLookup> HistoryFetcher<C, U> {
    pub fn new(chat: C, directory: Arc<UserDirectory<U>>, bot_user_id: impl Into<String>) -> Self {
        Self {
            chat,
            directory,
            bot_user_id: bot_user_id.into(),
        }
    }

    /// Raw messages for `anchor`, chronological.
    ///
    /// Without an anchor only the newest message of the channel is returned.
    /// With one, the anchored message is read; if it belongs to a thread the
    /// whole thread is returned instead.
    pub async fn fetch(&self, channel: &str, anchor: Option<&str>) -> Result<Vec<HistoryMessage>> {
        let messages = self.chat.conversations_history(channel, anchor, 1).await?;

        if anchor.is_some()
            && let Some(anchored) = messages.first().filter(|m| m.in_thread())
            && let Some(thread_ts) = anchored.thread_ts.as_deref()
        {
            let thread = self.chat.conversations_replies(channel, thread_ts).await?;
            debug!(channel, thread_ts, count = thread.len(), "Fetched thread");
            return Ok(thread);
        }

        Ok(messages)
    }

    /// Map raw messages to context entries, keeping their order.
    ///
    /// The bot's own messages become `assistant` entries verbatim. Everyone
    /// else's text is prefixed with who said it.
    pub async fn to_entries(&self, messages: Vec<HistoryMessage>) -> Vec<ContextMessage> {
        join_all(messages.into_iter().map(|msg| self.to_entry(msg))).await
    }

    /// `fetch` followed by `to_entries`.
    pub async fn load(&self, channel: &str, anchor: Option<&str>) -> Result<Vec<ContextMessage>> {
        let messages = self.fetch(channel, anchor).await?;
        Ok(self.to_entries(messages).await)
    }

    async fn to_entry(&self, msg: HistoryMessage) -> ContextMessage {
        match msg.user.as_deref() {
            Some(user) if user == self.bot_user_id => ContextMessage::assistant(msg.text),
            Some(user) => {
                let label = self.directory.label(user).await;
                ContextMessage::user(format!("{label} {} said: {}", mention(user), msg.text))
            }
            None => ContextMessage::user(format!("{UNKNOWN_USER_LABEL} said: {}", msg.text)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{MockSlack, SlackCall};
    use slack_relay_types::{Role, UserCacheEntry};

    const BOT: &str = "UBOT";

    fn msg(ts: &str, user: &str, text: &str, thread_ts: Option<&str>) -> HistoryMessage {
        HistoryMessage {
            ts: ts.into(),
            user: Some(user.into()),
            text: text.into(),
            thread_ts: thread_ts.map(str::to_string),
            bot_id: None,
        }
    }

    fn ada() -> UserCacheEntry {
        UserCacheEntry {
            id: "U1".into(),
            display_name: Some("ada".into()),
            real_name: Some("Ada Lovelace".into()),
            status_text: String::new(),
        }
    }

    fn fetcher(slack: &MockSlack) -> HistoryFetcher<MockSlack, MockSlack> {
        let directory = Arc::new(UserDirectory::new(slack.clone()));
        HistoryFetcher::new(slack.clone(), directory, BOT)
    }

    // ── fetch ─────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn no_anchor_returns_latest_message_only() {
        let slack = MockSlack::new()
            .with_message("C1", msg("1.0", "U1", "old", None))
            .with_message("C1", msg("2.0", "U1", "new", None));

        let got = fetcher(&slack).fetch("C1", None).await.unwrap();

        assert_eq!(got.len(), 1);
        assert_eq!(got[0].text, "new");
        assert_eq!(
            slack.calls(),
            vec![SlackCall::History {
                channel: "C1".into(),
                latest: None,
                limit: 1
            }]
        );
    }

    #[tokio::test]
    async fn unthreaded_anchor_returns_exactly_that_message() {
        let slack = MockSlack::new()
            .with_message("C1", msg("1.0", "U1", "anchored", None))
            .with_message("C1", msg("2.0", "U1", "later", None));

        let got = fetcher(&slack).fetch("C1", Some("1.0")).await.unwrap();

        assert_eq!(got.len(), 1);
        assert_eq!(got[0].text, "anchored");
        assert!(
            !slack
                .calls()
                .iter()
                .any(|c| matches!(c, SlackCall::Replies { .. }))
        );
    }

    #[tokio::test]
    async fn threaded_anchor_returns_whole_thread() {
        let thread = vec![
            msg("10.0", "U1", "question", Some("10.0")),
            msg("11.0", BOT, "answer", Some("10.0")),
            msg("12.0", "U1", "follow-up", Some("10.0")),
        ];
        let slack = MockSlack::new()
            .with_message("C1", thread[0].clone())
            .with_thread("10.0", thread);

        let got = fetcher(&slack).fetch("C1", Some("10.0")).await.unwrap();

        let texts: Vec<&str> = got.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["question", "answer", "follow-up"]);
        assert!(slack.calls().contains(&SlackCall::Replies {
            channel: "C1".into(),
            thread_ts: "10.0".into()
        }));
    }

    #[tokio::test]
    async fn history_failure_propagates() {
        let slack = MockSlack::new().fail_on("conversations.history");
        assert!(fetcher(&slack).fetch("C1", Some("1.0")).await.is_err());
    }

    #[tokio::test]
    async fn replies_failure_propagates() {
        let slack = MockSlack::new()
            .with_message("C1", msg("10.0", "U1", "q", Some("10.0")))
            .fail_on("conversations.replies");
        assert!(fetcher(&slack).fetch("C1", Some("10.0")).await.is_err());
    }

    // ── to_entries ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn maps_roles_and_labels_in_order() {
        let slack = MockSlack::new().with_user(ada());
        let entries = fetcher(&slack)
            .to_entries(vec![
                msg("1.0", "U1", "hi bot", None),
                msg("2.0", BOT, "hello Ada", None),
                msg("3.0", "U1", "thanks", None),
            ])
            .await;

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].role, Role::User);
        assert_eq!(entries[0].content, "Ada Lovelace (<@U1>) <@U1> said: hi bot");
        assert_eq!(entries[1], ContextMessage::assistant("hello Ada"));
        assert_eq!(entries[2].content, "Ada Lovelace (<@U1>) <@U1> said: thanks");
        assert_eq!(slack.user_info_calls(), vec!["U1"]);
    }

    #[tokio::test]
    async fn unknown_author_gets_fallback_label() {
        let slack = MockSlack::new();
        let entries = fetcher(&slack)
            .to_entries(vec![msg("1.0", "U404", "who am I", None)])
            .await;
        assert_eq!(entries[0].content, "Unknown User <@U404> said: who am I");
    }

    #[tokio::test]
    async fn message_without_author_skips_lookup() {
        let slack = MockSlack::new();
        let entries = fetcher(&slack)
            .to_entries(vec![HistoryMessage {
                ts: "1.0".into(),
                text: "integration post".into(),
                bot_id: Some("B9".into()),
                ..Default::default()
            }])
            .await;

        assert_eq!(entries[0].role, Role::User);
        assert_eq!(entries[0].content, "Unknown User said: integration post");
        assert!(slack.user_info_calls().is_empty());
    }

    #[tokio::test]
    async fn load_combines_fetch_and_mapping() {
        let slack = MockSlack::new()
            .with_user(ada())
            .with_message("D1", msg("5.0", "U1", "ping", None));

        let entries = fetcher(&slack).load("D1", Some("5.0")).await.unwrap();

        assert_eq!(
            entries,
            vec![ContextMessage::user("Ada Lovelace (<@U1>) <@U1> said: ping")]
        );
    }
}
