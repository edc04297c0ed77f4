//! Slack Web API client and the trait seams the relay components depend on.

use std::future::Future;
use std::sync::Arc;

use slack_morphism::errors::SlackClientError;
use slack_morphism::prelude::*;
use slack_relay_types::{HistoryMessage, UserCacheEntry};

use crate::error::{RelayError, Result};

/// Page size requested from cursor-paginated methods.
const PAGE_LIMIT: u16 = 200;

/// Conversation reads and message writes.
pub trait ChatApi: Send + Sync {
    /// `conversations.history`. With `latest` set, the window ends at (and
    /// includes) that timestamp.
    fn conversations_history(
        &self,
        channel: &str,
        latest: Option<&str>,
        limit: u16,
    ) -> impl Future<Output = Result<Vec<HistoryMessage>>> + Send;

    /// `conversations.replies`: every message of the thread rooted at
    /// `thread_ts`, oldest first.
    fn conversations_replies(
        &self,
        channel: &str,
        thread_ts: &str,
    ) -> impl Future<Output = Result<Vec<HistoryMessage>>> + Send;

    /// `chat.postMessage`; returns the new message's `ts`.
    fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> impl Future<Output = Result<String>> + Send;

    /// `chat.update`: replaces the full text of an existing message.
    fn update_message(
        &self,
        channel: &str,
        ts: &str,
        text: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// User directory reads.
pub trait UserLookup: Send + Sync {
    /// `users.info`.
    fn user_info(&self, user_id: &str) -> impl Future<Output = Result<UserCacheEntry>> + Send;

    /// `users.list`, all pages.
    fn list_users(&self) -> impl Future<Output = Result<Vec<UserCacheEntry>>> + Send;
}

/// Bot-token Web API client over a shared slack-morphism [`SlackClient`].
///
/// The connector decides the API base: `https://slack.com/api` in
/// production, a mock server in tests.
pub struct SlackWebClient<SCHC = SlackClientHyperHttpsConnector>
where
    SCHC: SlackClientHttpConnector + Send + Sync,
{
    client: Arc<SlackClient<SCHC>>,
    token: SlackApiToken,
}

impl<SCHC> Clone for SlackWebClient<SCHC>
where
    SCHC: SlackClientHttpConnector + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            token: self.token.clone(),
        }
    }
}

impl<SCHC> SlackWebClient<SCHC>
where
    SCHC: SlackClientHttpConnector + Send + Sync + Clone + 'static,
{
    pub fn new(client: Arc<SlackClient<SCHC>>, bot_token: &str) -> Self {
        Self {
            client,
            token: SlackApiToken::new(bot_token.to_string().into()),
        }
    }

    fn session(&self) -> SlackClientSession<'_, SCHC> {
        self.client.open_session(&self.token)
    }

    /// `auth.test`: validates the token and returns the bot's own user id.
    pub async fn auth_test(&self) -> Result<String> {
        let resp = self
            .session()
            .auth_test()
            .await
            .map_err(slack_error("auth.test"))?;
        Some(resp.user_id.0)
            .filter(|id| !id.is_empty())
            .ok_or(RelayError::MissingField("user_id"))
    }
}

/// Web API failures keep the Slack error code; transport and decoding
/// failures keep the client error as the source.
fn slack_error(method: &'static str) -> impl FnOnce(SlackClientError) -> RelayError {
    move |err| match err {
        SlackClientError::ApiError(api) => RelayError::Slack {
            method,
            error: api.code,
        },
        SlackClientError::RateLimitError(limited) => RelayError::Slack {
            method,
            error: limited.code.unwrap_or_else(|| "ratelimited".to_string()),
        },
        source => RelayError::SlackClient { method, source },
    }
}

fn next_cursor(meta: Option<SlackResponseMetadata>) -> Option<SlackCursorId> {
    meta.and_then(|m| m.next_cursor)
        .filter(|cursor| !cursor.0.is_empty())
}

fn history_message(msg: SlackHistoryMessage) -> HistoryMessage {
    HistoryMessage {
        ts: msg.origin.ts.0,
        user: msg.sender.user.map(|id| id.0),
        text: msg.content.text.unwrap_or_default(),
        thread_ts: msg.origin.thread_ts.map(|ts| ts.0),
        bot_id: msg.sender.bot_id.map(|id| id.0),
    }
}

/// The profile's real name wins over the account-level one when set.
fn cache_entry(user: SlackUser) -> UserCacheEntry {
    let (profile_real_name, status_text) = match user.profile {
        Some(profile) => (profile.real_name, profile.status_text),
        None => (None, None),
    };
    UserCacheEntry {
        id: user.id.0,
        display_name: user.name,
        real_name: profile_real_name
            .filter(|name| !name.is_empty())
            .or(user.real_name),
        status_text: status_text.unwrap_or_default(),
    }
}

impl<SCHC> ChatApi for SlackWebClient<SCHC>
where
    SCHC: SlackClientHttpConnector + Send + Sync + Clone + 'static,
{
    async fn conversations_history(
        &self,
        channel: &str,
        latest: Option<&str>,
        limit: u16,
    ) -> Result<Vec<HistoryMessage>> {
        let mut request = SlackApiConversationsHistoryRequest::new()
            .with_channel(SlackChannelId(channel.to_string()))
            .with_limit(limit);
        if let Some(latest) = latest {
            request = request
                .with_latest(SlackTs(latest.to_string()))
                .with_inclusive(true);
        }
        let resp = self
            .session()
            .conversations_history(&request)
            .await
            .map_err(slack_error("conversations.history"))?;
        Ok(resp.messages.into_iter().map(history_message).collect())
    }

    async fn conversations_replies(
        &self,
        channel: &str,
        thread_ts: &str,
    ) -> Result<Vec<HistoryMessage>> {
        let first = SlackApiConversationsRepliesRequest::new(
            SlackChannelId(channel.to_string()),
            SlackTs(thread_ts.to_string()),
        )
        .with_limit(PAGE_LIMIT);

        let mut messages = Vec::new();
        let mut cursor: Option<SlackCursorId> = None;
        loop {
            let request = first.clone().opt_cursor(cursor.take());
            let page = self
                .session()
                .conversations_replies(&request)
                .await
                .map_err(slack_error("conversations.replies"))?;
            messages.extend(page.messages.into_iter().map(history_message));
            match next_cursor(page.response_metadata) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(messages)
    }

    async fn post_message(&self, channel: &str, text: &str, thread_ts: Option<&str>) -> Result<String> {
        let content = SlackMessageContent::new().with_text(text.to_string());
        let request = SlackApiChatPostMessageRequest::new(SlackChannelId(channel.to_string()), content)
            .opt_thread_ts(thread_ts.map(|ts| SlackTs(ts.to_string())));
        let resp = self
            .session()
            .chat_post_message(&request)
            .await
            .map_err(slack_error("chat.postMessage"))?;
        Ok(resp.ts.0)
    }

    async fn update_message(&self, channel: &str, ts: &str, text: &str) -> Result<()> {
        let content = SlackMessageContent::new().with_text(text.to_string());
        let request = SlackApiChatUpdateRequest::new(
            SlackChannelId(channel.to_string()),
            content,
            SlackTs(ts.to_string()),
        );
        self.session()
            .chat_update(&request)
            .await
            .map_err(slack_error("chat.update"))?;
        Ok(())
    }
}

impl<SCHC> UserLookup for SlackWebClient<SCHC>
where
    SCHC: SlackClientHttpConnector + Send + Sync + Clone + 'static,
{
    async fn user_info(&self, user_id: &str) -> Result<UserCacheEntry> {
        let request = SlackApiUsersInfoRequest::new(SlackUserId(user_id.to_string()));
        let resp = self
            .session()
            .users_info(&request)
            .await
            .map_err(slack_error("users.info"))?;
        Ok(cache_entry(resp.user))
    }

    async fn list_users(&self) -> Result<Vec<UserCacheEntry>> {
        let mut users = Vec::new();
        let mut cursor: Option<SlackCursorId> = None;
        loop {
            let request = SlackApiUsersListRequest::new()
                .with_limit(PAGE_LIMIT)
                .opt_cursor(cursor.take());
            let page = self
                .session()
                .users_list(&request)
                .await
                .map_err(slack_error("users.list"))?;
            users.extend(page.members.into_iter().map(cache_entry));
            match next_cursor(page.response_metadata) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(users)
    }
}
