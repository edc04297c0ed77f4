//! In-memory Slack and completion doubles for unit tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use futures::StreamExt;
use slack_relay_types::{ConversationContext, HistoryMessage, UserCacheEntry};

use crate::error::{RelayError, Result};
use crate::openai::{CompletionApi, DeltaStream};
use crate::slack_api::{ChatApi, UserLookup};

/// One recorded Slack Web API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlackCall {
    History {
        channel: String,
        latest: Option<String>,
        limit: u16,
    },
    Replies {
        channel: String,
        thread_ts: String,
    },
    Post {
        channel: String,
        text: String,
        thread_ts: Option<String>,
    },
    Update {
        channel: String,
        ts: String,
        text: String,
    },
    UserInfo(String),
    ListUsers,
}

impl SlackCall {
    fn is_mutation(&self) -> bool {
        matches!(self, SlackCall::Post { .. } | SlackCall::Update { .. })
    }
}

#[derive(Default)]
struct SlackState {
    /// Top-level messages per channel, oldest first.
    channels: HashMap<String, Vec<HistoryMessage>>,
    /// Thread messages keyed by root ts, oldest first.
    threads: HashMap<String, Vec<HistoryMessage>>,
    users: BTreeMap<String, UserCacheEntry>,
    /// Current text of every message posted through the mock.
    posted: BTreeMap<String, String>,
    failing: HashSet<&'static str>,
    calls: Vec<SlackCall>,
    next_ts: u64,
}

/// Slack workspace held in memory. Clones share state, so a test keeps one
/// handle for assertions and gives another to the code under test.
#[derive(Clone, Default)]
pub struct MockSlack {
    state: Arc<Mutex<SlackState>>,
}

fn ts_value(ts: &str) -> f64 {
    ts.parse().unwrap_or(0.0)
}

impl MockSlack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message(self, channel: &str, message: HistoryMessage) -> Self {
        self.state
            .lock()
            .unwrap()
            .channels
            .entry(channel.to_string())
            .or_default()
            .push(message);
        self
    }

    pub fn with_thread(self, thread_ts: &str, messages: Vec<HistoryMessage>) -> Self {
        self.state
            .lock()
            .unwrap()
            .threads
            .insert(thread_ts.to_string(), messages);
        self
    }

    pub fn with_user(self, user: UserCacheEntry) -> Self {
        self.add_user(user);
        self
    }

    pub fn add_user(&self, user: UserCacheEntry) {
        self.state.lock().unwrap().users.insert(user.id.clone(), user);
    }

    /// Make every call to `method` (e.g. `"chat.update"`) fail.
    pub fn fail_on(self, method: &'static str) -> Self {
        self.state.lock().unwrap().failing.insert(method);
        self
    }

    pub fn calls(&self) -> Vec<SlackCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Only the `chat.postMessage` and `chat.update` calls.
    pub fn mutations(&self) -> Vec<SlackCall> {
        self.calls().into_iter().filter(SlackCall::is_mutation).collect()
    }

    pub fn user_info_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SlackCall::UserInfo(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Text currently shown for a message posted through the mock.
    pub fn posted_text(&self, ts: &str) -> Option<String> {
        self.state.lock().unwrap().posted.get(ts).cloned()
    }

    fn record(&self, method: &'static str, call: SlackCall) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.failing.contains(method) {
            return Err(RelayError::Slack {
                method,
                error: "mock_failure".into(),
            });
        }
        Ok(())
    }
}

impl ChatApi for MockSlack {
    async fn conversations_history(
        &self,
        channel: &str,
        latest: Option<&str>,
        limit: u16,
    ) -> Result<Vec<HistoryMessage>> {
        self.record(
            "conversations.history",
            SlackCall::History {
                channel: channel.to_string(),
                latest: latest.map(str::to_string),
                limit,
            },
        )?;
        let state = self.state.lock().unwrap();
        let upper = latest.map(ts_value).unwrap_or(f64::MAX);
        Ok(state
            .channels
            .get(channel)
            .map(|msgs| {
                msgs.iter()
                    .rev()
                    .filter(|m| ts_value(&m.ts) <= upper)
                    .take(limit as usize)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn conversations_replies(
        &self,
        channel: &str,
        thread_ts: &str,
    ) -> Result<Vec<HistoryMessage>> {
        self.record(
            "conversations.replies",
            SlackCall::Replies {
                channel: channel.to_string(),
                thread_ts: thread_ts.to_string(),
            },
        )?;
        let state = self.state.lock().unwrap();
        state
            .threads
            .get(thread_ts)
            .cloned()
            .ok_or_else(|| RelayError::Slack {
                method: "conversations.replies",
                error: "thread_not_found".into(),
            })
    }

    async fn post_message(&self, channel: &str, text: &str, thread_ts: Option<&str>) -> Result<String> {
        self.record(
            "chat.postMessage",
            SlackCall::Post {
                channel: channel.to_string(),
                text: text.to_string(),
                thread_ts: thread_ts.map(str::to_string),
            },
        )?;
        let mut state = self.state.lock().unwrap();
        state.next_ts += 1;
        let ts = format!("900.{:06}", state.next_ts);
        state.posted.insert(ts.clone(), text.to_string());
        Ok(ts)
    }

    async fn update_message(&self, channel: &str, ts: &str, text: &str) -> Result<()> {
        self.record(
            "chat.update",
            SlackCall::Update {
                channel: channel.to_string(),
                ts: ts.to_string(),
                text: text.to_string(),
            },
        )?;
        let mut state = self.state.lock().unwrap();
        match state.posted.get_mut(ts) {
            Some(current) => {
                *current = text.to_string();
                Ok(())
            }
            None => Err(RelayError::Slack {
                method: "chat.update",
                error: "message_not_found".into(),
            }),
        }
    }
}

impl UserLookup for MockSlack {
    async fn user_info(&self, user_id: &str) -> Result<UserCacheEntry> {
        self.record("users.info", SlackCall::UserInfo(user_id.to_string()))?;
        self.state
            .lock()
            .unwrap()
            .users
            .get(user_id)
            .cloned()
            .ok_or_else(|| RelayError::Slack {
                method: "users.info",
                error: "user_not_found".into(),
            })
    }

    async fn list_users(&self) -> Result<Vec<UserCacheEntry>> {
        self.record("users.list", SlackCall::ListUsers)?;
        Ok(self.state.lock().unwrap().users.values().cloned().collect())
    }
}

/// Completion source replaying a fixed list of deltas.
#[derive(Clone, Default)]
pub struct MockCompletions {
    deltas: Vec<String>,
    /// Yield a stream error after this many deltas.
    fail_after: Option<usize>,
    reject_request: bool,
    requests: Arc<Mutex<Vec<ConversationContext>>>,
}

impl MockCompletions {
    pub fn new<S: Into<String>>(deltas: impl IntoIterator<Item = S>) -> Self {
        Self {
            deltas: deltas.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn failing_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    pub fn rejecting(mut self) -> Self {
        self.reject_request = true;
        self
    }

    /// Every context a completion was requested for.
    pub fn requests(&self) -> Vec<ConversationContext> {
        self.requests.lock().unwrap().clone()
    }
}

impl CompletionApi for MockCompletions {
    async fn stream_completion(&self, context: &ConversationContext) -> Result<DeltaStream> {
        self.requests.lock().unwrap().push(context.clone());
        if self.reject_request {
            return Err(RelayError::CompletionStatus {
                status: 500,
                body: "mock rejection".into(),
            });
        }

        let mut items: Vec<Result<String>> = match self.fail_after {
            Some(n) => self.deltas.iter().take(n).cloned().map(Ok).collect(),
            None => self.deltas.iter().cloned().map(Ok).collect(),
        };
        if self.fail_after.is_some() {
            items.push(Err(RelayError::CompletionStream("connection reset".into())));
        }
        Ok(futures::stream::iter(items).boxed())
    }
}
