use serde::{Deserialize, Serialize};

/// Author role of a context entry, as understood by chat-completion APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single role-tagged entry of the conversation sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextMessage {
    pub role: Role,
    pub content: String,
}

impl ContextMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The ordered context for one completion request.
///
/// System entries always come first, followed by the channel history in
/// chronological order. Built per request and dropped once it completes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConversationContext {
    messages: Vec<ContextMessage>,
}

impl ConversationContext {
    /// Concatenate the system prefix with the history entries.
    ///
    /// Any system-role entry found in `history` is kept in place; only the
    /// prefix is guaranteed to lead.
    pub fn new(system_prefix: &[ContextMessage], history: Vec<ContextMessage>) -> Self {
        let mut messages = Vec::with_capacity(system_prefix.len() + history.len());
        messages.extend_from_slice(system_prefix);
        messages.extend(history);
        Self { messages }
    }

    pub fn messages(&self) -> &[ContextMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
