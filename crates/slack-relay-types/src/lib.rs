//! Data shapes shared by the Slack relay: inbound events, channel history,
//! user directory entries and the role-tagged context sent to the model.

pub mod context;
pub mod events;
pub mod users;

pub use context::{ContextMessage, ConversationContext, Role};
pub use events::{
    HistoryMessage, IgnoreReason, InboundMessage, Trigger, TriggeredMessage, mention,
};
pub use users::UserCacheEntry;
