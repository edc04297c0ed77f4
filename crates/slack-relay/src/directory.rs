//! Process-lifetime cache of Slack user profiles.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use slack_relay_types::UserCacheEntry;
use tracing::{debug, warn};

use crate::error::Result;
use crate::slack_api::UserLookup;

/// Label returned when a user cannot be resolved.
pub const UNKNOWN_USER_LABEL: &str = "Unknown User";

/// Lazily populated user directory.
///
/// Entries are never evicted. Failed lookups are not cached, so the next
/// request for the same id tries again. Two tasks missing on the same id at
/// once both call `users.info`; the second insert overwrites the first with
/// an identical entry.
pub struct UserDirectory<U> {
    lookup: U,
    entries: Mutex<HashMap<String, UserCacheEntry>>,
}

impl<U: UserLookup> UserDirectory<U> {
    pub fn new(lookup: U) -> Self {
        Self {
            lookup,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Populate the cache from `users.list`. Returns how many users were
    /// stored.
    pub async fn warm(&self) -> Result<usize> {
        let users = self.lookup.list_users().await?;
        let count = users.len();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        for user in users {
            entries.insert(user.id.clone(), user);
        }
        Ok(count)
    }

    /// Display label for `user_id`, e.g. `Ada Lovelace (<@U1>)`.
    pub async fn label(&self, user_id: &str) -> String {
        if let Some(entry) = self.cached(user_id) {
            return entry.label();
        }

        match self.lookup.user_info(user_id).await {
            Ok(entry) => {
                debug!(user_id, "Cached user profile");
                let label = entry.label();
                self.entries
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(user_id.to_string(), entry);
                label
            }
            Err(e) => {
                warn!(user_id, error = %e, "User lookup failed");
                UNKNOWN_USER_LABEL.to_string()
            }
        }
    }

    pub fn cached(&self, user_id: &str) -> Option<UserCacheEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
