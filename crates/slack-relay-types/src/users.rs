use serde::{Deserialize, Serialize};

use crate::events::mention;

/// Directory metadata cached per Slack user for the lifetime of the process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCacheEntry {
    pub id: String,
    /// Slack handle (`name` in the users API).
    pub display_name: Option<String>,
    pub real_name: Option<String>,
    #[serde(default)]
    pub status_text: String,
}

impl UserCacheEntry {
    /// Human-readable author reference, e.g. `Ada Lovelace (<@U1>)`.
    ///
    /// Falls back to the handle, then to the bare id, when the real name is
    /// not known.
    pub fn label(&self) -> String {
        let name = non_empty(&self.real_name)
            .or_else(|| non_empty(&self.display_name))
            .unwrap_or(&self.id);
        format!("{name} ({})", mention(&self.id))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
