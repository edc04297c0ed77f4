//! System prefix loading and context assembly.

use std::io;
use std::path::Path;

use serde::Deserialize;
use slack_relay_types::{ContextMessage, ConversationContext};
use tracing::{info, warn};

#[derive(Deserialize)]
struct InstructionRow {
    content: String,
}

/// System instructions prepended to every completion request.
///
/// Loaded once at startup and shared read-only by every request.
#[derive(Debug, Clone, Default)]
pub struct SystemContext {
    prefix: Vec<ContextMessage>,
}

impl SystemContext {
    pub fn new(prefix: Vec<ContextMessage>) -> Self {
        Self { prefix }
    }

    /// Read a CSV with a `content` column; each row is one system entry.
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, csv::Error> {
        let prefix = csv::Reader::from_reader(reader)
            .deserialize::<InstructionRow>()
            .map(|row| row.map(|r| ContextMessage::system(r.content)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { prefix })
    }

    /// Load `path`, falling back to an empty prefix when the file is absent
    /// or unreadable.
    pub fn load(path: &Path) -> Self {
        let loaded = std::fs::File::open(path)
            .map_err(csv::Error::from)
            .and_then(Self::from_reader);
        match loaded {
            Ok(context) => {
                info!(path = %path.display(), entries = context.len(), "Loaded system context");
                context
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "System context unavailable, continuing without it");
                Self::default()
            }
        }
    }

    /// `prefix ++ history`.
    pub fn assemble(&self, history: Vec<ContextMessage>) -> ConversationContext {
        ConversationContext::new(&self.prefix, history)
    }

    pub fn len(&self) -> usize {
        self.prefix.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefix.is_empty()
    }
}
