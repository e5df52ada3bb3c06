use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a conversation entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single utterance in the conversation
///
/// Entries are immutable once appended. The intent tag is advisory metadata
/// for display; transfer logic is driven solely by the transfer attempt's
/// status, never by these tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub role: Role,

    /// Transcript (user) or reply text (assistant)
    pub text: String,

    /// Classified intent of a user utterance, if known
    pub intent: Option<String>,

    /// When this entry was appended
    pub timestamp: DateTime<Utc>,
}

/// Append-only ordered record of exchanged utterances, for display and audit
///
/// Entries only leave the log through [`ConversationLog::clear`], which
/// truncates the whole thing.
#[derive(Debug, Default)]
pub struct ConversationLog {
    entries: Vec<ConversationEntry>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a user utterance, optionally tagged with its classified intent
    pub fn push_user(&mut self, text: impl Into<String>, intent: Option<String>) {
        self.entries.push(ConversationEntry {
            role: Role::User,
            text: text.into(),
            intent,
            timestamp: Utc::now(),
        });
    }

    /// Append an assistant reply
    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.entries.push(ConversationEntry {
            role: Role::Assistant,
            text: text.into(),
            intent: None,
            timestamp: Utc::now(),
        });
    }

    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Truncate the log to empty
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
