use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide sequence so two sessions created within the same millisecond
/// never share an id.
static SESSION_SEQ: AtomicU64 = AtomicU64::new(0);

/// A voice session: the client-generated correlation id spanning one voice
/// interaction window
///
/// The id is composed from the account number and the creation timestamp.
/// It is a naming convenience, not a security token; the bearer token travels
/// separately on every request. Sessions live in process memory only.
#[derive(Debug, Clone)]
pub struct VoiceSession {
    session_id: String,
    account_number: String,
    created_at: DateTime<Utc>,
}

impl VoiceSession {
    /// Create a new session scoped to an account
    pub fn new(account_number: impl Into<String>) -> Self {
        let account_number = account_number.into();
        let created_at = Utc::now();
        let seq = SESSION_SEQ.fetch_add(1, Ordering::Relaxed);
        let session_id = format!(
            "session_{}_{}_{}",
            account_number,
            created_at.timestamp_millis(),
            seq
        );

        Self {
            session_id,
            account_number,
            created_at,
        }
    }

    pub fn id(&self) -> &str {
        &self.session_id
    }

    pub fn account_number(&self) -> &str {
        &self.account_number
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
