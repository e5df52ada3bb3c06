use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a transfer attempt
///
/// Status only advances forward along `Initiated → PinVerified → Confirmed`,
/// or diverts to `Cancelled`/`Failed` from a non-terminal state. It never
/// regresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Initiated,
    PinVerified,
    Confirmed,
    Cancelled,
    Failed,
}

impl TransferStatus {
    /// Whether the transfer is finished (no further transitions allowed)
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TransferStatus::Confirmed | TransferStatus::Cancelled | TransferStatus::Failed
        )
    }

    /// Forward-only transition check
    pub fn can_advance_to(self, next: TransferStatus) -> bool {
        use TransferStatus::*;
        match (self, next) {
            (Initiated, PinVerified) => true,
            (PinVerified, Confirmed) => true,
            // Divert from any non-terminal state
            (Initiated | PinVerified, Cancelled | Failed) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransferStatus::Initiated => "initiated",
            TransferStatus::PinVerified => "pin_verified",
            TransferStatus::Confirmed => "confirmed",
            TransferStatus::Cancelled => "cancelled",
            TransferStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A transfer recipient as resolved by the remote system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: String,
    pub name: String,
    pub account_number: String,
    pub bank_name: String,
}

/// Result of a recipient name search
#[derive(Debug, Clone)]
pub enum RecipientMatch {
    /// Exactly one recipient matched; safe to proceed
    Single(Recipient),
    /// Several candidates; the caller must disambiguate before proceeding
    Multiple(Vec<Recipient>),
    /// No recipient matched the name
    None,
}

/// The stateful record of one in-progress money movement
///
/// Owned exclusively by the transfer state machine for its lifetime; dropped
/// on confirm, cancel, or explicit reset.
#[derive(Debug, Clone)]
pub struct TransferAttempt {
    pub transfer_id: String,
    pub recipient: Recipient,
    pub amount: f64,
    pub currency: String,
    pub current_balance: f64,
    pub new_balance: f64,
    pub status: TransferStatus,
}

/// Terminal summary of a finished transfer attempt
#[derive(Debug, Clone)]
pub struct TransferReceipt {
    pub transfer_id: String,
    pub status: TransferStatus,
    /// Ledger reference; present only for confirmed transfers
    pub transaction_ref: Option<String>,
    /// Balance after the transfer committed, when the remote reports it
    pub new_balance: Option<f64>,
    pub completed_at: DateTime<Utc>,
}
