use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use super::types::{Recipient, RecipientMatch, TransferAttempt, TransferReceipt, TransferStatus};
use crate::api::gateway::BankApi;
use crate::error::{VoiceBankError, VoiceResult};

/// The transfer confirmation state machine
///
/// Owns the single active [`TransferAttempt`] for its session and drives it
/// through `initiated → pin_verified → confirmed`, or diverts it to
/// `cancelled`/`failed`. PIN verification is deliberately separate from
/// confirmation: a verified-but-unconfirmed transfer can still be cancelled
/// without moving funds.
///
/// The remote ledger owns the money; this machine owns the preconditions.
/// A transport failure leaves the attempt in its last confirmed state.
pub struct TransferFlow {
    bank: Arc<dyn BankApi>,
    session_id: String,
    attempt: Option<TransferAttempt>,
}

impl TransferFlow {
    pub fn new(bank: Arc<dyn BankApi>, session_id: impl Into<String>) -> Self {
        Self {
            bank,
            session_id: session_id.into(),
            attempt: None,
        }
    }

    /// The active attempt, if any
    pub fn attempt(&self) -> Option<&TransferAttempt> {
        self.attempt.as_ref()
    }

    pub fn status(&self) -> Option<TransferStatus> {
        self.attempt.as_ref().map(|a| a.status)
    }

    /// Search recipients by name and classify the result
    pub async fn search_recipient(&self, name: &str, limit: usize) -> VoiceResult<RecipientMatch> {
        let recipients = self.bank.search_recipients(name, limit).await?;

        Ok(match recipients.len() {
            0 => RecipientMatch::None,
            1 => RecipientMatch::Single(recipients.into_iter().next().expect("len checked")),
            _ => RecipientMatch::Multiple(recipients),
        })
    }

    /// Create a fresh transfer attempt at `initiated`
    ///
    /// Rejects non-positive amounts before any network call, and rejects a
    /// second attempt while one is still in flight: at most one active
    /// attempt per session.
    pub async fn initiate(
        &mut self,
        recipient: &Recipient,
        amount: f64,
    ) -> VoiceResult<&TransferAttempt> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(VoiceBankError::InvalidAmount(amount));
        }
        if let Some(active) = &self.attempt {
            if !active.status.is_terminal() {
                return Err(VoiceBankError::TransferInProgress);
            }
        }

        let record = self
            .bank
            .initiate_transfer(&recipient.id, amount, &self.session_id)
            .await?;

        if record.status != TransferStatus::Initiated {
            return Err(VoiceBankError::Remote(format!(
                "initiation returned unexpected status '{}'",
                record.status
            )));
        }

        let current_balance = record.current_balance.unwrap_or_default();
        let attempt = TransferAttempt {
            transfer_id: record.transfer_id,
            recipient: record.recipient.unwrap_or_else(|| recipient.clone()),
            amount: record.amount.unwrap_or(amount),
            currency: record.currency,
            current_balance,
            new_balance: record.new_balance.unwrap_or(current_balance - amount),
            status: TransferStatus::Initiated,
        };

        info!(
            "Transfer {} initiated: {} {} to {}",
            attempt.transfer_id, attempt.amount, attempt.currency, attempt.recipient.name
        );

        self.attempt = Some(attempt);
        Ok(self.attempt.as_ref().expect("just set"))
    }

    /// Verify the holder's PIN for the active attempt
    ///
    /// The PIN format (exactly 4 digits) is checked locally before any
    /// network call. On a remote `InvalidPin` rejection the attempt survives
    /// at `initiated` and the remaining-attempts counter rides along in the
    /// error for display.
    pub async fn verify_pin(&mut self, pin: &str) -> VoiceResult<&TransferAttempt> {
        if pin.len() != 4 || !pin.chars().all(|c| c.is_ascii_digit()) {
            return Err(VoiceBankError::Validation(
                "PIN must be exactly 4 digits".to_string(),
            ));
        }

        let attempt = self.attempt.as_ref().ok_or(VoiceBankError::TransferNotFound)?;
        if attempt.status != TransferStatus::Initiated {
            return Err(VoiceBankError::Precondition {
                expected: TransferStatus::Initiated,
                actual: attempt.status,
            });
        }

        let record = self.bank.verify_pin(&attempt.transfer_id, pin).await?;
        if record.transfer_id != attempt.transfer_id {
            warn!(
                "Discarding stale verify-pin response for {} (active: {})",
                record.transfer_id, attempt.transfer_id
            );
            return Err(VoiceBankError::TransferNotFound);
        }

        let attempt = self.attempt.as_mut().expect("checked above");
        debug_assert!(attempt.status.can_advance_to(TransferStatus::PinVerified));
        attempt.status = TransferStatus::PinVerified;
        info!("Transfer {} PIN verified", attempt.transfer_id);

        Ok(self.attempt.as_ref().expect("just updated"))
    }

    /// Commit the transfer; funds move on the remote ledger
    ///
    /// Only reachable after PIN verification. Confirming from `initiated` is
    /// a precondition error, never a silent success.
    pub async fn confirm(&mut self) -> VoiceResult<TransferReceipt> {
        let attempt = self.attempt.as_ref().ok_or(VoiceBankError::TransferNotFound)?;
        if attempt.status != TransferStatus::PinVerified {
            return Err(VoiceBankError::Precondition {
                expected: TransferStatus::PinVerified,
                actual: attempt.status,
            });
        }

        match self.bank.confirm_transfer(&attempt.transfer_id).await {
            Ok(record) => {
                let attempt = self.attempt.take().expect("checked above");
                info!(
                    "Transfer {} confirmed (ref {:?})",
                    attempt.transfer_id, record.transaction_ref
                );
                Ok(TransferReceipt {
                    transfer_id: attempt.transfer_id,
                    status: TransferStatus::Confirmed,
                    transaction_ref: record.transaction_ref,
                    new_balance: record.new_balance,
                    completed_at: Utc::now(),
                })
            }
            Err(e @ (VoiceBankError::TransferExpired | VoiceBankError::AlreadyConfirmed)) => {
                // The attempt can never complete; keep it around as failed
                // for display until an explicit reset.
                let attempt = self.attempt.as_mut().expect("checked above");
                attempt.status = TransferStatus::Failed;
                warn!("Transfer {} failed to confirm: {}", attempt.transfer_id, e);
                Err(e)
            }
            // Transport failures leave the attempt in its last confirmed
            // state; a retry is a user-initiated re-press.
            Err(e) => Err(e),
        }
    }

    /// Cancel the active attempt; no funds move
    ///
    /// Valid from `initiated` and `pin_verified`. With no active attempt the
    /// caller gets `TransferNotFound` to report, not a crash.
    pub async fn cancel(&mut self) -> VoiceResult<TransferReceipt> {
        let attempt = self.attempt.as_ref().ok_or(VoiceBankError::TransferNotFound)?;
        if attempt.status.is_terminal() {
            return Err(VoiceBankError::Precondition {
                expected: TransferStatus::Initiated,
                actual: attempt.status,
            });
        }

        self.bank.cancel_transfer(&attempt.transfer_id).await?;

        let attempt = self.attempt.take().expect("checked above");
        info!("Transfer {} cancelled", attempt.transfer_id);

        Ok(TransferReceipt {
            transfer_id: attempt.transfer_id,
            status: TransferStatus::Cancelled,
            transaction_ref: None,
            new_balance: None,
            completed_at: Utc::now(),
        })
    }

    /// Drop any attempt and return to idle. Never fails.
    pub fn reset(&mut self) {
        if let Some(attempt) = self.attempt.take() {
            info!("Transfer {} discarded by reset", attempt.transfer_id);
        }
    }
}
