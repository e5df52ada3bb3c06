//! Wire shapes for the remote voice-banking API, and their normalization
//! into the canonical types the rest of the crate consumes.
//!
//! The remote endpoints are not perfectly uniform: audio and text variants
//! disagree on field names (`response_audio` vs `audio_base64`), transfer
//! statuses come back in several spellings (`pending_pin` vs `initiated`),
//! and some deployments wrap bodies in a `{success, data, error}` envelope
//! while others return the entity flat. Everything is folded into one shape
//! here, at the boundary, before it reaches the state machine.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{VoiceBankError, VoiceResult};
use crate::transfer::{Recipient, TransferStatus};

// ============================================================================
// Error envelope
// ============================================================================

/// Structured rejection body: `{"error": {"code", "message", "attempts_remaining"}}`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub code: Option<String>,
    pub message: Option<String>,
    pub attempts_remaining: Option<u32>,
}

impl ApiErrorBody {
    /// Map a remote rejection onto the crate error taxonomy by its code
    pub fn into_error(self) -> VoiceBankError {
        let message = self
            .message
            .clone()
            .unwrap_or_else(|| "request rejected".to_string());

        match self.code.as_deref() {
            Some("INVALID_PIN") => VoiceBankError::InvalidPin {
                attempts_remaining: self.attempts_remaining,
            },
            Some("RECIPIENT_NOT_FOUND") => VoiceBankError::RecipientNotFound(message),
            Some("TRANSFER_NOT_FOUND") => VoiceBankError::TransferNotFound,
            Some("TRANSFER_EXPIRED") => VoiceBankError::TransferExpired,
            Some("ALREADY_CONFIRMED") => VoiceBankError::AlreadyConfirmed,
            Some("INSUFFICIENT_FUNDS") => VoiceBankError::InsufficientFunds,
            Some("INVALID_AMOUNT") => VoiceBankError::Validation(message),
            _ => VoiceBankError::Remote(message),
        }
    }
}

/// Response envelope used by the hosted deployment; `data` may be absent when
/// the backend returns the entity flat
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub success: Option<bool>,
    pub data: Option<T>,
    pub error: Option<ApiErrorBody>,
}

impl<T> Envelope<T> {
    /// Unwrap the payload, converting a rejection envelope into a typed error
    pub fn into_data(self) -> VoiceResult<T> {
        if let Some(err) = self.error {
            return Err(err.into_error());
        }
        if self.success == Some(false) {
            return Err(VoiceBankError::Remote("request was not successful".to_string()));
        }
        self.data
            .ok_or_else(|| VoiceBankError::Remote("response carried no data".to_string()))
    }
}

// ============================================================================
// Transfers and recipients
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RecipientWire {
    #[serde(alias = "recipient_id")]
    pub id: Option<String>,
    pub name: String,
    pub account_number: String,
    #[serde(default)]
    pub bank_name: String,
}

impl RecipientWire {
    pub fn normalize(self) -> Recipient {
        Recipient {
            // Some endpoints embed the recipient without its id; fall back to
            // the account number, which is what the transfer is keyed on.
            id: self.id.unwrap_or_else(|| self.account_number.clone()),
            name: self.name,
            account_number: self.account_number,
            bank_name: self.bank_name,
        }
    }
}

/// Recipient search payload
///
/// The endpoint also reports a match-type hint, but zero/one/many is
/// re-derived client-side from the list itself so a stale hint can never
/// disagree with the candidates shown.
#[derive(Debug, Deserialize)]
pub struct RecipientPageWire {
    #[serde(default)]
    pub recipients: Vec<RecipientWire>,
}

impl RecipientPageWire {
    pub fn normalize(self) -> Vec<Recipient> {
        self.recipients.into_iter().map(RecipientWire::normalize).collect()
    }
}

/// Transfer entity as returned by initiate / verify-pin / confirm / cancel
#[derive(Debug, Deserialize)]
pub struct TransferWire {
    #[serde(alias = "transaction_id")]
    pub transfer_id: String,
    pub status: String,
    pub recipient: Option<RecipientWire>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub current_balance: Option<f64>,
    pub new_balance: Option<f64>,
    pub transaction_ref: Option<String>,
    pub message: Option<String>,
}

/// Canonical transfer record after boundary normalization
#[derive(Debug, Clone)]
pub struct TransferRecord {
    pub transfer_id: String,
    pub status: TransferStatus,
    pub recipient: Option<Recipient>,
    pub amount: Option<f64>,
    pub currency: String,
    pub current_balance: Option<f64>,
    pub new_balance: Option<f64>,
    pub transaction_ref: Option<String>,
    pub message: Option<String>,
}

impl TransferWire {
    pub fn normalize(self) -> VoiceResult<TransferRecord> {
        Ok(TransferRecord {
            transfer_id: self.transfer_id,
            status: parse_status(&self.status)?,
            recipient: self.recipient.map(RecipientWire::normalize),
            amount: self.amount,
            currency: self.currency.unwrap_or_else(|| "NGN".to_string()),
            current_balance: self.current_balance,
            new_balance: self.new_balance,
            transaction_ref: self.transaction_ref,
            message: self.message,
        })
    }
}

/// Map the remote status spellings onto the canonical lattice
fn parse_status(wire: &str) -> VoiceResult<TransferStatus> {
    match wire {
        "initiated" | "pending_pin" => Ok(TransferStatus::Initiated),
        "pin_verified" | "pending_confirmation" => Ok(TransferStatus::PinVerified),
        "confirmed" | "completed" => Ok(TransferStatus::Confirmed),
        "cancelled" | "canceled" => Ok(TransferStatus::Cancelled),
        "failed" => Ok(TransferStatus::Failed),
        other => Err(VoiceBankError::Remote(format!(
            "unknown transfer status '{other}'"
        ))),
    }
}

#[derive(Debug, Deserialize)]
pub struct BalanceWire {
    pub balance: f64,
    pub currency: Option<String>,
}

// ============================================================================
// Voice processing
// ============================================================================

/// The classified purpose of a user utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Transfer,
    CheckBalance,
    Confirm,
    ProvidePin,
    Cancel,
    StartOver,
    AddRecipient,
    Unknown(String),
}

impl Intent {
    pub fn parse(tag: &str) -> Self {
        match tag {
            "transfer" => Intent::Transfer,
            "check_balance" => Intent::CheckBalance,
            "confirm" => Intent::Confirm,
            "provide_pin" => Intent::ProvidePin,
            "cancel" => Intent::Cancel,
            "start_over" => Intent::StartOver,
            "add_recipient" => Intent::AddRecipient,
            other => Intent::Unknown(other.to_string()),
        }
    }

    /// Display tag for the conversation log
    pub fn tag(&self) -> &str {
        match self {
            Intent::Transfer => "transfer",
            Intent::CheckBalance => "check_balance",
            Intent::Confirm => "confirm",
            Intent::ProvidePin => "provide_pin",
            Intent::Cancel => "cancel",
            Intent::StartOver => "start_over",
            Intent::AddRecipient => "add_recipient",
            Intent::Unknown(tag) => tag,
        }
    }
}

/// Entities extracted alongside an intent classification
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntentEntities {
    pub recipient: Option<String>,
    pub amount: Option<f64>,
}

/// Voice processing endpoint response as it appears on the wire
#[derive(Debug, Deserialize)]
pub struct VoiceResponseWire {
    pub success: bool,
    pub session_id: String,
    pub intent: Option<String>,
    pub response_text: Option<String>,
    #[serde(alias = "audio_base64")]
    pub response_audio: Option<String>,
    pub transcript: Option<String>,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
}

/// Canonical voice reply after boundary normalization
#[derive(Debug, Clone)]
pub struct VoiceReply {
    pub session_id: String,
    pub success: bool,
    /// What the user said, as transcribed by the remote system
    pub transcript: Option<String>,
    pub intent: Intent,
    pub entities: IntentEntities,
    /// What the assistant says back
    pub response_text: String,
    /// Decoded reply waveform (WAV or MP3, provider-dependent)
    pub audio: Option<Vec<u8>>,
}

impl VoiceResponseWire {
    pub fn normalize(self) -> VoiceReply {
        // Transcript lives at the top level on some endpoint variants and
        // under `data` on others.
        let transcript = self.transcript.or_else(|| {
            self.data
                .as_ref()
                .and_then(|d| d.get("transcript"))
                .and_then(|t| t.as_str())
                .map(str::to_string)
        });

        let entities = self
            .data
            .as_ref()
            .and_then(|d| d.get("entities"))
            .map(|e| IntentEntities {
                recipient: e
                    .get("recipient")
                    .and_then(|r| r.as_str())
                    .map(str::to_string),
                amount: e.get("amount").and_then(|a| a.as_f64()),
            })
            .unwrap_or_default();

        let audio = self.response_audio.and_then(|b64| match BASE64.decode(&b64) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("Discarding undecodable reply audio: {}", e);
                None
            }
        });

        VoiceReply {
            session_id: self.session_id,
            success: self.success,
            transcript,
            intent: self
                .intent
                .as_deref()
                .map(Intent::parse)
                .unwrap_or_else(|| Intent::Unknown("unclassified".to_string())),
            entities,
            response_text: self
                .response_text
                .or(self.error)
                .unwrap_or_else(|| "Sorry, something went wrong. Please try again.".to_string()),
            audio,
        }
    }
}

/// Request body for the text variant of the voice endpoint
#[derive(Debug, Serialize)]
pub struct VoiceTextRequest<'a> {
    pub text: &'a str,
    pub account_number: &'a str,
    pub session_id: &'a str,
    pub include_audio: bool,
}
