use thiserror::Error;

use crate::transfer::TransferStatus;

/// Result type alias for voice-banking operations
pub type VoiceResult<T> = Result<T, VoiceBankError>;

/// Errors that can occur in the voice-banking client core
///
/// Business-rule rejections (`InvalidPin`, `RecipientNotFound`, ...) come back
/// from the remote system and are usually surfaced as assistant messages in
/// the conversation rather than aborting the exchange. Transport and
/// validation failures are surfaced to the caller directly.
#[derive(Error, Debug)]
pub enum VoiceBankError {
    #[error("microphone permission denied: {0}")]
    PermissionDenied(String),

    #[error("audio capture error: {0}")]
    Capture(String),

    #[error("a recording is already in progress")]
    AlreadyRecording,

    #[error("network failure: {0}")]
    Network(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(f64),

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("incorrect PIN")]
    InvalidPin { attempts_remaining: Option<u32> },

    #[error("no recipient found matching '{0}'")]
    RecipientNotFound(String),

    #[error("transfer not found")]
    TransferNotFound,

    #[error("transfer has expired")]
    TransferExpired,

    #[error("transfer already confirmed")]
    AlreadyConfirmed,

    #[error("another transfer is already in progress")]
    TransferInProgress,

    #[error("transfer is {actual}, expected {expected}")]
    Precondition {
        expected: TransferStatus,
        actual: TransferStatus,
    },

    #[error("audio playback error: {0}")]
    Playback(String),

    #[error("remote system rejected the request: {0}")]
    Remote(String),
}

impl From<reqwest::Error> for VoiceBankError {
    fn from(err: reqwest::Error) -> Self {
        VoiceBankError::Network(err.to_string())
    }
}
