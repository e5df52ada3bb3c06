use crate::api::types::{TransferRecord, VoiceReply};
use crate::audio::AudioClip;
use crate::error::VoiceResult;
use crate::session::VoiceSession;
use crate::transfer::Recipient;

/// Voice-processing side of the remote collaborator: speech in, reply out
///
/// Implementations normalize the wire shapes before returning; nothing
/// downstream of this trait sees raw response bodies.
#[async_trait::async_trait]
pub trait VoiceApi: Send + Sync {
    /// Upload a finished clip for transcription, intent classification, and
    /// a spoken reply
    async fn process_audio(
        &self,
        session: &VoiceSession,
        clip: &AudioClip,
    ) -> VoiceResult<VoiceReply>;

    /// Text variant of the same contract, without the transcription step
    async fn process_text(&self, session: &VoiceSession, text: &str) -> VoiceResult<VoiceReply>;

    /// Synthesize a standalone reply waveform
    async fn synthesize(&self, text: &str) -> VoiceResult<Vec<u8>>;
}

/// Banking side of the remote collaborator: recipients, transfers, balances
///
/// The ledger is owned entirely by the remote system; these calls report
/// state, they do not compute it.
#[async_trait::async_trait]
pub trait BankApi: Send + Sync {
    async fn search_recipients(&self, name: &str, limit: usize) -> VoiceResult<Vec<Recipient>>;

    async fn initiate_transfer(
        &self,
        recipient_id: &str,
        amount: f64,
        session_id: &str,
    ) -> VoiceResult<TransferRecord>;

    async fn verify_pin(&self, transfer_id: &str, pin: &str) -> VoiceResult<TransferRecord>;

    async fn confirm_transfer(&self, transfer_id: &str) -> VoiceResult<TransferRecord>;

    async fn cancel_transfer(&self, transfer_id: &str) -> VoiceResult<TransferRecord>;

    async fn fetch_balance(&self, account_number: &str) -> VoiceResult<f64>;
}
