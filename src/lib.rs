pub mod api;
pub mod audio;
pub mod config;
pub mod conversation;
pub mod error;
pub mod orchestrator;
pub mod session;
pub mod transfer;

pub use api::{BankApi, HttpGateway, Intent, IntentEntities, TransferRecord, VoiceApi, VoiceReply};
pub use audio::{
    AudioBackend, AudioClip, AudioFrame, CaptureConfig, CaptureController, MicBackend,
    PlaybackController,
};
pub use config::Config;
pub use conversation::{ConversationEntry, ConversationLog, Role};
pub use error::{VoiceBankError, VoiceResult};
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use session::VoiceSession;
pub use transfer::{
    Recipient, RecipientMatch, TransferAttempt, TransferFlow, TransferReceipt, TransferStatus,
};
