pub mod client;
pub mod gateway;
pub mod types;

pub use client::HttpGateway;
pub use gateway::{BankApi, VoiceApi};
pub use types::{
    Intent, IntentEntities, TransferRecord, VoiceReply, VoiceResponseWire, VoiceTextRequest,
};
