// Shared test doubles: an in-memory bank, a scripted voice endpoint, and a
// fake capture backend.
//
// MockBank mirrors the demo ledger the real backend seeds: one well-known
// recipient, a 45,320 NGN balance, PIN 1234 accepted.

#![allow(dead_code)]

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc;

use echobank_voice::api::types::{IntentEntities, VoiceReply};
use echobank_voice::{
    AudioBackend, AudioClip, AudioFrame, BankApi, Intent, Recipient, TransferRecord,
    TransferStatus, VoiceApi, VoiceBankError, VoiceResult, VoiceSession,
};

pub const DEMO_BALANCE: f64 = 45_320.0;
pub const CORRECT_PIN: &str = "1234";

pub fn john_okafor() -> Recipient {
    Recipient {
        id: "rcp_001".to_string(),
        name: "John Okafor".to_string(),
        account_number: "0123456789".to_string(),
        bank_name: "Zenith Bank".to_string(),
    }
}

pub fn mary_adewale() -> Recipient {
    Recipient {
        id: "rcp_002".to_string(),
        name: "Mary Adewale".to_string(),
        account_number: "0234567890".to_string(),
        bank_name: "GTBank".to_string(),
    }
}

pub fn john_adeyemi() -> Recipient {
    Recipient {
        id: "rcp_003".to_string(),
        name: "John Adeyemi".to_string(),
        account_number: "0345678901".to_string(),
        bank_name: "Access Bank".to_string(),
    }
}

/// In-memory stand-in for the remote banking side
pub struct MockBank {
    pub recipients: Vec<Recipient>,
    pub balance: f64,

    records: Mutex<HashMap<String, TransferRecord>>,
    next_transfer: AtomicUsize,
    attempts_remaining: AtomicU32,

    /// Every call fails with a transport error while set
    pub offline: AtomicBool,
    /// Confirm fails with `TransferExpired` while set
    pub expire_on_confirm: AtomicBool,

    pub search_calls: AtomicUsize,
    pub initiate_calls: AtomicUsize,
    pub pin_calls: AtomicUsize,
    pub confirm_calls: AtomicUsize,
    pub cancel_calls: AtomicUsize,
    pub balance_calls: AtomicUsize,
}

impl Default for MockBank {
    fn default() -> Self {
        Self {
            recipients: vec![john_okafor(), mary_adewale(), john_adeyemi()],
            balance: DEMO_BALANCE,
            records: Mutex::new(HashMap::new()),
            next_transfer: AtomicUsize::new(1),
            attempts_remaining: AtomicU32::new(3),
            offline: AtomicBool::new(false),
            expire_on_confirm: AtomicBool::new(false),
            search_calls: AtomicUsize::new(0),
            initiate_calls: AtomicUsize::new(0),
            pin_calls: AtomicUsize::new(0),
            confirm_calls: AtomicUsize::new(0),
            cancel_calls: AtomicUsize::new(0),
            balance_calls: AtomicUsize::new(0),
        }
    }
}

impl MockBank {
    pub fn with_recipients(recipients: Vec<Recipient>) -> Self {
        Self {
            recipients,
            ..Self::default()
        }
    }

    fn check_online(&self) -> VoiceResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(VoiceBankError::Network("connection refused".to_string()));
        }
        Ok(())
    }

    fn record(&self, transfer_id: &str) -> VoiceResult<TransferRecord> {
        self.records
            .lock()
            .unwrap()
            .get(transfer_id)
            .cloned()
            .ok_or(VoiceBankError::TransferNotFound)
    }

    fn store(&self, record: TransferRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.transfer_id.clone(), record);
    }
}

#[async_trait::async_trait]
impl BankApi for MockBank {
    async fn search_recipients(&self, name: &str, limit: usize) -> VoiceResult<Vec<Recipient>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;

        let needle = name.to_lowercase();
        Ok(self
            .recipients
            .iter()
            .filter(|r| r.name.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn initiate_transfer(
        &self,
        recipient_id: &str,
        amount: f64,
        _session_id: &str,
    ) -> VoiceResult<TransferRecord> {
        self.initiate_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;

        if amount > self.balance {
            return Err(VoiceBankError::InsufficientFunds);
        }
        let recipient = self
            .recipients
            .iter()
            .find(|r| r.id == recipient_id)
            .cloned()
            .ok_or_else(|| VoiceBankError::RecipientNotFound(recipient_id.to_string()))?;

        let n = self.next_transfer.fetch_add(1, Ordering::SeqCst);
        let record = TransferRecord {
            transfer_id: format!("tr_{n:03}"),
            status: TransferStatus::Initiated,
            recipient: Some(recipient),
            amount: Some(amount),
            currency: "NGN".to_string(),
            current_balance: Some(self.balance),
            new_balance: Some(self.balance - amount),
            transaction_ref: None,
            message: Some("Transfer initiated. PIN required.".to_string()),
        };
        self.store(record.clone());
        Ok(record)
    }

    async fn verify_pin(&self, transfer_id: &str, pin: &str) -> VoiceResult<TransferRecord> {
        self.pin_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;

        let mut record = self.record(transfer_id)?;
        if pin != CORRECT_PIN {
            let left = self
                .attempts_remaining
                .fetch_sub(1, Ordering::SeqCst)
                .saturating_sub(1);
            return Err(VoiceBankError::InvalidPin {
                attempts_remaining: Some(left),
            });
        }

        record.status = TransferStatus::PinVerified;
        self.store(record.clone());
        Ok(record)
    }

    async fn confirm_transfer(&self, transfer_id: &str) -> VoiceResult<TransferRecord> {
        self.confirm_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;

        if self.expire_on_confirm.load(Ordering::SeqCst) {
            return Err(VoiceBankError::TransferExpired);
        }

        let mut record = self.record(transfer_id)?;
        if record.status == TransferStatus::Confirmed {
            return Err(VoiceBankError::AlreadyConfirmed);
        }
        record.status = TransferStatus::Confirmed;
        record.transaction_ref = Some(format!("TXN-{}", transfer_id.to_uppercase()));
        self.store(record.clone());
        Ok(record)
    }

    async fn cancel_transfer(&self, transfer_id: &str) -> VoiceResult<TransferRecord> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;

        let mut record = self.record(transfer_id)?;
        record.status = TransferStatus::Cancelled;
        record.message = Some("Transfer cancelled".to_string());
        self.store(record.clone());
        Ok(record)
    }

    async fn fetch_balance(&self, _account_number: &str) -> VoiceResult<f64> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        Ok(self.balance)
    }
}

/// Scripted stand-in for the voice-processing side: replies are queued up
/// front by each test and popped one per turn
#[derive(Default)]
pub struct MockVoice {
    replies: Mutex<VecDeque<VoiceReply>>,
    pub audio_calls: AtomicUsize,
    pub text_calls: AtomicUsize,
}

impl MockVoice {
    pub fn queue(&self, reply: VoiceReply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    fn pop(&self) -> VoiceResult<VoiceReply> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| VoiceBankError::Remote("no scripted reply left".to_string()))
    }
}

#[async_trait::async_trait]
impl VoiceApi for MockVoice {
    async fn process_audio(
        &self,
        _session: &VoiceSession,
        _clip: &AudioClip,
    ) -> VoiceResult<VoiceReply> {
        self.audio_calls.fetch_add(1, Ordering::SeqCst);
        self.pop()
    }

    async fn process_text(&self, _session: &VoiceSession, _text: &str) -> VoiceResult<VoiceReply> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        self.pop()
    }

    async fn synthesize(&self, _text: &str) -> VoiceResult<Vec<u8>> {
        Ok(vec![0u8; 64])
    }
}

/// Build a reply as the voice endpoint would hand it back, for a given
/// session and classified intent
pub fn scripted_reply(
    session_id: &str,
    transcript: &str,
    intent: Intent,
    entities: IntentEntities,
) -> VoiceReply {
    VoiceReply {
        session_id: session_id.to_string(),
        success: true,
        transcript: Some(transcript.to_string()),
        intent,
        entities,
        response_text: String::new(),
        audio: None,
    }
}

pub fn transfer_entities(recipient: &str, amount: f64) -> IntentEntities {
    IntentEntities {
        recipient: Some(recipient.to_string()),
        amount: Some(amount),
    }
}

/// Lifecycle observations shared between a `FakeBackend` and the test that
/// handed it over
#[derive(Default)]
pub struct BackendProbe {
    pub capturing: AtomicBool,
    pub start_calls: AtomicUsize,
    pub stop_calls: AtomicUsize,
}

/// Capture backend that synthesizes a fixed number of frames and tracks
/// lifecycle calls through a shared probe
pub struct FakeBackend {
    pub frames: usize,
    pub samples_per_frame: usize,
    pub deny_permission: bool,
    pub probe: std::sync::Arc<BackendProbe>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            frames: 4,
            samples_per_frame: 160,
            deny_permission: false,
            probe: std::sync::Arc::new(BackendProbe::default()),
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for FakeBackend {
    async fn start(&mut self) -> VoiceResult<mpsc::Receiver<AudioFrame>> {
        self.probe.start_calls.fetch_add(1, Ordering::SeqCst);
        if self.deny_permission {
            return Err(VoiceBankError::PermissionDenied(
                "microphone access denied".to_string(),
            ));
        }

        let (tx, rx) = mpsc::channel(self.frames.max(1));
        for i in 0..self.frames {
            let frame = AudioFrame {
                samples: vec![(i as i16 + 1) * 100; self.samples_per_frame],
                sample_rate: 16000,
                channels: 1,
                timestamp_ms: (i as u64) * 10,
            };
            // Channel capacity covers every frame; this cannot block.
            tx.send(frame).await.ok();
        }
        // Dropping the sender ends the stream once the frames are drained.
        self.probe.capturing.store(true, Ordering::SeqCst);
        Ok(rx)
    }

    async fn stop(&mut self) -> VoiceResult<()> {
        self.probe.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.probe.capturing.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.probe.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "fake"
    }
}
