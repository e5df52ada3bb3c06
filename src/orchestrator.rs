//! The per-app orchestrator: wires capture, session, transfer state,
//! conversation log and playback together in response to intent
//! classification.
//!
//! Every mutating operation takes `&mut self`, so transitions for one
//! session are serialized by construction: a second transition cannot start
//! while one is awaiting the network. Replies carrying a session id other
//! than the current one are discarded as stale.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::gateway::{BankApi, VoiceApi};
use crate::api::types::{Intent, IntentEntities, VoiceReply};
use crate::audio::{CaptureController, PlaybackController};
use crate::conversation::{ConversationEntry, ConversationLog};
use crate::error::{VoiceBankError, VoiceResult};
use crate::session::VoiceSession;
use crate::transfer::{Recipient, RecipientMatch, TransferFlow, TransferReceipt, TransferStatus};

/// Explicit configuration injected at construction; no ambient globals
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub recipient_search_limit: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            recipient_search_limit: 5,
        }
    }
}

/// Candidates parked while the user picks between ambiguous recipients
struct PendingSelection {
    candidates: Vec<Recipient>,
    amount: f64,
}

pub struct Orchestrator {
    config: OrchestratorConfig,
    voice: Arc<dyn VoiceApi>,
    bank: Arc<dyn BankApi>,
    session: VoiceSession,
    flow: TransferFlow,
    log: ConversationLog,
    capture: Option<CaptureController>,
    playback: Option<PlaybackController>,
    pending_selection: Option<PendingSelection>,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        voice: Arc<dyn VoiceApi>,
        bank: Arc<dyn BankApi>,
        session: VoiceSession,
    ) -> Self {
        let flow = TransferFlow::new(Arc::clone(&bank), session.id());
        Self {
            config,
            voice,
            bank,
            session,
            flow,
            log: ConversationLog::new(),
            capture: None,
            playback: None,
            pending_selection: None,
        }
    }

    pub fn with_capture(mut self, capture: CaptureController) -> Self {
        self.capture = Some(capture);
        self
    }

    pub fn with_playback(mut self, playback: PlaybackController) -> Self {
        self.playback = Some(playback);
        self
    }

    pub fn session(&self) -> &VoiceSession {
        &self.session
    }

    pub fn conversation(&self) -> &[ConversationEntry] {
        self.log.entries()
    }

    pub fn transfer_status(&self) -> Option<TransferStatus> {
        self.flow.status()
    }

    /// Begin a fresh interaction window: new session id, idle state machine,
    /// empty conversation. Any in-flight reply for the old session will be
    /// discarded when it arrives.
    pub fn start_new_session(&mut self) {
        self.session = VoiceSession::new(self.session.account_number());
        self.flow = TransferFlow::new(Arc::clone(&self.bank), self.session.id());
        self.pending_selection = None;
        self.log.clear();
        info!("New voice session: {}", self.session.id());
    }

    pub fn clear_conversation(&mut self) {
        self.log.clear();
    }

    /// Start capturing a voice command
    pub async fn start_recording(&mut self) -> VoiceResult<()> {
        // Talking over the assistant interrupts it.
        if let Some(playback) = &self.playback {
            playback.interrupt();
        }

        let capture = self.capture.as_mut().ok_or_else(|| {
            VoiceBankError::Capture("no capture controller configured".to_string())
        })?;
        capture.start_recording().await
    }

    /// Stop capturing, upload the finished clip, and handle the reply
    ///
    /// Exactly one upload happens per completed recording; a stop with no
    /// active recording does nothing.
    pub async fn finish_recording(&mut self) -> VoiceResult<()> {
        let capture = self.capture.as_mut().ok_or_else(|| {
            VoiceBankError::Capture("no capture controller configured".to_string())
        })?;

        let Some(clip) = capture.stop_recording().await? else {
            return Ok(());
        };

        let reply = self.voice.process_audio(&self.session, &clip).await?;
        self.handle_reply(reply).await
    }

    /// Run a text command through the same pipeline as a voice turn
    pub async fn process_text(&mut self, text: &str) -> VoiceResult<()> {
        let reply = self.voice.process_text(&self.session, text).await?;
        self.handle_reply(reply).await
    }

    /// Apply a normalized reply: log the exchange, dispatch the intent, and
    /// speak the response
    pub async fn handle_reply(&mut self, reply: VoiceReply) -> VoiceResult<()> {
        if reply.session_id != self.session.id() {
            debug!(
                "Discarding stale reply for session {} (current: {})",
                reply.session_id,
                self.session.id()
            );
            return Ok(());
        }

        if let Some(transcript) = &reply.transcript {
            self.log
                .push_user(transcript.clone(), Some(reply.intent.tag().to_string()));
        }

        let message = self
            .dispatch(&reply.intent, &reply.entities, reply.transcript.as_deref())
            .await?;
        self.log.push_assistant(message);

        if let (Some(playback), Some(audio)) = (&self.playback, &reply.audio) {
            playback.play(audio);
        }

        Ok(())
    }

    /// Map a classified intent to the correct state-machine operation and
    /// produce the assistant's reply
    async fn dispatch(
        &mut self,
        intent: &Intent,
        entities: &IntentEntities,
        transcript: Option<&str>,
    ) -> VoiceResult<String> {
        match intent {
            Intent::Transfer => self.dispatch_transfer(entities).await,

            Intent::CheckBalance => match self.bank.fetch_balance(self.session.account_number()).await {
                Ok(balance) => Ok(format!("Your account balance is {balance:.2} NGN.")),
                Err(e) => absorb(e),
            },

            Intent::Confirm => match self.flow.status() {
                Some(TransferStatus::PinVerified) => match self.flow.confirm().await {
                    Ok(receipt) => Ok(confirmation_message(&receipt)),
                    Err(e) => absorb(e),
                },
                Some(TransferStatus::Initiated) => {
                    Ok("Please say your 4-digit PIN first.".to_string())
                }
                _ => Ok("There's nothing to confirm. Would you like to make a transfer?".to_string()),
            },

            Intent::ProvidePin => match self.flow.status() {
                Some(TransferStatus::Initiated) => {
                    let pin: String = transcript
                        .unwrap_or_default()
                        .chars()
                        .filter(|c| c.is_ascii_digit())
                        .collect();
                    match self.flow.verify_pin(&pin).await {
                        Ok(_) => {
                            Ok("PIN verified. Say 'confirm' to complete the transfer.".to_string())
                        }
                        Err(VoiceBankError::Validation(_)) => {
                            Ok("I need your 4-digit PIN to continue.".to_string())
                        }
                        Err(e) => absorb(e),
                    }
                }
                Some(TransferStatus::PinVerified) => Ok(
                    "Your PIN is already verified. Say 'confirm' to complete the transfer."
                        .to_string(),
                ),
                _ => Ok("No pending transfer found. Please start a new transfer.".to_string()),
            },

            Intent::Cancel => {
                // A terminal attempt is only kept for display; there is
                // nothing left to call off.
                if self.flow.attempt().map_or(true, |a| a.status.is_terminal()) {
                    return Ok("There's nothing to cancel.".to_string());
                }
                match self.flow.cancel().await {
                    Ok(_) => Ok("Transfer cancelled. No money was sent.".to_string()),
                    Err(e) => absorb(e),
                }
            }

            Intent::StartOver => {
                if self.flow.attempt().map(|a| !a.status.is_terminal()) == Some(true) {
                    if let Err(e) = self.flow.cancel().await {
                        warn!("Best-effort cancel during start-over failed: {}", e);
                    }
                }
                self.flow.reset();
                self.pending_selection = None;
                Ok("Okay, let's start over. What would you like to do? You can check your balance or send money.".to_string())
            }

            Intent::AddRecipient => Ok(
                "To add a new recipient, please use the 'Add Recipient' option in your app. Then you can send money to them by voice."
                    .to_string(),
            ),

            Intent::Unknown(tag) => {
                debug!("Unsupported intent '{}'", tag);
                Ok("Sorry, I can't help with that yet. You can say things like 'check my balance' or 'send 5000 to John'.".to_string())
            }
        }
    }

    async fn dispatch_transfer(&mut self, entities: &IntentEntities) -> VoiceResult<String> {
        let (Some(name), Some(amount)) = (entities.recipient.as_deref(), entities.amount) else {
            // Missing entities: ask the user to repeat, no state change.
            return Ok(
                "I can help you with that transfer. Who would you like to send money to, and how much?"
                    .to_string(),
            );
        };

        // A new transfer request supersedes any parked disambiguation.
        self.pending_selection = None;

        let matched = match self
            .flow
            .search_recipient(name, self.config.recipient_search_limit)
            .await
        {
            Ok(matched) => matched,
            Err(e) => return absorb(e),
        };

        match matched {
            RecipientMatch::Single(recipient) => self.initiate_with(recipient, amount).await,

            RecipientMatch::Multiple(candidates) => {
                let listing = candidates
                    .iter()
                    .enumerate()
                    .map(|(i, r)| format!("{}. {} ({})", i + 1, r.name, r.bank_name))
                    .collect::<Vec<_>>()
                    .join(", ");
                let message = format!(
                    "I found {} recipients matching {}: {}. Which one did you mean?",
                    candidates.len(),
                    name,
                    listing
                );
                self.pending_selection = Some(PendingSelection { candidates, amount });
                Ok(message)
            }

            RecipientMatch::None => Ok(format!(
                "I couldn't find {name} in your recipients. Would you like to add them first?"
            )),
        }
    }

    async fn initiate_with(&mut self, recipient: Recipient, amount: f64) -> VoiceResult<String> {
        match self.flow.initiate(&recipient, amount).await {
            Ok(attempt) => Ok(format!(
                "Sending {:.2} {} to {}. Please say your 4-digit PIN.",
                attempt.amount, attempt.currency, attempt.recipient.name
            )),
            Err(e @ VoiceBankError::InvalidAmount(_)) => {
                Ok(format!("{e}. Please tell me a positive amount."))
            }
            Err(e) => absorb(e),
        }
    }

    /// Resume a transfer parked on recipient disambiguation (zero-based
    /// index into the candidates previously listed)
    pub async fn select_recipient(&mut self, index: usize) -> VoiceResult<()> {
        let pending = self
            .pending_selection
            .take()
            .ok_or_else(|| VoiceBankError::Validation("no selection is pending".to_string()))?;

        let Some(recipient) = pending.candidates.get(index).cloned() else {
            let len = pending.candidates.len();
            self.pending_selection = Some(pending);
            return Err(VoiceBankError::Validation(format!(
                "selection {index} is out of range (0..{len})"
            )));
        };

        let message = self.initiate_with(recipient, pending.amount).await?;
        self.log.push_assistant(message);
        Ok(())
    }

    pub fn has_pending_selection(&self) -> bool {
        self.pending_selection.is_some()
    }

    /// UI-driven PIN entry (keyed in rather than spoken)
    ///
    /// Format problems surface immediately as errors; a remote rejection
    /// becomes an assistant message so the conversation keeps flowing.
    pub async fn submit_pin(&mut self, pin: &str) -> VoiceResult<()> {
        match self.flow.verify_pin(pin).await {
            Ok(_) => {
                self.log
                    .push_assistant("PIN verified. Say 'confirm' to complete the transfer.");
                Ok(())
            }
            Err(e) => match failure_message(&e) {
                Some(message) => {
                    self.log.push_assistant(message);
                    Ok(())
                }
                None => Err(e),
            },
        }
    }

    /// UI-driven confirmation of a PIN-verified transfer
    pub async fn confirm_transfer(&mut self) -> VoiceResult<Option<TransferReceipt>> {
        match self.flow.confirm().await {
            Ok(receipt) => {
                self.log.push_assistant(confirmation_message(&receipt));
                Ok(Some(receipt))
            }
            Err(e) => match failure_message(&e) {
                Some(message) => {
                    self.log.push_assistant(message);
                    Ok(None)
                }
                None => Err(e),
            },
        }
    }

    /// UI-driven cancellation; reports "nothing to cancel" when idle or when
    /// the attempt already reached a terminal state
    pub async fn cancel_transfer(&mut self) -> VoiceResult<Option<TransferReceipt>> {
        if self.flow.attempt().map_or(true, |a| a.status.is_terminal()) {
            self.log.push_assistant("There's nothing to cancel.");
            return Ok(None);
        }
        match self.flow.cancel().await {
            Ok(receipt) => {
                self.log
                    .push_assistant("Transfer cancelled. No money was sent.");
                Ok(Some(receipt))
            }
            Err(e) => match failure_message(&e) {
                Some(message) => {
                    self.log.push_assistant(message);
                    Ok(None)
                }
                None => Err(e),
            },
        }
    }

    /// Drop any transfer attempt and return the machine to idle
    pub fn reset_transfer(&mut self) {
        self.flow.reset();
        self.pending_selection = None;
    }

    /// Stop the assistant mid-sentence
    pub fn interrupt_playback(&self) {
        if let Some(playback) = &self.playback {
            playback.interrupt();
        }
    }
}

fn confirmation_message(receipt: &TransferReceipt) -> String {
    let reference = receipt
        .transaction_ref
        .as_deref()
        .unwrap_or("unavailable");
    match receipt.new_balance {
        Some(balance) => format!(
            "Transfer successful! Reference {reference}. Your new balance is {balance:.2} NGN."
        ),
        None => format!("Transfer successful! Reference {reference}."),
    }
}

/// User-facing message for a remote rejection or transport failure, or None
/// when the error should propagate to the caller instead
fn failure_message(err: &VoiceBankError) -> Option<String> {
    match err {
        VoiceBankError::InvalidPin { attempts_remaining } => Some(match attempts_remaining {
            Some(n) => format!("Incorrect PIN. You have {n} attempts remaining."),
            None => "Incorrect PIN. Please try again.".to_string(),
        }),
        VoiceBankError::InsufficientFunds => {
            Some("You don't have enough funds for that transfer.".to_string())
        }
        VoiceBankError::RecipientNotFound(msg) => Some(msg.clone()),
        VoiceBankError::TransferNotFound => {
            Some("There's no transfer in progress.".to_string())
        }
        VoiceBankError::TransferExpired => {
            Some("That transfer has expired. Please start again.".to_string())
        }
        VoiceBankError::AlreadyConfirmed => {
            Some("That transfer was already confirmed.".to_string())
        }
        VoiceBankError::TransferInProgress => Some(
            "You already have a transfer in progress. Say 'cancel' to discard it first."
                .to_string(),
        ),
        VoiceBankError::Network(_) => {
            Some("I couldn't reach the bank. Please try again.".to_string())
        }
        VoiceBankError::Remote(_) => {
            Some("Sorry, something went wrong. Please try again.".to_string())
        }
        _ => None,
    }
}

/// Conversational absorption of a failure inside intent dispatch
fn absorb(err: VoiceBankError) -> VoiceResult<String> {
    match failure_message(&err) {
        Some(message) => Ok(message),
        None => Err(err),
    }
}
