use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::api::gateway::{BankApi, VoiceApi};
use crate::api::types::{
    ApiErrorBody, BalanceWire, Envelope, RecipientPageWire, TransferRecord, TransferWire,
    VoiceReply, VoiceResponseWire, VoiceTextRequest,
};
use crate::audio::AudioClip;
use crate::config::ApiConfig;
use crate::error::{VoiceBankError, VoiceResult};
use crate::session::VoiceSession;
use crate::transfer::Recipient;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP implementation of the remote collaborator, speaking the pre-agreed
/// REST contract
///
/// Initiate and confirm calls carry an `Idempotency-Key` header naming each
/// submission, so the server can deduplicate a request delivered to it more
/// than once. The key is minted per call; a deliberate user re-press is a
/// new submission, guarded by the state machine's preconditions rather than
/// by this header.
pub struct HttpGateway {
    http: reqwest::Client,
    base_url: String,
    company_id: String,
    token: String,
    include_audio: bool,
}

impl HttpGateway {
    pub fn new(cfg: &ApiConfig) -> VoiceResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| VoiceBankError::Network(e.to_string()))?;

        info!("HTTP gateway ready: {}", cfg.base_url);

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            company_id: cfg.company_id.clone(),
            token: cfg.token.clone(),
            include_audio: cfg.include_audio,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the identifying headers every voice request carries
    fn identify(&self, req: reqwest::RequestBuilder, session: &VoiceSession) -> reqwest::RequestBuilder {
        req.header("account-number", session.account_number())
            .header("company-id", &self.company_id)
            .header("session-id", session.id())
            .header("token", &self.token)
    }

    async fn read_body<T: DeserializeOwned>(resp: reqwest::Response) -> VoiceResult<T> {
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(map_error_body(status, &body));
        }

        parse_flexible(&body)
    }
}

/// Parse a success body that may or may not be wrapped in the
/// `{success, data, error}` envelope
fn parse_flexible<T: DeserializeOwned>(body: &str) -> VoiceResult<T> {
    if let Ok(envelope) = serde_json::from_str::<Envelope<T>>(body) {
        if envelope.error.is_some() || envelope.data.is_some() {
            return envelope.into_data();
        }
    }

    serde_json::from_str::<T>(body)
        .map_err(|e| VoiceBankError::Remote(format!("malformed response body: {e}")))
}

/// Map a non-2xx body onto the error taxonomy
fn map_error_body(status: reqwest::StatusCode, body: &str) -> VoiceBankError {
    #[derive(Deserialize)]
    struct ErrorOuter {
        error: ApiErrorBody,
    }
    #[derive(Deserialize)]
    struct Detail {
        detail: String,
    }

    if let Ok(outer) = serde_json::from_str::<ErrorOuter>(body) {
        return outer.error.into_error();
    }
    if let Ok(detail) = serde_json::from_str::<Detail>(body) {
        return VoiceBankError::Remote(detail.detail);
    }
    if status.is_server_error() {
        return VoiceBankError::Network(format!("remote returned {status}"));
    }
    VoiceBankError::Remote(format!("remote returned {status}"))
}

#[async_trait::async_trait]
impl VoiceApi for HttpGateway {
    async fn process_audio(
        &self,
        session: &VoiceSession,
        clip: &AudioClip,
    ) -> VoiceResult<VoiceReply> {
        debug!(
            "Uploading clip: {}ms, {} bytes, session {}",
            clip.duration_ms(),
            clip.wav_bytes().len(),
            session.id()
        );

        let part = Part::bytes(clip.wav_bytes().to_vec())
            .file_name("recording.wav")
            .mime_str("audio/wav")
            .map_err(|e| VoiceBankError::Validation(e.to_string()))?;
        let form = Form::new().part("audio", part);

        let req = self
            .http
            .post(self.url("/api/v1/voice/process-audio"))
            .query(&[("include_audio", self.include_audio)])
            .multipart(form);

        let resp = self.identify(req, session).send().await?;
        let wire: VoiceResponseWire = Self::read_body(resp).await?;
        Ok(wire.normalize())
    }

    async fn process_text(&self, session: &VoiceSession, text: &str) -> VoiceResult<VoiceReply> {
        let body = VoiceTextRequest {
            text,
            account_number: session.account_number(),
            session_id: session.id(),
            include_audio: self.include_audio,
        };

        let req = self
            .http
            .post(self.url("/api/v1/voice/process-text"))
            .json(&body);

        let resp = self.identify(req, session).send().await?;
        let wire: VoiceResponseWire = Self::read_body(resp).await?;
        Ok(wire.normalize())
    }

    async fn synthesize(&self, text: &str) -> VoiceResult<Vec<u8>> {
        #[derive(Deserialize)]
        struct TtsWire {
            audio_base64: String,
        }

        let resp = self
            .http
            .post(self.url("/api/v1/voice/tts"))
            .header("company-id", &self.company_id)
            .header("token", &self.token)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await?;

        let wire: TtsWire = Self::read_body(resp).await?;

        use base64::Engine as _;
        base64::engine::general_purpose::STANDARD
            .decode(&wire.audio_base64)
            .map_err(|e| VoiceBankError::Remote(format!("undecodable TTS audio: {e}")))
    }
}

#[async_trait::async_trait]
impl BankApi for HttpGateway {
    async fn search_recipients(&self, name: &str, limit: usize) -> VoiceResult<Vec<Recipient>> {
        let resp = self
            .http
            .get(self.url("/api/v1/recipients/search"))
            .query(&[("name", name), ("limit", &limit.to_string())])
            .header("company-id", &self.company_id)
            .header("token", &self.token)
            .send()
            .await?;

        let page: RecipientPageWire = Self::read_body(resp).await?;
        Ok(page.normalize())
    }

    async fn initiate_transfer(
        &self,
        recipient_id: &str,
        amount: f64,
        session_id: &str,
    ) -> VoiceResult<TransferRecord> {
        let resp = self
            .http
            .post(self.url("/api/v1/transfers/initiate"))
            .header("Idempotency-Key", Uuid::new_v4().to_string())
            .header("company-id", &self.company_id)
            .header("token", &self.token)
            .json(&serde_json::json!({
                "recipient_id": recipient_id,
                "amount": amount,
                "session_id": session_id,
            }))
            .send()
            .await?;

        let wire: TransferWire = Self::read_body(resp).await?;
        wire.normalize()
    }

    async fn verify_pin(&self, transfer_id: &str, pin: &str) -> VoiceResult<TransferRecord> {
        let resp = self
            .http
            .post(self.url(&format!("/api/v1/transfers/{transfer_id}/verify-pin")))
            .header("company-id", &self.company_id)
            .header("token", &self.token)
            .json(&serde_json::json!({ "pin": pin }))
            .send()
            .await?;

        let wire: TransferWire = Self::read_body(resp).await?;
        wire.normalize()
    }

    async fn confirm_transfer(&self, transfer_id: &str) -> VoiceResult<TransferRecord> {
        let resp = self
            .http
            .post(self.url(&format!("/api/v1/transfers/{transfer_id}/confirm")))
            .header("Idempotency-Key", Uuid::new_v4().to_string())
            .header("company-id", &self.company_id)
            .header("token", &self.token)
            .json(&serde_json::json!({ "confirmation": "confirm" }))
            .send()
            .await?;

        let wire: TransferWire = Self::read_body(resp).await?;
        wire.normalize()
    }

    async fn cancel_transfer(&self, transfer_id: &str) -> VoiceResult<TransferRecord> {
        let resp = self
            .http
            .post(self.url(&format!("/api/v1/transfers/{transfer_id}/cancel")))
            .header("company-id", &self.company_id)
            .header("token", &self.token)
            .send()
            .await?;

        let wire: TransferWire = Self::read_body(resp).await?;
        wire.normalize()
    }

    async fn fetch_balance(&self, account_number: &str) -> VoiceResult<f64> {
        let resp = self
            .http
            .get(self.url(&format!("/api/v1/accounts/balance/{account_number}")))
            .header("company-id", &self.company_id)
            .header("token", &self.token)
            .send()
            .await?;

        let wire: BalanceWire = Self::read_body(resp).await?;
        Ok(wire.balance)
    }
}
