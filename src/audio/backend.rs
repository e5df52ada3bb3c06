use tokio::sync::mpsc;

use crate::error::VoiceResult;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since recording started
    pub timestamp_ms: u64,
}

/// Configuration for a capture backend
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Target sample rate in Hz
    pub sample_rate: u32,
    /// Target channel count (1 = mono)
    pub channels: u16,
    /// Buffer size per frame in milliseconds (affects latency)
    pub buffer_duration_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // what the transcription side expects
            channels: 1,
            buffer_duration_ms: 100,
        }
    }
}

/// Microphone capture backend trait
///
/// `start` must fail with `PermissionDenied` when the device is refused, so
/// the caller can surface a remediation message instead of silently retrying.
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Begin capturing; returns a channel receiver of audio frames
    async fn start(&mut self) -> VoiceResult<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing and release the device. Must be safe to call on every
    /// exit path, including after a failed start.
    async fn stop(&mut self) -> VoiceResult<()>;

    /// Whether the backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Backend name for logging
    fn name(&self) -> &str;
}
