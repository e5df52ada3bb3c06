use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::backend::{AudioBackend, CaptureConfig};
use super::clip::AudioClip;
use crate::error::{VoiceBankError, VoiceResult};

/// Capture controller: owns the microphone lifecycle for one widget instance
///
/// At most one recording is active per controller. Starting while recording
/// is rejected; stopping while idle is a no-op. The backend is stopped on
/// every exit path so the device is always released, and a completed
/// recording yields exactly one clip.
pub struct CaptureController {
    backend: Box<dyn AudioBackend>,
    config: CaptureConfig,
    recording: bool,

    /// Samples accumulated by the drain task while recording
    samples: Arc<Mutex<Vec<i16>>>,

    /// Handle for the frame-draining task
    drain_task: Option<JoinHandle<()>>,
}

impl CaptureController {
    pub fn new(backend: Box<dyn AudioBackend>, config: CaptureConfig) -> Self {
        Self {
            backend,
            config,
            recording: false,
            samples: Arc::new(Mutex::new(Vec::new())),
            drain_task: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Request microphone access and begin buffering audio
    ///
    /// Fails with `PermissionDenied` when the device is refused; the caller
    /// must surface a remediation message rather than silently retrying.
    pub async fn start_recording(&mut self) -> VoiceResult<()> {
        if self.recording {
            warn!("Recording already in progress");
            return Err(VoiceBankError::AlreadyRecording);
        }

        let mut frame_rx = self.backend.start().await?;

        {
            let mut samples = self.samples.lock().await;
            samples.clear();
        }

        let samples = Arc::clone(&self.samples);
        self.drain_task = Some(tokio::spawn(async move {
            while let Some(frame) = frame_rx.recv().await {
                let mut buffer = samples.lock().await;
                buffer.extend_from_slice(&frame.samples);
            }
        }));

        self.recording = true;
        info!("Recording started ({})", self.backend.name());

        Ok(())
    }

    /// Finalize the buffered audio into a single clip and release the device
    ///
    /// Returns `Ok(None)` when no recording was active.
    pub async fn stop_recording(&mut self) -> VoiceResult<Option<AudioClip>> {
        if !self.recording {
            warn!("Stop requested while not recording");
            return Ok(None);
        }
        self.recording = false;

        let stop_result = self.backend.stop().await;

        if let Some(task) = self.drain_task.take() {
            match &stop_result {
                // Backend stop drops the frame sender, which ends the task.
                Ok(()) => {
                    if let Err(e) = task.await {
                        error!("Frame drain task panicked: {}", e);
                    }
                }
                // The sender may still be alive; don't wait on it.
                Err(_) => task.abort(),
            }
        }

        stop_result?;

        let samples = {
            let mut buffer = self.samples.lock().await;
            std::mem::take(&mut *buffer)
        };

        let clip = AudioClip::from_samples(&samples, self.config.sample_rate, self.config.channels)?;
        info!(
            "Recording finished: {:.1}s clip ({} samples)",
            clip.duration_ms() as f64 / 1000.0,
            clip.sample_count()
        );

        Ok(Some(clip))
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        // The backend's own Drop releases the device; the drain task would
        // otherwise outlive us holding the sample buffer.
        if let Some(task) = self.drain_task.take() {
            task.abort();
        }
    }
}
