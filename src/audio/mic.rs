//! Microphone capture backend built on cpal.
//!
//! cpal streams are not `Send`, so the stream lives on a dedicated thread
//! that parks until the stop flag is raised. Dropping the stream on that
//! thread is what releases the device.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use super::backend::{AudioBackend, AudioFrame, CaptureConfig};
use crate::error::{VoiceBankError, VoiceResult};

pub struct MicBackend {
    config: CaptureConfig,
    stop_flag: Arc<AtomicBool>,
    capturing: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl MicBackend {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            stop_flag: Arc::new(AtomicBool::new(false)),
            capturing: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }

    async fn join_thread(&mut self) {
        if let Some(handle) = self.thread.take() {
            let joined = tokio::task::spawn_blocking(move || handle.join()).await;
            if joined.is_err() {
                warn!("Capture thread join was cancelled");
            }
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for MicBackend {
    async fn start(&mut self) -> VoiceResult<mpsc::Receiver<AudioFrame>> {
        if self.capturing.load(Ordering::SeqCst) {
            return Err(VoiceBankError::AlreadyRecording);
        }

        let (frame_tx, frame_rx) = mpsc::channel(256);
        let (ready_tx, ready_rx) = oneshot::channel();

        self.stop_flag.store(false, Ordering::SeqCst);

        let config = self.config.clone();
        let stop_flag = Arc::clone(&self.stop_flag);
        let capturing = Arc::clone(&self.capturing);

        self.thread = Some(std::thread::spawn(move || {
            capture_thread(config, frame_tx, ready_tx, stop_flag, capturing)
        }));

        match ready_rx.await {
            Ok(Ok(())) => Ok(frame_rx),
            Ok(Err(e)) => {
                self.join_thread().await;
                Err(e)
            }
            Err(_) => {
                self.join_thread().await;
                Err(VoiceBankError::Capture(
                    "capture thread exited before startup completed".to_string(),
                ))
            }
        }
    }

    async fn stop(&mut self) -> VoiceResult<()> {
        self.stop_flag.store(true, Ordering::SeqCst);
        self.join_thread().await;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "cpal-microphone"
    }
}

impl Drop for MicBackend {
    fn drop(&mut self) {
        // Signal the thread; it owns the stream and releases the device.
        self.stop_flag.store(true, Ordering::SeqCst);
    }
}

fn capture_thread(
    config: CaptureConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
    ready_tx: oneshot::Sender<VoiceResult<()>>,
    stop_flag: Arc<AtomicBool>,
    capturing: Arc<AtomicBool>,
) {
    let stream = match build_stream(&config, frame_tx) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(VoiceBankError::Capture(e.to_string())));
        return;
    }

    capturing.store(true, Ordering::SeqCst);
    let _ = ready_tx.send(Ok(()));

    while !stop_flag.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(50));
    }

    // Dropping the stream stops capture and releases the microphone.
    drop(stream);
    capturing.store(false, Ordering::SeqCst);
    info!("Microphone released");
}

fn build_stream(
    config: &CaptureConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
) -> VoiceResult<cpal::Stream> {
    let device = cpal::default_host().default_input_device().ok_or_else(|| {
        VoiceBankError::PermissionDenied(
            "no input device available; check microphone permissions".to_string(),
        )
    })?;

    info!(
        "Using input device: {}",
        device.name().unwrap_or_else(|_| "unknown".to_string())
    );

    let stream_config = cpal::StreamConfig {
        channels: config.channels,
        sample_rate: cpal::SampleRate(config.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let sample_rate = config.sample_rate;
    let channels = config.channels;
    let buffer_duration_ms = config.buffer_duration_ms;
    let samples_per_frame =
        (sample_rate as u64 * buffer_duration_ms / 1000) as usize * channels as usize;

    let mut sample_buffer: Vec<i16> = Vec::with_capacity(samples_per_frame);
    let mut frames_sent: u64 = 0;

    let stream = device
        .build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                for &sample in data {
                    let pcm = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                    sample_buffer.push(pcm);

                    if sample_buffer.len() >= samples_per_frame {
                        let frame = AudioFrame {
                            samples: std::mem::take(&mut sample_buffer),
                            sample_rate,
                            channels,
                            timestamp_ms: frames_sent * buffer_duration_ms,
                        };
                        frames_sent += 1;

                        // Runs on the realtime audio thread; never block.
                        // A full channel means the consumer stopped draining,
                        // and dropping the frame is the acceptable outcome.
                        let _ = frame_tx.try_send(frame);
                    }
                }
            },
            move |err| {
                warn!("Audio input stream error: {}", err);
            },
            None,
        )
        .map_err(map_build_error)?;

    Ok(stream)
}

fn map_build_error(err: cpal::BuildStreamError) -> VoiceBankError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => VoiceBankError::PermissionDenied(
            "microphone is unavailable or access was refused".to_string(),
        ),
        other => VoiceBankError::Capture(other.to_string()),
    }
}
