//! Playback of synthesized voice replies.
//!
//! One reply plays at a time: starting a new one stops whatever is still
//! playing (last writer wins, no queue). Decode and playback faults are
//! logged and swallowed so a bad waveform can never block voice input.

use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
use std::io::Cursor;
use tracing::{debug, warn};

use crate::error::{VoiceBankError, VoiceResult};

pub struct PlaybackController {
    _stream: OutputStream,
    _stream_handle: OutputStreamHandle,
    sink: Sink,
}

impl PlaybackController {
    /// Open the default output device
    pub fn new() -> VoiceResult<Self> {
        let (stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| VoiceBankError::Playback(e.to_string()))?;
        let sink = Sink::try_new(&stream_handle)
            .map_err(|e| VoiceBankError::Playback(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            _stream_handle: stream_handle,
            sink,
        })
    }

    /// Play a reply waveform (WAV or MP3), stopping any in-progress reply
    /// first
    ///
    /// Faults degrade to idle: a clip that fails to decode is logged and
    /// dropped, never surfaced to the user.
    pub fn play(&self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }

        // Last writer wins.
        self.sink.stop();

        let cursor = Cursor::new(bytes.to_vec());
        match rodio::Decoder::new(cursor) {
            Ok(source) => {
                self.sink.append(source.convert_samples::<f32>());
                debug!("Reply playback started ({} bytes)", bytes.len());
            }
            Err(e) => {
                warn!("Reply audio failed to decode, staying silent: {}", e);
            }
        }
    }

    /// Stop playback immediately (user interruption)
    pub fn interrupt(&self) {
        self.sink.stop();
        debug!("Playback interrupted");
    }

    /// Whether a reply is currently playing or queued
    pub fn is_playing(&self) -> bool {
        !self.sink.empty()
    }
}
