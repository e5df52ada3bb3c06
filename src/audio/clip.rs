use std::io::Cursor;

use crate::error::{VoiceBankError, VoiceResult};

/// A finished voice recording, encoded as an in-memory WAV file ready for
/// upload
///
/// Exactly one clip is produced per completed recording; the capture
/// controller hands it over once and forgets it, so the same blob can never
/// be uploaded twice.
#[derive(Debug, Clone)]
pub struct AudioClip {
    wav: Vec<u8>,
    sample_rate: u32,
    channels: u16,
    sample_count: usize,
}

impl AudioClip {
    /// Encode interleaved 16-bit PCM samples as a WAV clip
    pub fn from_samples(samples: &[i16], sample_rate: u32, channels: u16) -> VoiceResult<Self> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)
                .map_err(|e| VoiceBankError::Capture(format!("WAV encoding failed: {e}")))?;
            for &sample in samples {
                writer
                    .write_sample(sample)
                    .map_err(|e| VoiceBankError::Capture(format!("WAV encoding failed: {e}")))?;
            }
            writer
                .finalize()
                .map_err(|e| VoiceBankError::Capture(format!("WAV encoding failed: {e}")))?;
        }

        Ok(Self {
            wav: cursor.into_inner(),
            sample_rate,
            channels,
            sample_count: samples.len(),
        })
    }

    /// The encoded WAV bytes, as uploaded
    pub fn wav_bytes(&self) -> &[u8] {
        &self.wav
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0;
        }
        self.sample_count as u64 * 1000 / (self.sample_rate as u64 * self.channels as u64)
    }

    pub fn is_empty(&self) -> bool {
        self.sample_count == 0
    }
}
