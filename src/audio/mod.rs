pub mod backend;
pub mod capture;
pub mod clip;
pub mod mic;
pub mod playback;

pub use backend::{AudioBackend, AudioFrame, CaptureConfig};
pub use capture::CaptureController;
pub use clip::AudioClip;
pub use mic::MicBackend;
pub use playback::PlaybackController;
