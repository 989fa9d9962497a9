pub mod capture;
pub mod file;
pub mod level;
pub mod sink;

#[cfg(feature = "microphone")]
pub mod mic;

pub use capture::{AudioCapture, AudioCaptureConfig, AudioFrame};
pub use file::WavFileSource;
pub use level::normalized_level;
pub use sink::{RecordingMeta, WavSink};

#[cfg(feature = "microphone")]
pub use mic::MicrophoneSource;
