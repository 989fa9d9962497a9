pub mod audio;
pub mod config;
pub mod error;
pub mod export;
pub mod meeting;
pub mod session;
pub mod store;
pub mod transcribe;

pub use audio::{AudioCapture, AudioCaptureConfig, AudioFrame, RecordingMeta, WavFileSource, WavSink};
pub use config::Config;
pub use error::{CaptureError, PersistenceError, RecognitionError, SessionError};
pub use export::ExportFormat;
pub use meeting::{Meeting, MeetingAudioSource, MeetingTranscript, TranscriptSegment};
pub use session::{SessionConfig, SessionController, SessionEvent, SessionState, SessionStats};
pub use store::{JsonFileStore, PersistenceGateway};
pub use transcribe::{
    NatsEngine, PartialResult, RecognizerEvent, SegmentAccumulator, SegmenterConfig,
    TranscriptionEngine,
};

#[cfg(feature = "microphone")]
pub use audio::MicrophoneSource;
