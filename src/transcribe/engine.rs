use crate::audio::AudioFrame;
use crate::error::RecognitionError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

/// The recognizer's current best guess for ongoing speech
///
/// `text` is cumulative-so-far for the open utterance, not a delta: each
/// result supersedes the previous one until `is_final` or a silence timeout
/// closes the run. This matches both the platform recognizers and the
/// remote STT service wire format.
#[derive(Debug, Clone)]
pub struct PartialResult {
    pub text: String,
    pub is_final: bool,
    pub timestamp: DateTime<Utc>,
    /// Confidence in [0.0, 1.0], when the recognizer reports one
    pub confidence: Option<f32>,
}

/// Events delivered by a running engine
#[derive(Debug, Clone)]
pub enum RecognizerEvent {
    /// A partial or final recognition result
    Result(PartialResult),
    /// Mid-stream failure. Delivery halts; the session controller decides
    /// whether to restart.
    Failed(RecognitionError),
}

/// Continuous speech recognition engine
///
/// Feeds captured audio frames to an underlying recognizer and surfaces
/// every update, partial or final, with monotonically non-decreasing
/// timestamps.
#[async_trait]
pub trait TranscriptionEngine: Send + Sync {
    /// Check (and if needed request) speech recognition permission.
    async fn request_access(&self) -> bool;

    /// Start recognizing the given audio stream, delivering events into
    /// `events` until the frame channel closes or [`stop`](Self::stop).
    ///
    /// Starting while already running is a guarded no-op.
    async fn start(
        &mut self,
        frames: mpsc::Receiver<AudioFrame>,
        events: mpsc::Sender<RecognizerEvent>,
    ) -> Result<(), RecognitionError>;

    /// End the audio feed and cancel in-flight recognition. No event is
    /// delivered after this returns.
    async fn stop(&mut self) -> Result<(), RecognitionError>;

    /// Whether the engine is currently running
    fn is_transcribing(&self) -> bool;

    /// Engine name for logging
    fn name(&self) -> &str;
}
