use crate::error::CaptureError;
use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

impl AudioFrame {
    /// Duration of this frame in milliseconds
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0;
        }
        let frames = self.samples.len() as u64 / self.channels as u64;
        frames * 1000 / self.sample_rate as u64
    }
}

/// Configuration for an audio capture source
#[derive(Debug, Clone)]
pub struct AudioCaptureConfig {
    /// Target sample rate in Hz
    pub sample_rate: u32,
    /// Target channel count (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Capture buffer size in samples per channel
    pub frame_samples: usize,
}

impl Default for AudioCaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // 16kHz for speech recognition
            channels: 1,        // Mono
            frame_samples: 1024,
        }
    }
}

/// Audio capture source
///
/// Implementations wrap callback- or file-based audio so the pipeline only
/// ever sees a channel of [`AudioFrame`]s:
/// - [`WavFileSource`](super::WavFileSource): paced playback of a WAV file
/// - `MicrophoneSource` (feature `microphone`): cpal input stream
/// - test doubles injected through this trait
#[async_trait]
pub trait AudioCapture: Send + Sync {
    /// Check (and if needed request) capture permission. Idempotent.
    async fn request_access(&self) -> bool;

    /// Begin continuous capture, delivering frames into `sink` at a fixed
    /// buffer cadence until stopped.
    ///
    /// Starting while already capturing is a no-op, not an error.
    async fn start(&mut self, sink: mpsc::Sender<AudioFrame>) -> Result<(), CaptureError>;

    /// Suspend frame delivery without tearing down the underlying device.
    fn pause(&self);

    /// Continue delivery after [`pause`](Self::pause).
    fn resume(&self);

    /// Release all device resources. Safe to call even if never started.
    /// No frame is delivered after this returns.
    async fn stop(&mut self) -> Result<(), CaptureError>;

    /// Normalized audio level in [0.0, 1.0], published at buffer cadence.
    /// Observable metering state only, not part of the transcription path.
    fn level(&self) -> watch::Receiver<f32>;

    /// Whether the source is currently capturing
    fn is_capturing(&self) -> bool;

    /// Source name for logging
    fn name(&self) -> &str;
}
