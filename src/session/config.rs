use crate::audio::AudioCaptureConfig;
use crate::transcribe::SegmenterConfig;
use std::time::Duration;

/// Configuration for a recording session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Sample rate for audio processing (the STT service expects 16kHz)
    pub sample_rate: u32,

    /// Number of audio channels (1 = mono, 2 = stereo)
    pub channels: u16,

    /// Capture buffer size in samples per channel
    pub frame_samples: usize,

    /// Quiet interval after which an open segment is forced to finalize
    pub silence_timeout: Duration,

    /// Confidence assigned when the recognizer does not report one
    pub default_confidence: f32,

    /// Flush the transcript buffer after this many unsaved segments
    pub autosave_segments: usize,

    /// ... or after this long since the last save
    pub autosave_interval: Duration,

    /// Duration timer cadence
    pub tick_interval: Duration,

    /// Capacity of the internal frame/result channels
    pub channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            frame_samples: 1024,
            silence_timeout: Duration::from_secs(3),
            default_confidence: 0.8,
            autosave_segments: 10,
            autosave_interval: Duration::from_secs(30),
            tick_interval: Duration::from_secs(1),
            channel_capacity: 100,
        }
    }
}

impl SessionConfig {
    /// Build from the file-level configuration
    pub fn from_config(cfg: &crate::config::Config) -> Self {
        Self {
            sample_rate: cfg.audio.sample_rate,
            channels: cfg.audio.channels,
            frame_samples: cfg.audio.frame_samples,
            silence_timeout: Duration::from_secs_f64(cfg.transcription.silence_timeout_secs),
            default_confidence: cfg.transcription.default_confidence,
            autosave_segments: cfg.session.autosave_segments,
            autosave_interval: Duration::from_secs(cfg.session.autosave_interval_secs),
            ..Self::default()
        }
    }

    pub fn capture_config(&self) -> AudioCaptureConfig {
        AudioCaptureConfig {
            sample_rate: self.sample_rate,
            channels: self.channels,
            frame_samples: self.frame_samples,
        }
    }

    pub fn segmenter_config(&self) -> SegmenterConfig {
        SegmenterConfig {
            silence_timeout: self.silence_timeout,
            default_confidence: self.default_confidence,
        }
    }
}
