use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub transcription: TranscriptionConfig,
    pub storage: StorageConfig,
    pub session: SessionPolicyConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    /// Capture buffer size in samples per channel
    pub frame_samples: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionConfig {
    /// NATS server URL for the remote STT engine
    pub nats_url: String,
    /// Quiet interval after which an open segment is forced to finalize
    pub silence_timeout_secs: f64,
    /// Confidence assigned when the recognizer does not report one
    pub default_confidence: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory for meetings, transcripts and audio recordings
    pub root_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionPolicyConfig {
    /// Flush the transcript buffer after this many unsaved segments
    pub autosave_segments: usize,
    /// ... or after this many seconds since the last save
    pub autosave_interval_secs: u64,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: "meeting-scribe".to_string(),
            },
            audio: AudioConfig {
                sample_rate: 16000, // 16kHz, what the STT service expects
                channels: 1,        // Mono
                frame_samples: 1024,
            },
            transcription: TranscriptionConfig {
                nats_url: "nats://localhost:4222".to_string(),
                silence_timeout_secs: 3.0,
                default_confidence: 0.8,
            },
            storage: StorageConfig {
                root_path: "~/.meeting-scribe".to_string(),
            },
            session: SessionPolicyConfig {
                autosave_segments: 10,
                autosave_interval_secs: 30,
            },
        }
    }
}
