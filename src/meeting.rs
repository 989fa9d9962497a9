use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where the recorded audio comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeetingAudioSource {
    /// Microphone input
    Microphone,
    /// System audio (applications, browser, etc.)
    System,
    /// Pre-recorded audio file (testing/batch processing)
    File,
}

/// A recorded meeting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    /// Unique meeting identifier (also the storage filename)
    pub id: Uuid,

    /// Meeting title
    pub title: String,

    /// When recording started
    pub started_at: DateTime<Utc>,

    /// When recording stopped (None while in progress)
    pub ended_at: Option<DateTime<Utc>>,

    /// Participant names
    pub participants: Vec<String>,

    /// Audio source used for this meeting
    pub audio_source: MeetingAudioSource,

    /// Path to the persisted transcript JSON, once saved
    pub transcript_path: Option<String>,

    /// Path to the recorded audio file, once saved
    pub audio_path: Option<String>,

    /// Optional free-form description
    pub description: Option<String>,

    /// Optional summary (filled in after the meeting)
    pub summary: Option<String>,
}

impl Meeting {
    pub fn new(
        title: impl Into<String>,
        audio_source: MeetingAudioSource,
        participants: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            started_at: Utc::now(),
            ended_at: None,
            participants,
            audio_source,
            transcript_path: None,
            audio_path: None,
            description: None,
            summary: None,
        }
    }

    /// Total meeting duration in seconds, once the meeting has ended
    pub fn duration_secs(&self) -> Option<f64> {
        self.ended_at.map(|end| {
            end.signed_duration_since(self.started_at)
                .num_milliseconds() as f64
                / 1000.0
        })
    }
}

/// One finalized span of transcribed speech
///
/// Immutable once created: the accumulator emits a segment exactly once and
/// nothing mutates it afterwards. Buffer order equals creation order equals
/// chronological order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Unique segment identifier
    pub id: Uuid,

    /// When this segment was finalized
    pub timestamp: DateTime<Utc>,

    /// Speaker name, when known (diarization is out of scope)
    pub speaker: Option<String>,

    /// Transcribed text
    pub text: String,

    /// Confidence score in [0.0, 1.0]
    pub confidence: f32,

    /// Segment duration in seconds
    pub duration_secs: f64,
}

impl TranscriptSegment {
    /// Render as a single transcript line: `[HH:MM:SS] Speaker: text`
    pub fn render_line(&self) -> String {
        format!(
            "[{}] {}: {}",
            self.timestamp.format("%H:%M:%S"),
            self.speaker.as_deref().unwrap_or("Unknown"),
            self.text
        )
    }
}

/// The full transcript of a meeting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingTranscript {
    pub meeting_id: Uuid,
    pub segments: Vec<TranscriptSegment>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl MeetingTranscript {
    pub fn new(meeting_id: Uuid, segments: Vec<TranscriptSegment>) -> Self {
        let now = Utc::now();
        Self {
            meeting_id,
            segments,
            created_at: now,
            last_updated: now,
        }
    }

    /// Render the whole transcript as `[HH:MM:SS] Speaker: text` lines
    pub fn render(&self) -> String {
        self.segments
            .iter()
            .map(TranscriptSegment::render_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
