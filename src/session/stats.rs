use super::SessionState;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Snapshot of the controller's observable state
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    /// Current lifecycle state
    pub state: SessionState,

    /// Whether audio is being captured right now
    pub is_recording: bool,

    /// Whether speech recognition is delivering results (false while paused
    /// or when transcription has degraded mid-session)
    pub is_transcribing: bool,

    /// When the active session started, if any
    pub started_at: Option<DateTime<Utc>>,

    /// Cumulative recording duration in seconds (excludes paused intervals)
    pub duration_secs: f64,

    /// Segments accumulated so far in the active session
    pub segment_count: usize,
}
