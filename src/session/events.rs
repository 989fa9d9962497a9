use super::SessionState;
use crate::meeting::TranscriptSegment;

/// Typed state-change events emitted by the session controller
///
/// Observers (GUI, CLI, tests) subscribe via
/// [`SessionController::subscribe`](super::SessionController::subscribe);
/// the core never depends on any UI framework. Events on one receiver are
/// delivered in emission order.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The session moved to a new lifecycle state
    StateChanged(SessionState),

    /// A segment was finalized and appended to the transcript buffer
    SegmentAdded(TranscriptSegment),

    /// Duration timer tick (cumulative seconds, excludes paused intervals)
    DurationTick { secs: f64 },

    /// The transcript buffer was flushed to the store
    TranscriptSaved { segments: usize },

    /// A component error surfaced mid-session; the session keeps running
    /// unless a state change says otherwise
    Error(String),
}
