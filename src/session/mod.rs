//! Recording session orchestration
//!
//! [`SessionController`] wires an audio capture source, a transcription
//! engine and the segment accumulator into one recording-session state
//! machine, persists the transcript as it grows, and exposes observable
//! state to whoever is watching (a GUI, the CLI, tests).

mod config;
mod controller;
mod events;
mod stats;

use serde::Serialize;

pub use config::SessionConfig;
pub use controller::SessionController;
pub use events::SessionEvent;
pub use stats::SessionStats;

/// Recording session lifecycle
///
/// `Idle → Recording ⇄ Paused → Stopped`; `Stopped` is terminal for the
/// session, after which the controller is back in `Idle` and ready for the
/// next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Idle,
    Recording,
    Paused,
    Stopped,
}
