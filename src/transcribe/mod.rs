//! Speech recognition and transcript segmentation
//!
//! The [`TranscriptionEngine`] trait wraps a continuous recognizer behind a
//! frame-in, event-out contract; [`SegmentAccumulator`] converts the
//! overwriting partial-result stream into immutable timestamped segments.

pub mod engine;
pub mod nats;
pub mod segmenter;

pub use engine::{PartialResult, RecognizerEvent, TranscriptionEngine};
pub use nats::{AudioFrameMessage, NatsEngine, TranscriptMessage};
pub use segmenter::{SegmentAccumulator, SegmenterConfig};
