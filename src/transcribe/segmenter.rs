use super::engine::PartialResult;
use crate::meeting::TranscriptSegment;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

/// Segmentation tuning
#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    /// Quiet interval after which an open segment is forced to finalize
    pub silence_timeout: Duration,
    /// Confidence assigned when the recognizer does not report one
    pub default_confidence: f32,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            silence_timeout: Duration::from_secs(3),
            default_confidence: 0.8,
        }
    }
}

/// Turns the live, overwriting partial-result stream into permanent segments.
///
/// Runs as a single task that owns all segmentation state, so result
/// delivery and the silence timer are serialized by construction: a segment
/// can never be finalized twice, and a result can never land in a segment
/// that has already closed.
///
/// A segment finalizes when a result arrives flagged final, when the silence
/// timeout elapses with no new result, or when the result channel closes
/// (engine stopped or session paused). Empty text never finalizes.
pub struct SegmentAccumulator {
    config: SegmenterConfig,
    results: mpsc::Receiver<PartialResult>,
    segments: mpsc::Sender<TranscriptSegment>,

    /// Latest partial text for the open segment (cumulative-so-far)
    current_text: String,
    current_confidence: Option<f32>,
    /// Wall-clock start of the open segment run
    segment_start: DateTime<Utc>,
    /// Armed silence deadline; None while no text is buffered
    deadline: Option<Instant>,
    /// Timestamp of the last emitted segment, to keep ordering monotone
    last_emitted: Option<DateTime<Utc>>,
}

impl SegmentAccumulator {
    pub fn new(
        config: SegmenterConfig,
        results: mpsc::Receiver<PartialResult>,
        segments: mpsc::Sender<TranscriptSegment>,
    ) -> Self {
        Self {
            config,
            results,
            segments,
            current_text: String::new(),
            current_confidence: None,
            segment_start: Utc::now(),
            deadline: None,
            last_emitted: None,
        }
    }

    /// Drive the accumulator until the result channel closes. Any open
    /// segment is finalized on the way out.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                // Biased toward the result arm: a result racing an expired
                // timer wins, preferring longer segments over spurious splits.
                biased;

                result = self.results.recv() => match result {
                    Some(result) => self.on_result(result).await,
                    None => {
                        self.finalize().await;
                        break;
                    }
                },

                _ = Self::silence_elapsed(self.deadline) => {
                    self.finalize().await;
                }
            }
        }

        debug!("segment accumulator finished");
    }

    async fn silence_elapsed(deadline: Option<Instant>) {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }

    async fn on_result(&mut self, result: PartialResult) {
        if result.text.trim().is_empty() {
            // Not speech; whatever is buffered stays on its current clock
            return;
        }

        // Cumulative text: each result supersedes the previous one
        self.current_text = result.text;
        if result.confidence.is_some() {
            self.current_confidence = result.confidence;
        }

        if result.is_final {
            self.finalize().await;
        } else {
            self.deadline = Some(Instant::now() + self.config.silence_timeout);
        }
    }

    /// Close the open segment, if any, and reset for the next run.
    async fn finalize(&mut self) {
        self.deadline = None;

        if self.current_text.is_empty() {
            return;
        }

        let now = Utc::now();
        let timestamp = match self.last_emitted {
            Some(last) if now < last => last,
            _ => now,
        };
        let duration_secs =
            (now - self.segment_start).num_milliseconds().max(0) as f64 / 1000.0;

        let segment = TranscriptSegment {
            id: Uuid::new_v4(),
            timestamp,
            speaker: None,
            text: std::mem::take(&mut self.current_text),
            confidence: self
                .current_confidence
                .take()
                .unwrap_or(self.config.default_confidence)
                .clamp(0.0, 1.0),
            duration_secs,
        };

        self.last_emitted = Some(timestamp);
        self.segment_start = now;

        debug!(
            "finalized segment ({:.1}s): {}",
            segment.duration_secs, segment.text
        );

        // Receiver gone means the session is tearing down; drop silently
        let _ = self.segments.send(segment).await;
    }
}
