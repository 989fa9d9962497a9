// Segment accumulator behavior: finality, silence timeouts, and the
// result-vs-timer race.

use chrono::Utc;
use meeting_scribe::{PartialResult, SegmentAccumulator, SegmenterConfig, TranscriptSegment};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

const SILENCE: Duration = Duration::from_millis(150);

fn spawn_accumulator(
    config: SegmenterConfig,
) -> (
    mpsc::Sender<PartialResult>,
    mpsc::Receiver<TranscriptSegment>,
    JoinHandle<()>,
) {
    let (result_tx, result_rx) = mpsc::channel(16);
    let (segment_tx, segment_rx) = mpsc::channel(16);
    let task = tokio::spawn(SegmentAccumulator::new(config, result_rx, segment_tx).run());
    (result_tx, segment_rx, task)
}

fn test_config() -> SegmenterConfig {
    SegmenterConfig {
        silence_timeout: SILENCE,
        default_confidence: 0.8,
    }
}

fn partial(text: &str) -> PartialResult {
    PartialResult {
        text: text.to_string(),
        is_final: false,
        timestamp: Utc::now(),
        confidence: None,
    }
}

fn final_result(text: &str) -> PartialResult {
    PartialResult {
        is_final: true,
        ..partial(text)
    }
}

async fn expect_segment(rx: &mut mpsc::Receiver<TranscriptSegment>) -> TranscriptSegment {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for segment")
        .expect("segment channel closed")
}

async fn expect_silence(rx: &mut mpsc::Receiver<TranscriptSegment>) {
    let got = timeout(SILENCE * 3, rx.recv()).await;
    assert!(got.is_err(), "unexpected segment: {:?}", got);
}

#[tokio::test]
async fn final_result_closes_exactly_one_segment() {
    let (tx, mut rx, _task) = spawn_accumulator(test_config());

    // A partial followed immediately by a final: one segment, not two
    tx.send(partial("Hello")).await.unwrap();
    tx.send(final_result("Hello team")).await.unwrap();

    let segment = expect_segment(&mut rx).await;
    assert_eq!(segment.text, "Hello team");

    expect_silence(&mut rx).await;
}

#[tokio::test]
async fn silence_timeout_finalizes_exactly_once() {
    let (tx, mut rx, _task) = spawn_accumulator(test_config());

    tx.send(partial("Hello team")).await.unwrap();

    let started = Instant::now();
    let segment = expect_segment(&mut rx).await;
    assert_eq!(segment.text, "Hello team");
    assert!(
        started.elapsed() >= SILENCE,
        "finalized before the silence window elapsed"
    );

    // The timer must not re-fire on an empty accumulator
    expect_silence(&mut rx).await;
}

#[tokio::test]
async fn empty_text_never_finalizes() {
    let (tx, mut rx, task) = spawn_accumulator(test_config());

    tx.send(partial("   ")).await.unwrap();
    tx.send(final_result("")).await.unwrap();
    expect_silence(&mut rx).await;

    // Closing the stream must not conjure a segment either
    drop(tx);
    let _ = task.await;
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn late_result_beats_the_silence_timer() {
    let (tx, mut rx, _task) = spawn_accumulator(test_config());

    tx.send(partial("Hello")).await.unwrap();
    tokio::time::sleep(SILENCE * 2 / 3).await;
    // Arrives before the timer fires; the run keeps going with richer text
    tx.send(partial("Hello team")).await.unwrap();

    let segment = expect_segment(&mut rx).await;
    assert_eq!(segment.text, "Hello team");
    expect_silence(&mut rx).await;
}

#[tokio::test]
async fn closing_the_stream_finalizes_the_open_segment() {
    let (tx, mut rx, task) = spawn_accumulator(test_config());

    tx.send(partial("wrapping up")).await.unwrap();
    drop(tx);

    let segment = expect_segment(&mut rx).await;
    assert_eq!(segment.text, "wrapping up");

    let _ = task.await;
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn segments_are_ordered_and_durations_bounded() {
    let (tx, mut rx, _task) = spawn_accumulator(test_config());
    let started = Instant::now();

    for text in ["alpha", "beta", "gamma"] {
        tx.send(partial(text)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(final_result(text)).await.unwrap();
    }

    let mut segments = Vec::new();
    for _ in 0..3 {
        segments.push(expect_segment(&mut rx).await);
    }
    let elapsed = started.elapsed().as_secs_f64();

    assert_eq!(
        segments.iter().map(|s| s.text.as_str()).collect::<Vec<_>>(),
        vec!["alpha", "beta", "gamma"]
    );

    for pair in segments.windows(2) {
        assert!(
            pair[0].timestamp <= pair[1].timestamp,
            "timestamps must be non-decreasing"
        );
    }

    let total: f64 = segments.iter().map(|s| s.duration_secs).sum();
    assert!(
        total <= elapsed + 0.05,
        "summed durations ({:.3}s) exceed wall time ({:.3}s)",
        total,
        elapsed
    );
}

#[tokio::test]
async fn confidence_defaults_when_unreported() {
    let config = SegmenterConfig {
        silence_timeout: SILENCE,
        default_confidence: 0.6,
    };
    let (tx, mut rx, _task) = spawn_accumulator(config);

    tx.send(final_result("unscored")).await.unwrap();
    let segment = expect_segment(&mut rx).await;
    assert!((segment.confidence - 0.6).abs() < f32::EPSILON);

    let mut scored = final_result("scored");
    scored.confidence = Some(0.42);
    tx.send(scored).await.unwrap();
    let segment = expect_segment(&mut rx).await;
    assert!((segment.confidence - 0.42).abs() < f32::EPSILON);
}
