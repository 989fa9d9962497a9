// JSON-file store: round-trips, listing order, deletion, and search.

use chrono::{Duration as ChronoDuration, Utc};
use meeting_scribe::{
    JsonFileStore, Meeting, MeetingAudioSource, MeetingTranscript, PersistenceGateway,
    TranscriptSegment,
};
use tempfile::TempDir;
use uuid::Uuid;

fn store() -> (JsonFileStore, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = JsonFileStore::new(dir.path()).unwrap();
    (store, dir)
}

fn segment(text: &str, offset_secs: i64) -> TranscriptSegment {
    TranscriptSegment {
        id: Uuid::new_v4(),
        timestamp: Utc::now() + ChronoDuration::seconds(offset_secs),
        speaker: None,
        text: text.to_string(),
        confidence: 0.8,
        duration_secs: 1.5,
    }
}

#[tokio::test]
async fn meeting_round_trip() {
    let (store, _dir) = store();

    let mut meeting = Meeting::new(
        "Retro",
        MeetingAudioSource::Microphone,
        vec!["ana".to_string()],
    );
    meeting.ended_at = Some(meeting.started_at + ChronoDuration::seconds(90));
    meeting.description = Some("quarterly retro".to_string());

    store.save_meeting(&meeting).await.unwrap();
    let loaded = store.load_meeting(meeting.id).await.unwrap().unwrap();

    assert_eq!(loaded.id, meeting.id);
    assert_eq!(loaded.title, "Retro");
    assert_eq!(loaded.participants, vec!["ana"]);
    assert_eq!(loaded.audio_source, MeetingAudioSource::Microphone);
    assert_eq!(loaded.duration_secs(), Some(90.0));
    assert_eq!(loaded.description.as_deref(), Some("quarterly retro"));
}

#[tokio::test]
async fn missing_records_load_as_none() {
    let (store, _dir) = store();
    assert!(store.load_meeting(Uuid::new_v4()).await.unwrap().is_none());
    assert!(store
        .load_transcript(Uuid::new_v4())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn listing_is_most_recent_first() {
    let (store, _dir) = store();

    for (title, age_secs) in [("oldest", 300), ("middle", 200), ("newest", 100)] {
        let mut meeting = Meeting::new(title, MeetingAudioSource::File, vec![]);
        meeting.started_at = Utc::now() - ChronoDuration::seconds(age_secs);
        store.save_meeting(&meeting).await.unwrap();
    }

    let titles: Vec<String> = store
        .list_meetings()
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.title)
        .collect();
    assert_eq!(titles, vec!["newest", "middle", "oldest"]);
}

#[tokio::test]
async fn unreadable_files_are_skipped() {
    let (store, dir) = store();

    let meeting = Meeting::new("Good", MeetingAudioSource::File, vec![]);
    store.save_meeting(&meeting).await.unwrap();
    std::fs::write(
        dir.path().join("meetings").join("garbage.json"),
        b"not json",
    )
    .unwrap();

    let meetings = store.list_meetings().await.unwrap();
    assert_eq!(meetings.len(), 1);
    assert_eq!(meetings[0].title, "Good");
}

#[tokio::test]
async fn delete_removes_all_artifacts() {
    let (store, _dir) = store();

    let meeting = Meeting::new("Doomed", MeetingAudioSource::File, vec![]);
    let transcript = MeetingTranscript::new(meeting.id, vec![segment("bye", 0)]);
    store.save_meeting(&meeting).await.unwrap();
    store.save_transcript(&transcript).await.unwrap();
    std::fs::write(store.audio_path(meeting.id), b"RIFF").unwrap();

    store.delete_meeting(meeting.id).await.unwrap();

    assert!(store.load_meeting(meeting.id).await.unwrap().is_none());
    assert!(store.load_transcript(meeting.id).await.unwrap().is_none());
    assert!(!store.audio_path(meeting.id).exists());

    // Deleting again is a no-op
    store.delete_meeting(meeting.id).await.unwrap();
}

#[tokio::test]
async fn transcript_round_trip_preserves_order() {
    let (store, _dir) = store();

    let meeting_id = Uuid::new_v4();
    let transcript = MeetingTranscript::new(
        meeting_id,
        vec![segment("first", 0), segment("second", 1), segment("third", 2)],
    );
    store.save_transcript(&transcript).await.unwrap();

    let loaded = store.load_transcript(meeting_id).await.unwrap().unwrap();
    assert_eq!(loaded.meeting_id, meeting_id);
    assert_eq!(
        loaded.segments.iter().map(|s| s.text.as_str()).collect::<Vec<_>>(),
        vec!["first", "second", "third"]
    );
}

#[tokio::test]
async fn search_matches_title_description_and_participants() {
    let (store, _dir) = store();

    let mut budget = Meeting::new("Budget review", MeetingAudioSource::File, vec![]);
    budget.description = Some("Q3 planning".to_string());
    let standup = Meeting::new(
        "Standup",
        MeetingAudioSource::File,
        vec!["Marina".to_string()],
    );
    store.save_meeting(&budget).await.unwrap();
    store.save_meeting(&standup).await.unwrap();

    let hits = store.search_meetings("budget").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Budget review");

    // Case-insensitive, and descriptions count
    assert_eq!(store.search_meetings("q3 PLAN").await.unwrap().len(), 1);
    // Participants count too
    assert_eq!(store.search_meetings("marina").await.unwrap().len(), 1);
    assert!(store.search_meetings("nothing").await.unwrap().is_empty());
}

#[tokio::test]
async fn search_transcripts_spans_meetings() {
    let (store, _dir) = store();

    let a = MeetingTranscript::new(
        Uuid::new_v4(),
        vec![segment("ship the release", 10), segment("lunch plans", 11)],
    );
    let b = MeetingTranscript::new(Uuid::new_v4(), vec![segment("release notes draft", 5)]);
    store.save_transcript(&a).await.unwrap();
    store.save_transcript(&b).await.unwrap();

    let hits = store.search_transcripts("release").await.unwrap();
    assert_eq!(hits.len(), 2);
    // Chronological across transcripts
    assert_eq!(hits[0].text, "release notes draft");
    assert_eq!(hits[1].text, "ship the release");
}
