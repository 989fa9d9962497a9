use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use meeting_scribe::{
    AudioCapture, Config, ExportFormat, JsonFileStore, MeetingAudioSource, NatsEngine,
    PersistenceGateway, SessionConfig, SessionController, SessionEvent, WavFileSource,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "meeting-scribe")]
#[command(about = "Record, transcribe and archive meetings")]
struct Args {
    /// Configuration file (without extension)
    #[arg(short, long, default_value = "config/meeting-scribe")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record and transcribe a meeting
    Record {
        /// Meeting title
        #[arg(short, long)]
        title: String,

        /// Capture from a WAV file instead of the microphone
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Stop after this many seconds (0 = run until Ctrl-C)
        #[arg(short, long, default_value = "0")]
        duration: u64,

        /// Participant names
        #[arg(short, long)]
        participants: Vec<String>,
    },

    /// List recorded meetings, most recent first
    List,

    /// Print a meeting transcript in the given format
    Export {
        /// Meeting id
        #[arg(short, long)]
        meeting: Uuid,

        /// text, markdown or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Search meeting metadata and transcript text
    Search { query: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let cfg = match Config::load(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("config {} not loaded ({}), using defaults", args.config, e);
            Config::default()
        }
    };

    let store = Arc::new(JsonFileStore::new(expand_home(&cfg.storage.root_path))?);

    match args.command {
        Command::Record {
            title,
            input,
            duration,
            participants,
        } => record(cfg, store, title, input, duration, participants).await,
        Command::List => list(store).await,
        Command::Export { meeting, format } => export(cfg, store, meeting, &format).await,
        Command::Search { query } => search(store, &query).await,
    }
}

async fn record(
    cfg: Config,
    store: Arc<JsonFileStore>,
    title: String,
    input: Option<PathBuf>,
    duration: u64,
    participants: Vec<String>,
) -> Result<()> {
    let session_config = SessionConfig::from_config(&cfg);

    let (capture, source): (Box<dyn AudioCapture>, MeetingAudioSource) = match input {
        Some(path) => (
            Box::new(WavFileSource::new(path, session_config.capture_config())),
            MeetingAudioSource::File,
        ),
        None => {
            #[cfg(feature = "microphone")]
            {
                (
                    Box::new(meeting_scribe::MicrophoneSource::new(
                        session_config.capture_config(),
                    )),
                    MeetingAudioSource::Microphone,
                )
            }
            #[cfg(not(feature = "microphone"))]
            {
                bail!("built without the `microphone` feature; pass --input <wav>")
            }
        }
    };

    let session_id = format!("meeting-{}", Uuid::new_v4());
    let engine = Box::new(NatsEngine::new(&cfg.transcription.nats_url, session_id));

    let store: Arc<dyn PersistenceGateway> = store;
    let mut controller = SessionController::new(session_config, capture, engine, store);

    // Print the transcript as it lands
    let mut events = controller.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                SessionEvent::SegmentAdded(segment) => println!("{}", segment.render_line()),
                SessionEvent::Error(e) => warn!("session error: {}", e),
                SessionEvent::TranscriptSaved { segments } => {
                    info!("transcript autosaved ({} segments)", segments)
                }
                _ => {}
            }
        }
    });

    let meeting_id = controller
        .start(&title, source, participants)
        .await
        .context("failed to start session")?;
    info!("Recording meeting {} (Ctrl-C to stop)", meeting_id);

    if duration > 0 {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(duration)) => {}
            _ = tokio::signal::ctrl_c() => info!("interrupted"),
        }
    } else {
        tokio::signal::ctrl_c().await?;
    }

    let meeting = controller.stop().await.context("failed to stop session")?;

    println!();
    println!(
        "Saved \"{}\" ({}) — {:.0}s",
        meeting.title,
        meeting.id,
        meeting.duration_secs().unwrap_or(0.0)
    );
    if let Some(path) = &meeting.transcript_path {
        println!("Transcript: {}", path);
    }
    if let Some(path) = &meeting.audio_path {
        println!("Audio:      {}", path);
    }

    Ok(())
}

async fn list(store: Arc<JsonFileStore>) -> Result<()> {
    let meetings = store.list_meetings().await?;
    if meetings.is_empty() {
        println!("No meetings recorded yet.");
        return Ok(());
    }

    for meeting in meetings {
        println!(
            "{}  {}  {}{}",
            meeting.id,
            meeting.started_at.format("%Y-%m-%d %H:%M"),
            meeting.title,
            match meeting.duration_secs() {
                Some(secs) => format!("  ({:.0}s)", secs),
                None => "  (in progress)".to_string(),
            }
        );
    }

    Ok(())
}

async fn export(
    cfg: Config,
    store: Arc<JsonFileStore>,
    meeting_id: Uuid,
    format: &str,
) -> Result<()> {
    let format: ExportFormat = format.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    let controller = offline_controller(&cfg, store);
    let rendered = controller
        .export_transcript(meeting_id, format)
        .await
        .with_context(|| format!("failed to export meeting {}", meeting_id))?;

    print!("{}", rendered);
    Ok(())
}

/// Controller over the store only; capture and recognition are never started
fn offline_controller(cfg: &Config, store: Arc<JsonFileStore>) -> SessionController {
    let session_config = SessionConfig::from_config(cfg);
    let capture = Box::new(WavFileSource::new(
        PathBuf::new(),
        session_config.capture_config(),
    ));
    let engine = Box::new(NatsEngine::new(
        &cfg.transcription.nats_url,
        format!("meeting-{}", Uuid::new_v4()),
    ));
    let store: Arc<dyn PersistenceGateway> = store;
    SessionController::new(session_config, capture, engine, store)
}

async fn search(store: Arc<JsonFileStore>, query: &str) -> Result<()> {
    let meetings = store.search_meetings(query).await?;
    println!("Meetings ({}):", meetings.len());
    for meeting in meetings {
        println!("  {}  {}", meeting.id, meeting.title);
    }

    let segments = store.search_transcripts(query).await?;
    println!("Segments ({}):", segments.len());
    for segment in segments {
        println!("  {}", segment.render_line());
    }

    Ok(())
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}
