//! Interactive session runner
//!
//! Wires the capture and audio sessions to one relay connection and drives
//! them from stdin lines until `/quit`, end of input, or Ctrl+C.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::application::ports::{Camera, CameraError};
use crate::application::{
    AudioError, AudioSession, CaptureError, CaptureSession, LocationProvider, RecordingOutcome,
    RelayCoordinator, RelayEvent, RelayOutbox, StopResult,
};
use crate::domain::capture::CaptureArtifact;
use crate::domain::config::AppConfig;
use crate::domain::envelope::Envelope;
use crate::domain::recording::AUTO_STOP;
use crate::infrastructure::{
    CommandCamera, ConfiguredPermissions, CpalRecorder, FileCamera, FixedGeolocator,
};

use super::app::{connect_hub, wait_closed, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE_ERROR};
use super::presenter::Presenter;

const PROGRESS_TICK: Duration = Duration::from_millis(250);

const HELP: &str = "\
Type a message and press Enter to send it.
  /photo   take a photo and send it with the current location
  /record  start a voice clip (stops on its own after 10s)
  /stop    stop the voice clip and send it
  /log     show received messages
  /status  show the connection state
  /help    show this help
  /quit    leave";

type Permissions = Arc<ConfiguredPermissions>;
type Capture = CaptureSession<Box<dyn Camera>, FixedGeolocator, Permissions>;
type Audio = AudioSession<CpalRecorder, Permissions>;

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Say(String),
    Photo,
    Record,
    Stop,
    Log,
    Status,
    Help,
    Quit,
    Unknown(String),
    Empty,
}

impl SessionCommand {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }
        if !trimmed.starts_with('/') {
            return Self::Say(line.trim_end_matches(['\r', '\n']).to_string());
        }
        match trimmed.to_lowercase().as_str() {
            "/photo" => Self::Photo,
            "/record" => Self::Record,
            "/stop" => Self::Stop,
            "/log" => Self::Log,
            "/status" => Self::Status,
            "/help" | "/?" => Self::Help,
            "/quit" | "/exit" => Self::Quit,
            _ => Self::Unknown(trimmed.to_string()),
        }
    }
}

/// Results that arrive from the capture and audio sessions
enum Update {
    Photo(CaptureArtifact),
    PhotoFailed(CaptureError),
    Audio(RecordingOutcome),
}

/// Pick the camera: an image file when given, else the capture command
fn build_camera(
    config: &AppConfig,
    photo_source: Option<PathBuf>,
) -> Result<Box<dyn Camera>, CameraError> {
    if let Some(path) = photo_source {
        return Ok(Box::new(FileCamera::new(path)));
    }
    match config.camera_command() {
        Some(command_line) => Ok(Box::new(CommandCamera::from_command_line(command_line)?)),
        None => Ok(Box::new(CommandCamera::default())),
    }
}

/// Run the interactive session until the user leaves
pub async fn run_session(config: AppConfig, photo_source: Option<PathBuf>) -> ExitCode {
    let mut presenter = Presenter::new();

    let endpoint = match config.endpoint_or_default() {
        Ok(endpoint) => endpoint,
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_USAGE_ERROR);
        }
    };
    let fix = match config.fixed_location() {
        Ok(fix) => fix,
        Err(e) => {
            presenter.error(&format!("Invalid location in config: {}", e));
            return ExitCode::from(EXIT_USAGE_ERROR);
        }
    };
    let camera = match build_camera(&config, photo_source) {
        Ok(camera) => camera,
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_USAGE_ERROR);
        }
    };

    let (updates_tx, mut updates) = mpsc::unbounded_channel();
    let permissions: Permissions = Arc::new(ConfiguredPermissions::from_config(&config));

    let photo_tx = updates_tx.clone();
    let capture: Arc<Capture> = Arc::new(
        CaptureSession::new(
            camera,
            Arc::clone(&permissions),
            LocationProvider::new(FixedGeolocator::from_config(fix), Arc::clone(&permissions)),
        )
        .with_handoff(Arc::new(move |artifact| {
            let _ = photo_tx.send(Update::Photo(artifact));
        })),
    );

    let audio_tx = updates_tx.clone();
    let audio: Audio = AudioSession::with_handoff(
        CpalRecorder::new(),
        Arc::clone(&permissions),
        Arc::new(move |outcome| {
            let _ = audio_tx.send(Update::Audio(outcome));
        }),
    );

    let hub = connect_hub(endpoint.clone());
    let mut relay = RelayCoordinator::new(hub.acquire());
    let outbox = relay.outbox();

    presenter.info(&format!(
        "Connecting to {}. Type /help for commands.",
        endpoint
    ));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut progress = tokio::time::interval(PROGRESS_TICK);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let code = loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break EXIT_SUCCESS,
                    Err(e) => {
                        presenter.error(&format!("Failed to read input: {}", e));
                        break EXIT_ERROR;
                    }
                };
                match SessionCommand::parse(&line) {
                    SessionCommand::Quit => break EXIT_SUCCESS,
                    command => {
                        handle_command(
                            command,
                            &mut presenter,
                            &relay,
                            &outbox,
                            &capture,
                            &updates_tx,
                            &audio,
                        )
                        .await;
                    }
                }
            }
            Some(event) = relay.next_event() => show_event(&presenter, event),
            Some(update) = updates.recv() => deliver(update, &mut presenter, &outbox),
            _ = progress.tick(), if presenter.is_spinner_active() => {
                if let Some(elapsed) = audio.elapsed().await {
                    presenter.update_recording_progress(elapsed, AUTO_STOP);
                }
            }
            _ = &mut ctrl_c => {
                debug!("interrupted");
                break EXIT_SUCCESS;
            }
        }
    };

    audio.shutdown().await;
    presenter.stop_spinner();

    let channel = hub.current();
    drop(relay);
    if let Some(channel) = channel {
        wait_closed(&channel).await;
    }

    ExitCode::from(code)
}

async fn handle_command(
    command: SessionCommand,
    presenter: &mut Presenter,
    relay: &RelayCoordinator,
    outbox: &RelayOutbox,
    capture: &Arc<Capture>,
    updates: &mpsc::UnboundedSender<Update>,
    audio: &Audio,
) {
    match command {
        SessionCommand::Say(text) => {
            let envelope = Envelope::text(text);
            match outbox.send(&envelope) {
                Ok(()) => presenter.outgoing(&envelope),
                Err(e) => presenter.error(&e.to_string()),
            }
        }
        SessionCommand::Photo => {
            presenter.info("Taking photo...");
            let capture = Arc::clone(capture);
            let updates = updates.clone();
            tokio::spawn(async move {
                capture.request_permission().await;
                // Success is reported through the capture handoff.
                if let Err(e) = capture.capture().await {
                    let _ = updates.send(Update::PhotoFailed(e));
                }
            });
        }
        SessionCommand::Record => match audio.start().await {
            Ok(_) => presenter.show_recording_progress(AUTO_STOP),
            Err(AudioError::AlreadyRecording(_)) => presenter.warn("Already recording"),
            Err(e) => presenter.error(&e.to_string()),
        },
        SessionCommand::Stop => {
            if audio.stop().await == StopResult::AlreadyIdle {
                presenter.warn("Not recording");
            }
        }
        SessionCommand::Log => {
            let log = relay.display_log();
            if log.is_empty() {
                presenter.info("No messages yet");
            }
            for line in log.lines() {
                presenter.output(&line);
            }
        }
        SessionCommand::Status => presenter.connection_status(&relay.state()),
        SessionCommand::Help => presenter.output(HELP),
        SessionCommand::Unknown(command) => {
            presenter.warn(&format!("Unknown command {}. Type /help", command))
        }
        SessionCommand::Empty | SessionCommand::Quit => {}
    }
}

fn show_event(presenter: &Presenter, event: RelayEvent) {
    match event {
        RelayEvent::Received(envelope) => presenter.incoming(&envelope),
        RelayEvent::Malformed { error, .. } => {
            presenter.warn(&format!("Ignored malformed message: {}", error))
        }
        RelayEvent::Status(state) => presenter.connection_status(&state),
        RelayEvent::TransportError(reason) => presenter.error(&reason),
    }
}

/// Relay a finished photo or clip
fn deliver(update: Update, presenter: &mut Presenter, outbox: &RelayOutbox) {
    let envelope = match update {
        Update::Photo(artifact) => Envelope::photo(artifact),
        Update::PhotoFailed(e) => {
            presenter.error(&e.to_string());
            return;
        }
        Update::Audio(RecordingOutcome::Finished { clip, reason, .. }) => {
            presenter.spinner_success(&format!(
                "Recorded {} ({})",
                clip.human_readable_size(),
                reason
            ));
            Envelope::audio(&clip)
        }
        Update::Audio(RecordingOutcome::Failed { error, .. }) => {
            presenter.spinner_fail(&error.to_string());
            return;
        }
    };

    match outbox.send(&envelope) {
        Ok(()) => presenter.outgoing(&envelope),
        Err(e) => {
            warn!(kind = %envelope.kind(), error = %e, "relay rejected capture");
            presenter.error(&e.to_string());
        }
    }
}
