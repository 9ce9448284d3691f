//! Interactive record command

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::application::ports::{LocationError, LocationSource, LocationSubscription, TraceStore};
use crate::application::CaptureSession;
use crate::domain::geo::GeoFilter;
use crate::domain::trace::{AnnotationKind, Trace};
use crate::infrastructure::audio::AssetEncoder;
use crate::infrastructure::{CpalMicrophone, GpsdLocationSource};

use super::presenter::Presenter;

/// Options for an interactive recording session
#[derive(Debug, Clone)]
pub struct RecordOptions {
    pub no_location: bool,
    pub encoder: AssetEncoder,
    pub min_movement_m: f64,
    pub gpsd_host: String,
    pub gpsd_port: u16,
}

/// Location input selected by flags: a gpsd stream, or nothing at all.
enum LocationInput {
    Gpsd(GpsdLocationSource),
    Disabled,
}

#[async_trait]
impl LocationSource for LocationInput {
    async fn subscribe(&self) -> Result<LocationSubscription, LocationError> {
        match self {
            Self::Gpsd(source) => source.subscribe().await,
            Self::Disabled => Err(LocationError::Unavailable),
        }
    }
}

const RECORD_HELP: &str =
    "commands: [p]ause  [r]esume  a <text> comment  [m]ark pin  [s]top (or Ctrl-C)";

/// Run an interactive recording session and store the finished trace.
pub async fn run_record<S: TraceStore>(
    options: RecordOptions,
    store: &S,
    presenter: &mut Presenter,
) -> Result<(), String> {
    let audio = CpalMicrophone::new(options.encoder);
    let location = if options.no_location {
        LocationInput::Disabled
    } else {
        LocationInput::Gpsd(GpsdLocationSource::new(
            options.gpsd_host.clone(),
            options.gpsd_port,
        ))
    };
    let filter = GeoFilter::with_min_movement(options.min_movement_m);
    let session = CaptureSession::new(audio, location, filter);

    let outcome = session.start().await.map_err(|e| e.to_string())?;
    if let Some(warning) = outcome.location_warning {
        if !options.no_location {
            presenter.warn(&format!("{warning} — recording audio-only"));
        }
    }

    presenter.info(RECORD_HELP);
    presenter.start_spinner("recording");

    let snapshots = session.snapshots();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut status_tick = tokio::time::interval(std::time::Duration::from_millis(250));

    let trace: Trace = loop {
        tokio::select! {
            _ = status_tick.tick() => {
                let snapshot = snapshots.borrow().clone();
                presenter.update_spinner(&Presenter::format_capture_status(&snapshot));
            }
            _ = tokio::signal::ctrl_c() => {
                break session.stop().await.map_err(|e| e.to_string())?;
            }
            line = lines.next_line() => {
                let Ok(Some(line)) = line else {
                    // stdin closed: finish the recording
                    break session.stop().await.map_err(|e| e.to_string())?;
                };
                match parse_command(&line) {
                    Some(RecordCommand::Pause) => {
                        session.pause().await.map_err(|e| e.to_string())?;
                    }
                    Some(RecordCommand::Resume) => {
                        session.resume().await.map_err(|e| e.to_string())?;
                    }
                    Some(RecordCommand::Comment(text)) => {
                        session
                            .add_annotation(AnnotationKind::Comment, Some(text), None, None)
                            .await
                            .map_err(|e| e.to_string())?;
                    }
                    Some(RecordCommand::Pin) => {
                        session
                            .add_annotation(AnnotationKind::MapPin, None, None, None)
                            .await
                            .map_err(|e| e.to_string())?;
                    }
                    Some(RecordCommand::Stop) => {
                        break session.stop().await.map_err(|e| e.to_string())?;
                    }
                    None => {}
                }
            }
        }
    };

    presenter.spinner_success(&format!(
        "recorded {} ({} samples, {} annotations)",
        Presenter::format_clock(trace.duration_sec),
        trace.locations.len(),
        trace.annotations.len()
    ));

    store.put(&trace).await.map_err(|e| e.to_string())?;
    presenter.success(&format!("saved saunter {}", trace.id));
    Ok(())
}

enum RecordCommand {
    Pause,
    Resume,
    Comment(String),
    Pin,
    Stop,
}

fn parse_command(line: &str) -> Option<RecordCommand> {
    let trimmed = line.trim();
    match trimmed {
        "p" | "pause" => Some(RecordCommand::Pause),
        "r" | "resume" => Some(RecordCommand::Resume),
        "m" | "mark" => Some(RecordCommand::Pin),
        "s" | "q" | "stop" => Some(RecordCommand::Stop),
        _ => trimmed
            .strip_prefix("a ")
            .map(|text| RecordCommand::Comment(text.trim().to_string())),
    }
}
