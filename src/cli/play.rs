//! Interactive playback command

use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use crate::application::ports::TraceStore;
use crate::application::{PlaybackController, PlaybackState};
use crate::domain::trace::{location_at, nearest_location_to, Annotation, AnnotationKind, Trace};
use crate::infrastructure::RodioAudioOutput;

use super::presenter::Presenter;

const PLAY_HELP: &str = "commands: [p]lay/pause  seek <sec>  j <n> jump to annotation  \
n <lat> <lng> jump to nearest point  a <text> annotate  [q]uit";

/// Run interactive playback of a stored trace.
pub async fn run_play<S: TraceStore>(
    id: Uuid,
    store: &S,
    presenter: &mut Presenter,
) -> Result<(), String> {
    let trace = store.get(id).await.map_err(|e| e.to_string())?;
    // Working copy for post-hoc annotations added during playback
    let mut working = trace.clone();

    let controller = PlaybackController::new(trace, RodioAudioOutput::new());
    controller.load().await.map_err(|e| e.to_string())?;

    presenter.info(PLAY_HELP);
    print_annotations(presenter, &controller.trace().annotations);
    presenter.start_spinner("ready");

    let duration_sec = controller.trace().duration_sec;
    let snapshots = controller.snapshots();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut status_tick = tokio::time::interval(std::time::Duration::from_millis(200));

    loop {
        tokio::select! {
            _ = status_tick.tick() => {
                let snapshot = snapshots.borrow().clone();
                presenter.update_spinner(&Presenter::format_playback_status(&snapshot, duration_sec));
            }
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => {
                let Ok(Some(line)) = line else { break };
                if let Err(message) =
                    handle_line(&line, &controller, &mut working, store, presenter).await
                {
                    presenter.warn(&message);
                }
                if line.trim() == "q" {
                    break;
                }
            }
        }
    }

    controller.pause().await.map_err(|e| e.to_string())?;
    presenter.spinner_success("playback closed");
    Ok(())
}

async fn handle_line<S: TraceStore>(
    line: &str,
    controller: &PlaybackController<RodioAudioOutput>,
    working: &mut Trace,
    store: &S,
    presenter: &Presenter,
) -> Result<(), String> {
    let trimmed = line.trim();
    match trimmed {
        "" => Ok(()),
        "p" => {
            if controller.playback_state().await == PlaybackState::Playing {
                controller.pause().await.map_err(|e| e.to_string())
            } else {
                controller.play().await.map_err(|e| e.to_string())
            }
        }
        "q" => Ok(()),
        _ => {
            if let Some(target) = trimmed.strip_prefix("seek ") {
                let seconds: f64 = target
                    .trim()
                    .parse()
                    .map_err(|_| format!("not a number: {target}"))?;
                controller.seek(seconds).await.map_err(|e| e.to_string())
            } else if let Some(index) = trimmed.strip_prefix("j ") {
                let index: usize = index
                    .trim()
                    .parse()
                    .map_err(|_| format!("not an index: {index}"))?;
                let annotation = controller
                    .trace()
                    .annotations
                    .get(index)
                    .ok_or_else(|| format!("no annotation #{index}"))?;
                controller
                    .jump_to_annotation(annotation.id)
                    .await
                    .map_err(|e| e.to_string())
            } else if let Some(point) = trimmed.strip_prefix("n ") {
                let mut parts = point.split_whitespace();
                let (lat, lng) = match (parts.next(), parts.next()) {
                    (Some(lat), Some(lng)) => (
                        lat.parse::<f64>().map_err(|_| format!("not a latitude: {lat}"))?,
                        lng.parse::<f64>().map_err(|_| format!("not a longitude: {lng}"))?,
                    ),
                    _ => return Err("usage: n <lat> <lng>".to_string()),
                };
                let sample = *nearest_location_to(controller.trace(), lat, lng)
                    .ok_or_else(|| "trace has no location samples".to_string())?;
                controller
                    .jump_to_location(&sample)
                    .await
                    .map_err(|e| e.to_string())
            } else if let Some(text) = trimmed.strip_prefix("a ") {
                annotate_at_position(controller, working, store, text.trim()).await?;
                presenter.success("annotation saved");
                Ok(())
            } else {
                Err(format!("unknown command: {trimmed}"))
            }
        }
    }
}

/// Add a post-hoc annotation at the current playback position and persist
/// the whole updated trace.
async fn annotate_at_position<S: TraceStore>(
    controller: &PlaybackController<RodioAudioOutput>,
    working: &mut Trace,
    store: &S,
    text: &str,
) -> Result<(), String> {
    let snapshot = controller.snapshots().borrow().clone();
    let timestamp_ms = snapshot.display_ms;
    let location = location_at(working, timestamp_ms).copied();
    working.push_annotation(Annotation::new(
        AnnotationKind::Comment,
        timestamp_ms,
        Some(text.to_string()),
        location,
    ));
    store.put(working).await.map_err(|e| e.to_string())
}

fn print_annotations(presenter: &Presenter, annotations: &[Annotation]) {
    for (index, annotation) in annotations.iter().enumerate() {
        presenter.info(&format!(
            "  #{index} {} {} {}",
            Presenter::format_clock(annotation.timestamp_ms / 1000),
            annotation.kind,
            annotation.text.as_deref().unwrap_or("")
        ));
    }
}
