//! Playback controller use case
//!
//! Drives audio position and keeps the displayed location in sync with it.
//! While playing, a single sync task reads the audio clock once per frame
//! interval and re-resolves the location through the timeline index; the
//! task is aborted the instant playback stops, so no stale step can fire
//! after a pause or a later seek.

use std::sync::Arc;
use std::time::Duration;

use log::warn;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::domain::geo::LocationSample;
use crate::domain::trace::{annotations_near, Annotation, TimelineCursor, Trace};

use super::ports::{AudioOutput, AudioOutputError};

/// Interval between sync steps while playing (~30 fps).
const SYNC_INTERVAL: Duration = Duration::from_millis(33);

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error(transparent)]
    Audio(#[from] AudioOutputError),

    #[error("Trace has no audio asset")]
    NoAudio,

    #[error("Annotation not found: {0}")]
    AnnotationNotFound(Uuid),

    #[error("Playback is not loaded yet")]
    NotReady,
}

/// Playback states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackState {
    Loading,
    Ready,
    Playing,
    Paused,
    /// Reached the end of the asset. Behaves like `Paused` for every
    /// operation except `play`, which rewinds first if the end was reached
    /// by natural playback.
    Ended,
}

/// Point-in-time view of playback, published on every sync step and on
/// every explicit state change.
#[derive(Debug, Clone)]
pub struct PlaybackSnapshot {
    pub state: PlaybackState,
    /// Audio position, exact floating-point seconds.
    pub position_sec: f64,
    /// Display time: floor of the position in milliseconds. Floored so the
    /// readout never flickers ahead of a sample boundary.
    pub display_ms: u64,
    pub location: Option<LocationSample>,
}

struct PlayState {
    state: PlaybackState,
    ended_naturally: bool,
    cursor: TimelineCursor,
    location: Option<LocationSample>,
}

/// Playback controller for one loaded trace.
pub struct PlaybackController<P>
where
    P: AudioOutput + 'static,
{
    player: Arc<P>,
    trace: Arc<Trace>,
    state: Arc<Mutex<PlayState>>,
    snapshot_tx: watch::Sender<PlaybackSnapshot>,
    sync_task: Mutex<Option<JoinHandle<()>>>,
}

impl<P> PlaybackController<P>
where
    P: AudioOutput + 'static,
{
    /// Create a controller in loading state.
    pub fn new(trace: Trace, player: P) -> Self {
        let (snapshot_tx, _) = watch::channel(PlaybackSnapshot {
            state: PlaybackState::Loading,
            position_sec: 0.0,
            display_ms: 0,
            location: None,
        });
        Self {
            player: Arc::new(player),
            trace: Arc::new(trace),
            state: Arc::new(Mutex::new(PlayState {
                state: PlaybackState::Loading,
                ended_naturally: false,
                cursor: TimelineCursor::new(),
                location: None,
            })),
            snapshot_tx,
            sync_task: Mutex::new(None),
        }
    }

    /// Load the trace's audio asset and resolve the initial location.
    pub async fn load(&self) -> Result<(), PlaybackError> {
        let asset = self.trace.audio.as_ref().ok_or(PlaybackError::NoAudio)?;
        self.player.load(asset).await?;

        let mut state = self.state.lock().await;
        state.state = PlaybackState::Ready;
        state.location = state.cursor.location_at(&self.trace, 0).copied();
        self.publish(&state, 0.0);
        Ok(())
    }

    /// Watch channel for display updates.
    pub fn snapshots(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub async fn playback_state(&self) -> PlaybackState {
        self.state.lock().await.state
    }

    /// The trace being played.
    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    /// Trace duration in seconds, the upper seek bound.
    pub fn duration_sec(&self) -> f64 {
        self.trace.duration_sec as f64
    }

    /// Start or resume playback. If the asset previously ran to its natural
    /// end, playback restarts from 0; after an explicit pause near the end
    /// it resumes in place.
    pub async fn play(&self) -> Result<(), PlaybackError> {
        {
            let mut state = self.state.lock().await;
            match state.state {
                PlaybackState::Loading => return Err(PlaybackError::NotReady),
                PlaybackState::Playing => return Ok(()),
                PlaybackState::Ready | PlaybackState::Paused => {}
                PlaybackState::Ended => {
                    if state.ended_naturally {
                        state.ended_naturally = false;
                        self.player.seek(0.0)?;
                        state.cursor = TimelineCursor::new();
                        state.location = state.cursor.location_at(&self.trace, 0).copied();
                    }
                }
            }
            self.player.play()?;
            state.state = PlaybackState::Playing;
            self.publish(&state, self.player.position_sec());
        }
        self.spawn_sync_loop().await;
        Ok(())
    }

    /// Pause playback and cancel the sync loop.
    pub async fn pause(&self) -> Result<(), PlaybackError> {
        self.cancel_sync_loop().await;
        let mut state = self.state.lock().await;
        if state.state != PlaybackState::Playing {
            return Ok(());
        }
        self.player.pause()?;
        state.state = PlaybackState::Paused;
        self.publish(&state, self.player.position_sec());
        Ok(())
    }

    /// Seek to `time_sec`, clamped to `[0, duration]`. Valid in any
    /// non-loading state; the displayed location updates immediately, not
    /// on the next sync tick.
    pub async fn seek(&self, time_sec: f64) -> Result<(), PlaybackError> {
        let mut state = self.state.lock().await;
        if state.state == PlaybackState::Loading {
            return Err(PlaybackError::NotReady);
        }
        let target = time_sec.clamp(0.0, self.duration_sec());
        self.player.seek(target)?;
        // Any seek clears the natural-end flag: a subsequent play resumes
        // from the sought position
        state.ended_naturally = false;
        let display_ms = floor_ms(target);
        state.location = state.cursor.location_at(&self.trace, display_ms).copied();
        self.publish(&state, target);
        Ok(())
    }

    /// Jump the audio position to a location sample on the path.
    pub async fn jump_to_location(&self, sample: &LocationSample) -> Result<(), PlaybackError> {
        self.seek(sample.timestamp_ms as f64 / 1000.0).await
    }

    /// Jump the audio position to an annotation's timestamp.
    pub async fn jump_to_annotation(&self, id: Uuid) -> Result<(), PlaybackError> {
        let annotation = self
            .trace
            .annotations
            .iter()
            .find(|a| a.id == id)
            .ok_or(PlaybackError::AnnotationNotFound(id))?;
        let target_ms = annotation.timestamp_ms;
        self.seek(target_ms as f64 / 1000.0).await
    }

    /// Annotations within `window_ms` of the current position, ordered by
    /// timestamp. Used to highlight the current transcript entry.
    pub async fn annotations_near_position(&self, window_ms: u64) -> Vec<Annotation> {
        let position = self.player.position_sec();
        annotations_near(&self.trace, floor_ms(position), window_ms)
            .into_iter()
            .cloned()
            .collect()
    }

    async fn spawn_sync_loop(&self) {
        let mut task = self.sync_task.lock().await;
        if let Some(previous) = task.take() {
            previous.abort();
        }

        let player = Arc::clone(&self.player);
        let trace = Arc::clone(&self.trace);
        let state = Arc::clone(&self.state);
        let snapshot_tx = self.snapshot_tx.clone();

        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SYNC_INTERVAL);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let mut state = state.lock().await;
                if state.state != PlaybackState::Playing {
                    break;
                }

                // One sync step: read audio clock, resolve location, publish.
                // A failing step holds the last known state instead of
                // crashing the controller.
                let position = player.position_sec();
                if position.is_finite() {
                    let display_ms = floor_ms(position);
                    if let Some(location) = state.cursor.location_at(&trace, display_ms) {
                        state.location = Some(*location);
                    }
                    let _ = snapshot_tx.send(PlaybackSnapshot {
                        state: state.state,
                        position_sec: position,
                        display_ms,
                        location: state.location,
                    });
                } else {
                    warn!("audio clock returned a non-finite position; holding last state");
                }

                if player.is_finished() {
                    state.state = PlaybackState::Ended;
                    state.ended_naturally = true;
                    let _ = snapshot_tx.send(PlaybackSnapshot {
                        state: state.state,
                        position_sec: position,
                        display_ms: floor_ms(position),
                        location: state.location,
                    });
                    break;
                }
            }
        }));
    }

    async fn cancel_sync_loop(&self) {
        if let Some(task) = self.sync_task.lock().await.take() {
            task.abort();
        }
    }

    fn publish(&self, state: &PlayState, position_sec: f64) {
        let _ = self.snapshot_tx.send(PlaybackSnapshot {
            state: state.state,
            position_sec,
            display_ms: floor_ms(position_sec),
            location: state.location,
        });
    }
}

/// Floor a seconds position to whole milliseconds for display lookups.
fn floor_ms(position_sec: f64) -> u64 {
    (position_sec.max(0.0) * 1000.0).floor() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geo::RawFix;
    use crate::domain::trace::{Annotation, AnnotationKind, AudioAsset, AudioMimeType};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct FakePlayer {
        position: StdMutex<f64>,
        playing: AtomicBool,
        finished: AtomicBool,
    }

    impl FakePlayer {
        fn set_position(&self, pos: f64) {
            *self.position.lock().unwrap() = pos;
        }

        fn finish(&self) {
            self.finished.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl AudioOutput for FakePlayer {
        async fn load(&self, _asset: &AudioAsset) -> Result<(), AudioOutputError> {
            Ok(())
        }

        fn play(&self) -> Result<(), AudioOutputError> {
            self.playing.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn pause(&self) -> Result<(), AudioOutputError> {
            self.playing.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn seek(&self, position_sec: f64) -> Result<(), AudioOutputError> {
            *self.position.lock().unwrap() = position_sec;
            self.finished.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn position_sec(&self) -> f64 {
            *self.position.lock().unwrap()
        }

        fn is_finished(&self) -> bool {
            self.finished.load(Ordering::SeqCst)
        }
    }

    fn sample(ts: u64) -> LocationSample {
        LocationSample::from_fix(&RawFix::at(40.0 + ts as f64 * 1e-7, -73.9), ts)
    }

    fn trace_fixture() -> Trace {
        Trace {
            id: Uuid::new_v4(),
            start_time: Utc::now(),
            duration_sec: 30,
            locations: vec![sample(0), sample(5000), sample(12000)],
            annotations: vec![Annotation::new(
                AnnotationKind::Star,
                5000,
                Some("bridge".into()),
                None,
            )],
            audio: Some(AudioAsset::from_bytes(vec![0u8; 8], AudioMimeType::Wav)),
            created_at: Utc::now(),
            transcription: None,
        }
    }

    async fn loaded_controller() -> PlaybackController<FakePlayer> {
        let controller = PlaybackController::new(trace_fixture(), FakePlayer::default());
        controller.load().await.unwrap();
        controller
    }

    #[tokio::test]
    async fn load_resolves_initial_location() {
        let controller = loaded_controller().await;
        assert_eq!(controller.playback_state().await, PlaybackState::Ready);
        let snapshot = controller.snapshots().borrow().clone();
        assert_eq!(snapshot.location.unwrap().timestamp_ms, 0);
    }

    #[tokio::test]
    async fn trace_without_audio_fails_load() {
        let mut trace = trace_fixture();
        trace.audio = None;
        let controller = PlaybackController::new(trace, FakePlayer::default());
        assert!(matches!(
            controller.load().await.unwrap_err(),
            PlaybackError::NoAudio
        ));
    }

    #[tokio::test]
    async fn play_before_load_is_rejected() {
        let controller = PlaybackController::new(trace_fixture(), FakePlayer::default());
        assert!(matches!(
            controller.play().await.unwrap_err(),
            PlaybackError::NotReady
        ));
    }

    #[tokio::test]
    async fn seek_clamps_and_resolves_immediately() {
        let controller = loaded_controller().await;
        controller.seek(7.0).await.unwrap();
        let snapshot = controller.snapshots().borrow().clone();
        // Between samples: the next sample at or after the query
        assert_eq!(snapshot.location.unwrap().timestamp_ms, 12000);

        controller.seek(99999.0).await.unwrap();
        assert_eq!(controller.player.position_sec(), 30.0);

        controller.seek(-5.0).await.unwrap();
        assert_eq!(controller.player.position_sec(), 0.0);
    }

    #[tokio::test]
    async fn sync_loop_tracks_position_while_playing() {
        let controller = loaded_controller().await;
        controller.play().await.unwrap();
        controller.player.set_position(5.5);
        tokio::time::sleep(Duration::from_millis(120)).await;

        let snapshot = controller.snapshots().borrow().clone();
        assert_eq!(snapshot.state, PlaybackState::Playing);
        assert_eq!(snapshot.location.unwrap().timestamp_ms, 12000);
        assert_eq!(snapshot.display_ms, 5500);
    }

    #[tokio::test]
    async fn pause_stops_the_sync_loop() {
        let controller = loaded_controller().await;
        controller.play().await.unwrap();
        controller.pause().await.unwrap();
        assert_eq!(controller.playback_state().await, PlaybackState::Paused);

        // Position changes while paused must not be picked up
        controller.player.set_position(9.0);
        tokio::time::sleep(Duration::from_millis(120)).await;
        let snapshot = controller.snapshots().borrow().clone();
        assert_ne!(snapshot.display_ms, 9000);
    }

    #[tokio::test]
    async fn natural_end_rewinds_on_play() {
        let controller = loaded_controller().await;
        controller.play().await.unwrap();
        controller.player.set_position(30.0);
        controller.player.finish();
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(controller.playback_state().await, PlaybackState::Ended);

        controller.play().await.unwrap();
        // Rewound to 0 before resuming
        assert!(controller.player.position_sec() < 0.001);
        assert_eq!(controller.playback_state().await, PlaybackState::Playing);
    }

    #[tokio::test]
    async fn seek_after_natural_end_resumes_in_place() {
        let controller = loaded_controller().await;
        controller.play().await.unwrap();
        controller.player.set_position(30.0);
        controller.player.finish();
        tokio::time::sleep(Duration::from_millis(120)).await;

        controller.seek(12.0).await.unwrap();
        controller.play().await.unwrap();
        assert_eq!(controller.player.position_sec(), 12.0);
    }

    #[tokio::test]
    async fn jump_to_annotation_seeks_its_timestamp() {
        let controller = loaded_controller().await;
        let id = controller.trace().annotations[0].id;
        controller.jump_to_annotation(id).await.unwrap();
        assert_eq!(controller.player.position_sec(), 5.0);
        let snapshot = controller.snapshots().borrow().clone();
        assert_eq!(snapshot.location.unwrap().timestamp_ms, 5000);
    }

    #[tokio::test]
    async fn jump_to_unknown_annotation_fails() {
        let controller = loaded_controller().await;
        let err = controller.jump_to_annotation(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, PlaybackError::AnnotationNotFound(_)));
    }

    #[tokio::test]
    async fn annotations_near_position_orders_by_timestamp() {
        let controller = loaded_controller().await;
        controller.player.set_position(5.2);
        let hits = controller.annotations_near_position(1000).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].timestamp_ms, 5000);
    }
}
