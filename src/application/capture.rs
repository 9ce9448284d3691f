//! Capture session use case
//!
//! Owns the live recording state machine: audio stream, location list,
//! annotation list, pause/resume. Location fixes arrive on an mpsc stream
//! and are drained by a single pump task; all state lives behind one mutex,
//! so mutations are atomic from the caller's perspective.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use log::warn;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::domain::geo::{GeoFilter, LocationSample};
use crate::domain::session::{InvalidStateTransition, SessionClock, SessionLifecycle, SessionState};
use crate::domain::trace::{Annotation, AnnotationKind, Trace};

use super::ports::{AudioInput, AudioInputError, LocationError, LocationSource};

/// Errors from the capture session use case
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Fatal: the session cannot start without audio.
    #[error("Audio input unavailable: {0}")]
    AudioUnavailable(#[source] AudioInputError),

    #[error("Audio capture failed: {0}")]
    Audio(#[from] AudioInputError),

    #[error(transparent)]
    InvalidState(#[from] InvalidStateTransition),
}

/// Result of starting a session.
///
/// A missing location stream is a recoverable warning, not an error: the
/// session proceeds audio-only.
#[derive(Debug)]
pub struct StartOutcome {
    pub location_warning: Option<LocationError>,
}

/// Point-in-time view of the capture session, published on every change.
#[derive(Debug, Clone)]
pub struct CaptureSnapshot {
    pub state: SessionState,
    pub effective_ms: u64,
    pub location_count: usize,
    pub annotation_count: usize,
    pub last_location: Option<LocationSample>,
}

impl CaptureSnapshot {
    fn idle() -> Self {
        Self {
            state: SessionState::Idle,
            effective_ms: 0,
            location_count: 0,
            annotation_count: 0,
            last_location: None,
        }
    }
}

/// Transient capture state, owned exclusively by the session and not
/// persisted until stop.
#[derive(Debug, Default)]
struct CaptureState {
    lifecycle: SessionLifecycle,
    clock: Option<SessionClock>,
    start_time: Option<DateTime<Utc>>,
    locations: Vec<LocationSample>,
    annotations: Vec<Annotation>,
    finished: Option<Trace>,
}

impl CaptureState {
    fn snapshot(&self, now: Instant) -> CaptureSnapshot {
        CaptureSnapshot {
            state: self.lifecycle.state(),
            effective_ms: self.clock.map(|c| c.effective_ms(now)).unwrap_or(0),
            location_count: self.locations.len(),
            annotation_count: self.annotations.len(),
            last_location: self.locations.last().copied(),
        }
    }
}

/// Capture session use case.
///
/// One instance records at most one trace; `stopped` is terminal and a new
/// recording requires a fresh instance.
pub struct CaptureSession<A, L>
where
    A: AudioInput,
    L: LocationSource,
{
    audio: A,
    location_source: L,
    filter: GeoFilter,
    state: Arc<Mutex<CaptureState>>,
    snapshot_tx: watch::Sender<CaptureSnapshot>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl<A, L> CaptureSession<A, L>
where
    A: AudioInput,
    L: LocationSource,
{
    /// Create a new capture session in idle state
    pub fn new(audio: A, location_source: L, filter: GeoFilter) -> Self {
        let (snapshot_tx, _) = watch::channel(CaptureSnapshot::idle());
        Self {
            audio,
            location_source,
            filter,
            state: Arc::new(Mutex::new(CaptureState::default())),
            snapshot_tx,
            pump: Mutex::new(None),
        }
    }

    /// Watch channel carrying a snapshot after every state change.
    pub fn snapshots(&self) -> watch::Receiver<CaptureSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Get current session state
    pub async fn session_state(&self) -> SessionState {
        self.state.lock().await.lifecycle.state()
    }

    /// Current effective recording time in milliseconds.
    pub async fn effective_ms(&self) -> u64 {
        let state = self.state.lock().await;
        state
            .clock
            .map(|c| c.effective_ms(Instant::now()))
            .unwrap_or(0)
    }

    /// Samples accepted so far, in arrival order.
    pub async fn locations(&self) -> Vec<LocationSample> {
        self.state.lock().await.locations.clone()
    }

    /// Annotations recorded so far, in creation order.
    pub async fn annotations(&self) -> Vec<Annotation> {
        self.state.lock().await.annotations.clone()
    }

    /// Start recording: acquire audio (fatal on failure) and the location
    /// stream (non-fatal; surfaced as a warning in the outcome).
    pub async fn start(&self) -> Result<StartOutcome, CaptureError> {
        let mut state = self.state.lock().await;
        if state.lifecycle.state() != SessionState::Idle {
            return Err(CaptureError::InvalidState(InvalidStateTransition {
                current_state: state.lifecycle.state(),
                action: "start".to_string(),
            }));
        }

        self.audio
            .start()
            .await
            .map_err(CaptureError::AudioUnavailable)?;

        state.lifecycle.start()?;
        state.clock = Some(SessionClock::started_at(Instant::now()));
        state.start_time = Some(Utc::now());

        let location_warning = match self.location_source.subscribe().await {
            Ok(subscription) => {
                let pump = tokio::spawn(Self::pump_fixes(
                    subscription,
                    Arc::clone(&self.state),
                    self.filter,
                    self.snapshot_tx.clone(),
                ));
                *self.pump.lock().await = Some(pump);
                None
            }
            Err(e) => {
                warn!("location stream unavailable, recording audio-only: {e}");
                Some(e)
            }
        };

        self.publish_snapshot(&state);
        Ok(StartOutcome { location_warning })
    }

    /// Pause recording. No-op unless currently recording.
    pub async fn pause(&self) -> Result<(), CaptureError> {
        let mut state = self.state.lock().await;
        if !state.lifecycle.is_recording() {
            return Ok(());
        }
        let now = Instant::now();
        state.lifecycle.pause()?;
        if let Some(clock) = state.clock.as_mut() {
            clock.pause(now);
        }
        self.audio.pause().await?;
        self.publish_snapshot(&state);
        Ok(())
    }

    /// Resume recording. No-op unless currently paused.
    pub async fn resume(&self) -> Result<(), CaptureError> {
        let mut state = self.state.lock().await;
        if !state.lifecycle.is_paused() {
            return Ok(());
        }
        let now = Instant::now();
        state.lifecycle.resume()?;
        if let Some(clock) = state.clock.as_mut() {
            clock.resume(now);
        }
        self.audio.resume().await?;
        self.publish_snapshot(&state);
        Ok(())
    }

    /// Add an annotation at the current effective time, or at an explicit
    /// timestamp when annotating already-elapsed audio of this session.
    /// Snapshots the most recently accepted location sample.
    pub async fn add_annotation(
        &self,
        kind: AnnotationKind,
        text: Option<String>,
        image: Option<String>,
        explicit_ms: Option<u64>,
    ) -> Result<Annotation, CaptureError> {
        let mut state = self.state.lock().await;
        if !state.lifecycle.state().is_active() {
            return Err(CaptureError::InvalidState(InvalidStateTransition {
                current_state: state.lifecycle.state(),
                action: "add annotation".to_string(),
            }));
        }

        let timestamp_ms = match explicit_ms {
            Some(ms) => ms,
            None => state
                .clock
                .map(|c| c.effective_ms(Instant::now()))
                .unwrap_or(0),
        };
        let location = state.locations.last().copied();
        let mut annotation = Annotation::new(kind, timestamp_ms, text, location);
        if let Some(image) = image {
            annotation = annotation.with_image(image);
        }
        state.annotations.push(annotation.clone());
        self.publish_snapshot(&state);
        Ok(annotation)
    }

    /// Stop recording and finalize the trace.
    ///
    /// Both releases — the location pump and the audio input — are
    /// attempted regardless of the other failing. Calling stop again
    /// returns the already-finished trace.
    pub async fn stop(&self) -> Result<Trace, CaptureError> {
        let mut state = self.state.lock().await;
        if let Some(finished) = &state.finished {
            return Ok(finished.clone());
        }
        if !state.lifecycle.stop()? {
            // Stopped without a finished trace: a prior stop failed in
            // audio finalization. Nothing more to release.
            return Err(CaptureError::Audio(AudioInputError::NotCapturing));
        }

        let now = Instant::now();
        let duration_ms = state.clock.map(|c| c.effective_ms(now)).unwrap_or(0);

        // Location release first; abort is infallible
        if let Some(pump) = self.pump.lock().await.take() {
            pump.abort();
        }

        let audio_result = self.audio.stop().await;
        self.publish_snapshot(&state);
        let audio = audio_result?;

        let trace = Trace {
            id: Uuid::new_v4(),
            start_time: state.start_time.unwrap_or_else(Utc::now),
            duration_sec: duration_ms / 1000,
            locations: std::mem::take(&mut state.locations),
            annotations: std::mem::take(&mut state.annotations),
            audio: Some(audio),
            created_at: Utc::now(),
            transcription: None,
        };
        state.finished = Some(trace.clone());
        self.publish_snapshot(&state);
        Ok(trace)
    }

    fn publish_snapshot(&self, state: &CaptureState) {
        let _ = self.snapshot_tx.send(state.snapshot(Instant::now()));
    }

    /// Drain the fix stream for the lifetime of the recording.
    ///
    /// Fixes arriving while paused are suppressed entirely; accepted fixes
    /// are stamped with effective time, which makes the stored sequence
    /// non-decreasing by construction.
    async fn pump_fixes(
        mut subscription: super::ports::LocationSubscription,
        state: Arc<Mutex<CaptureState>>,
        filter: GeoFilter,
        snapshot_tx: watch::Sender<CaptureSnapshot>,
    ) {
        while let Some(fix) = subscription.next_fix().await {
            let now = Instant::now();
            let mut state = state.lock().await;
            if !state.lifecycle.is_recording() {
                continue;
            }
            if !filter.accept(&fix, state.locations.last()) {
                continue;
            }
            let Some(clock) = state.clock else { continue };
            let sample = LocationSample::from_fix(&fix, clock.effective_ms(now));
            state.locations.push(sample);
            let _ = snapshot_tx.send(state.snapshot(now));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geo::RawFix;
    use crate::domain::trace::{AudioAsset, AudioMimeType};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct FakeAudio {
        fail_start: bool,
        capturing: AtomicBool,
        pauses: AtomicUsize,
        resumes: AtomicUsize,
    }

    impl FakeAudio {
        fn failing() -> Self {
            Self {
                fail_start: true,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl AudioInput for FakeAudio {
        async fn start(&self) -> Result<(), AudioInputError> {
            if self.fail_start {
                return Err(AudioInputError::NoAudioDevice);
            }
            self.capturing.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn pause(&self) -> Result<(), AudioInputError> {
            self.pauses.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn resume(&self) -> Result<(), AudioInputError> {
            self.resumes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn stop(&self) -> Result<AudioAsset, AudioInputError> {
            self.capturing.store(false, Ordering::SeqCst);
            Ok(AudioAsset::from_bytes(vec![0u8; 4], AudioMimeType::Wav))
        }

        fn is_capturing(&self) -> bool {
            self.capturing.load(Ordering::SeqCst)
        }
    }

    struct FakeLocations {
        fixes: Vec<RawFix>,
        unavailable: bool,
    }

    impl FakeLocations {
        fn with_fixes(fixes: Vec<RawFix>) -> Self {
            Self {
                fixes,
                unavailable: false,
            }
        }

        fn unavailable() -> Self {
            Self {
                fixes: vec![],
                unavailable: true,
            }
        }
    }

    #[async_trait]
    impl LocationSource for FakeLocations {
        async fn subscribe(&self) -> Result<super::super::ports::LocationSubscription, LocationError>
        {
            if self.unavailable {
                return Err(LocationError::Unavailable);
            }
            let (tx, rx) = mpsc::channel(16);
            let fixes = self.fixes.clone();
            let feed = tokio::spawn(async move {
                for fix in fixes {
                    if tx.send(fix).await.is_err() {
                        break;
                    }
                }
                // Keep the channel open like a real sensor would
                std::future::pending::<()>().await;
            });
            Ok(super::super::ports::LocationSubscription::new(rx, feed))
        }
    }

    fn walk_fixes(count: usize) -> Vec<RawFix> {
        // Each step is ~11 m of latitude, well past the movement threshold
        (0..count)
            .map(|i| RawFix::at(40.0 + i as f64 * 1e-4, -73.9))
            .collect()
    }

    async fn settled_session(
        fixes: Vec<RawFix>,
    ) -> CaptureSession<FakeAudio, FakeLocations> {
        let session = CaptureSession::new(
            FakeAudio::default(),
            FakeLocations::with_fixes(fixes),
            GeoFilter::new(),
        );
        session.start().await.unwrap();
        // Let the pump drain the seeded fixes
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        session
    }

    #[tokio::test]
    async fn audio_failure_is_fatal_to_start() {
        let session = CaptureSession::new(
            FakeAudio::failing(),
            FakeLocations::with_fixes(vec![]),
            GeoFilter::new(),
        );
        let err = session.start().await.unwrap_err();
        assert!(matches!(err, CaptureError::AudioUnavailable(_)));
        assert_eq!(session.session_state().await, SessionState::Idle);
    }

    #[tokio::test]
    async fn location_failure_is_a_warning_not_an_error() {
        let session = CaptureSession::new(
            FakeAudio::default(),
            FakeLocations::unavailable(),
            GeoFilter::new(),
        );
        let outcome = session.start().await.unwrap();
        assert!(outcome.location_warning.is_some());
        assert_eq!(session.session_state().await, SessionState::Recording);

        let trace = session.stop().await.unwrap();
        assert!(trace.locations.is_empty());
        assert!(trace.audio.is_some());
    }

    #[tokio::test]
    async fn accepted_fixes_are_timestamped_non_decreasing() {
        let session = settled_session(walk_fixes(5)).await;
        let trace = session.stop().await.unwrap();
        assert_eq!(trace.locations.len(), 5);
        for pair in trace.locations.windows(2) {
            assert!(pair[0].timestamp_ms <= pair[1].timestamp_ms);
        }
    }

    #[tokio::test]
    async fn jittery_fixes_are_filtered() {
        // First fix accepted, the rest are within 2 m of it
        let mut fixes = vec![RawFix::at(40.0, -73.9)];
        for i in 0..4 {
            fixes.push(RawFix::at(40.0 + i as f64 * 1e-6, -73.9));
        }
        let session = settled_session(fixes).await;
        let trace = session.stop().await.unwrap();
        assert_eq!(trace.locations.len(), 1);
    }

    #[tokio::test]
    async fn pause_and_resume_gate_audio_and_are_noops_otherwise() {
        let session = settled_session(vec![]).await;
        // resume while recording: no-op
        session.resume().await.unwrap();
        assert_eq!(session.audio.resumes.load(Ordering::SeqCst), 0);

        session.pause().await.unwrap();
        assert_eq!(session.session_state().await, SessionState::Paused);
        // pause while paused: no-op
        session.pause().await.unwrap();
        assert_eq!(session.audio.pauses.load(Ordering::SeqCst), 1);

        session.resume().await.unwrap();
        assert_eq!(session.session_state().await, SessionState::Recording);
        assert_eq!(session.audio.resumes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn annotation_snapshots_last_location() {
        let session = settled_session(walk_fixes(3)).await;
        let annotation = session
            .add_annotation(AnnotationKind::Comment, Some("note".into()), None, None)
            .await
            .unwrap();
        let snapshot = annotation.location.unwrap();

        let trace = session.stop().await.unwrap();
        assert_eq!(&snapshot, trace.locations.last().unwrap());
        assert_eq!(trace.annotations.len(), 1);
    }

    #[tokio::test]
    async fn annotation_accepts_explicit_timestamp() {
        let session = settled_session(vec![]).await;
        let annotation = session
            .add_annotation(AnnotationKind::Star, None, None, Some(1234))
            .await
            .unwrap();
        assert_eq!(annotation.timestamp_ms, 1234);
    }

    #[tokio::test]
    async fn annotation_rejected_when_idle() {
        let session = CaptureSession::new(
            FakeAudio::default(),
            FakeLocations::with_fixes(vec![]),
            GeoFilter::new(),
        );
        let err = session
            .add_annotation(AnnotationKind::Flag, None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::InvalidState(_)));
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_releases_audio() {
        let session = settled_session(vec![]).await;
        let first = session.stop().await.unwrap();
        assert!(!session.audio.is_capturing());
        let second = session.stop().await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn snapshots_reflect_progress() {
        let session = settled_session(walk_fixes(2)).await;
        let snapshot = session.snapshots().borrow().clone();
        assert_eq!(snapshot.state, SessionState::Recording);
        assert_eq!(snapshot.location_count, 2);
        assert!(snapshot.last_location.is_some());
    }
}
