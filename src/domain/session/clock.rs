//! Session clock: effective recording time excluding paused intervals
//!
//! All in-trace timestamps are expressed against this clock. Callers pass
//! `now` explicitly; the clock itself never reads system time, which keeps
//! pause/resume accounting deterministic and testable.

use std::time::{Duration, Instant};

/// Tracks elapsed recording time with pause intervals subtracted.
///
/// Invariant: `effective` is monotonically non-decreasing while recording
/// and frozen while paused.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    anchor: Instant,
    accumulated_paused: Duration,
    pause_started: Option<Instant>,
}

impl SessionClock {
    /// Start the clock at `now`.
    pub fn started_at(now: Instant) -> Self {
        Self {
            anchor: now,
            accumulated_paused: Duration::ZERO,
            pause_started: None,
        }
    }

    /// Effective recording time at `now`.
    ///
    /// While paused this is frozen at the value it had when the open pause
    /// interval began.
    pub fn effective(&self, now: Instant) -> Duration {
        let wall = match self.pause_started {
            Some(pause_start) => pause_start.saturating_duration_since(self.anchor),
            None => now.saturating_duration_since(self.anchor),
        };
        wall.saturating_sub(self.accumulated_paused)
    }

    /// Effective recording time at `now`, in milliseconds.
    pub fn effective_ms(&self, now: Instant) -> u64 {
        self.effective(now).as_millis() as u64
    }

    /// Open a pause interval. No-op if already paused.
    pub fn pause(&mut self, now: Instant) {
        if self.pause_started.is_none() {
            self.pause_started = Some(now);
        }
    }

    /// Close the open pause interval, folding it into the accumulated total.
    /// No-op if not paused.
    pub fn resume(&mut self, now: Instant) {
        if let Some(pause_start) = self.pause_started.take() {
            self.accumulated_paused += now.saturating_duration_since(pause_start);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.pause_started.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn effective_tracks_wall_clock_while_recording() {
        let base = Instant::now();
        let clock = SessionClock::started_at(base);
        assert_eq!(clock.effective(base + secs(10)), secs(10));
    }

    #[test]
    fn effective_is_frozen_while_paused() {
        let base = Instant::now();
        let mut clock = SessionClock::started_at(base);
        clock.pause(base + secs(10));
        assert_eq!(clock.effective(base + secs(10)), secs(10));
        assert_eq!(clock.effective(base + secs(14)), secs(10));
    }

    #[test]
    fn pause_then_immediate_resume_leaves_effective_unchanged() {
        let base = Instant::now();
        let mut clock = SessionClock::started_at(base);
        let before = clock.effective(base + secs(10));
        clock.pause(base + secs(10));
        clock.resume(base + secs(17));
        assert_eq!(clock.effective(base + secs(17)), before);
    }

    #[test]
    fn paused_time_is_excluded_from_effective() {
        // Record 10s, pause 5s, record 5s more: effective is 15s at a
        // wall-clock 20s after start
        let base = Instant::now();
        let mut clock = SessionClock::started_at(base);
        clock.pause(base + secs(10));
        clock.resume(base + secs(15));
        assert_eq!(clock.effective(base + secs(20)), secs(15));
    }

    #[test]
    fn multiple_pause_intervals_accumulate() {
        let base = Instant::now();
        let mut clock = SessionClock::started_at(base);
        clock.pause(base + secs(5));
        clock.resume(base + secs(8));
        clock.pause(base + secs(12));
        clock.resume(base + secs(14));
        // 20s wall, 5s total paused
        assert_eq!(clock.effective(base + secs(20)), secs(15));
    }

    #[test]
    fn double_pause_is_noop() {
        let base = Instant::now();
        let mut clock = SessionClock::started_at(base);
        clock.pause(base + secs(5));
        clock.pause(base + secs(9));
        clock.resume(base + secs(10));
        // Pause interval runs from 5s, not 9s
        assert_eq!(clock.effective(base + secs(10)), secs(5));
    }

    #[test]
    fn resume_without_pause_is_noop() {
        let base = Instant::now();
        let mut clock = SessionClock::started_at(base);
        clock.resume(base + secs(5));
        assert_eq!(clock.effective(base + secs(10)), secs(10));
    }

    #[test]
    fn effective_is_monotonic_across_pause_boundaries() {
        let base = Instant::now();
        let mut clock = SessionClock::started_at(base);
        let mut previous = Duration::ZERO;
        let checkpoints: [(u64, bool, bool); 6] = [
            (2, false, false),
            (4, true, false),  // pause at 4s
            (6, false, false), // still paused
            (8, false, true),  // resume at 8s
            (10, false, false),
            (12, false, false),
        ];
        for (t, do_pause, do_resume) in checkpoints {
            let now = base + secs(t);
            if do_pause {
                clock.pause(now);
            }
            if do_resume {
                clock.resume(now);
            }
            let effective = clock.effective(now);
            assert!(effective >= previous, "effective time went backwards");
            previous = effective;
        }
    }
}
