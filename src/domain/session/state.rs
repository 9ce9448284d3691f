//! Capture session state machine

use std::fmt;
use thiserror::Error;

/// Capture session states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Recording,
    Paused,
    Stopped,
}

impl SessionState {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
        }
    }

    /// Whether the session has been started and not yet stopped.
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Recording | Self::Paused)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an invalid state transition is attempted
#[derive(Debug, Clone, Error)]
#[error("Invalid state transition: cannot {action} while in {current_state} state")]
pub struct InvalidStateTransition {
    pub current_state: SessionState,
    pub action: String,
}

/// Capture lifecycle entity.
///
/// State machine:
///   IDLE -> RECORDING (start)
///   RECORDING <-> PAUSED (pause / resume)
///   RECORDING | PAUSED -> STOPPED (stop)
///
/// STOPPED is terminal; a new session requires a fresh instance.
#[derive(Debug, Default)]
pub struct SessionLifecycle {
    state: SessionState,
}

impl SessionLifecycle {
    /// Create a new lifecycle in idle state
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
        }
    }

    /// Get the current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == SessionState::Recording
    }

    pub fn is_paused(&self) -> bool {
        self.state == SessionState::Paused
    }

    pub fn is_stopped(&self) -> bool {
        self.state == SessionState::Stopped
    }

    /// Transition from IDLE to RECORDING
    pub fn start(&mut self) -> Result<(), InvalidStateTransition> {
        if self.state != SessionState::Idle {
            return Err(self.rejected("start"));
        }
        self.state = SessionState::Recording;
        Ok(())
    }

    /// Transition from RECORDING to PAUSED
    pub fn pause(&mut self) -> Result<(), InvalidStateTransition> {
        if self.state != SessionState::Recording {
            return Err(self.rejected("pause"));
        }
        self.state = SessionState::Paused;
        Ok(())
    }

    /// Transition from PAUSED to RECORDING
    pub fn resume(&mut self) -> Result<(), InvalidStateTransition> {
        if self.state != SessionState::Paused {
            return Err(self.rejected("resume"));
        }
        self.state = SessionState::Recording;
        Ok(())
    }

    /// Transition from RECORDING or PAUSED to STOPPED.
    ///
    /// Returns Ok(false) when already stopped, so a second stop has no
    /// further effect.
    pub fn stop(&mut self) -> Result<bool, InvalidStateTransition> {
        match self.state {
            SessionState::Recording | SessionState::Paused => {
                self.state = SessionState::Stopped;
                Ok(true)
            }
            SessionState::Stopped => Ok(false),
            SessionState::Idle => Err(self.rejected("stop")),
        }
    }

    fn rejected(&self, action: &str) -> InvalidStateTransition {
        InvalidStateTransition {
            current_state: self.state,
            action: action.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_lifecycle_is_idle() {
        let lifecycle = SessionLifecycle::new();
        assert_eq!(lifecycle.state(), SessionState::Idle);
        assert!(!lifecycle.is_recording());
    }

    #[test]
    fn start_from_idle() {
        let mut lifecycle = SessionLifecycle::new();
        assert!(lifecycle.start().is_ok());
        assert!(lifecycle.is_recording());
    }

    #[test]
    fn start_twice_fails() {
        let mut lifecycle = SessionLifecycle::new();
        lifecycle.start().unwrap();
        let err = lifecycle.start().unwrap_err();
        assert_eq!(err.current_state, SessionState::Recording);
    }

    #[test]
    fn pause_resume_cycle() {
        let mut lifecycle = SessionLifecycle::new();
        lifecycle.start().unwrap();
        lifecycle.pause().unwrap();
        assert!(lifecycle.is_paused());
        lifecycle.resume().unwrap();
        assert!(lifecycle.is_recording());
    }

    #[test]
    fn pause_from_idle_fails() {
        let mut lifecycle = SessionLifecycle::new();
        assert!(lifecycle.pause().is_err());
    }

    #[test]
    fn pause_while_paused_fails() {
        let mut lifecycle = SessionLifecycle::new();
        lifecycle.start().unwrap();
        lifecycle.pause().unwrap();
        assert!(lifecycle.pause().is_err());
    }

    #[test]
    fn resume_while_recording_fails() {
        let mut lifecycle = SessionLifecycle::new();
        lifecycle.start().unwrap();
        assert!(lifecycle.resume().is_err());
    }

    #[test]
    fn stop_from_recording_and_paused() {
        let mut lifecycle = SessionLifecycle::new();
        lifecycle.start().unwrap();
        assert_eq!(lifecycle.stop().unwrap(), true);
        assert!(lifecycle.is_stopped());

        let mut lifecycle = SessionLifecycle::new();
        lifecycle.start().unwrap();
        lifecycle.pause().unwrap();
        assert_eq!(lifecycle.stop().unwrap(), true);
    }

    #[test]
    fn stop_twice_is_idempotent() {
        let mut lifecycle = SessionLifecycle::new();
        lifecycle.start().unwrap();
        assert_eq!(lifecycle.stop().unwrap(), true);
        assert_eq!(lifecycle.stop().unwrap(), false);
        assert!(lifecycle.is_stopped());
    }

    #[test]
    fn stop_from_idle_fails() {
        let mut lifecycle = SessionLifecycle::new();
        assert!(lifecycle.stop().is_err());
    }

    #[test]
    fn stopped_is_terminal() {
        let mut lifecycle = SessionLifecycle::new();
        lifecycle.start().unwrap();
        lifecycle.stop().unwrap();
        assert!(lifecycle.start().is_err());
        assert!(lifecycle.pause().is_err());
        assert!(lifecycle.resume().is_err());
    }

    #[test]
    fn state_display() {
        assert_eq!(SessionState::Idle.to_string(), "idle");
        assert_eq!(SessionState::Paused.to_string(), "paused");
    }
}
