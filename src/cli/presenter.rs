//! CLI presenter for output formatting

use std::io::{self, Write};

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::application::{CaptureSnapshot, PlaybackSnapshot};
use crate::domain::publish::PublishMetadata;
use crate::domain::session::SessionState;
use crate::domain::trace::Trace;

/// Presenter for CLI output formatting
pub struct Presenter {
    spinner: Option<ProgressBar>,
}

impl Presenter {
    /// Create a new presenter
    pub fn new() -> Self {
        Self { spinner: None }
    }

    /// Start a spinner with message
    pub fn start_spinner(&mut self, message: &str) {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                .template("{spinner:.cyan} {msg}")
                .unwrap(),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        self.spinner = Some(spinner);
    }

    /// Update spinner message
    pub fn update_spinner(&self, message: &str) {
        if let Some(ref spinner) = self.spinner {
            spinner.set_message(message.to_string());
        }
    }

    /// Mark spinner as success and finish
    pub fn spinner_success(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✓".green(), message));
        }
    }

    /// Mark spinner as failed and finish
    pub fn spinner_fail(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✗".red(), message));
        }
    }

    /// Print info message to stderr
    pub fn info(&self, message: &str) {
        eprintln!("{} {}", "ℹ".cyan(), message);
    }

    /// Print success message to stderr
    pub fn success(&self, message: &str) {
        eprintln!("{} {}", "✓".green(), message);
    }

    /// Print warning message to stderr
    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print error message to stderr
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Output text to stdout
    pub fn output(&self, text: &str) {
        println!("{}", text);
    }

    /// Output text to stdout without newline
    pub fn output_inline(&self, text: &str) {
        print!("{}", text);
        let _ = io::stdout().flush();
    }

    /// Format seconds as mm:ss
    pub fn format_clock(seconds: u64) -> String {
        format!("{:02}:{:02}", seconds / 60, seconds % 60)
    }

    /// One-line live status of a recording session
    pub fn format_capture_status(snapshot: &CaptureSnapshot) -> String {
        let state = match snapshot.state {
            SessionState::Recording => "● rec".red().to_string(),
            SessionState::Paused => "‖ paused".yellow().to_string(),
            other => other.to_string(),
        };
        let position = match &snapshot.last_location {
            Some(location) => format!("{:.5},{:.5}", location.lat, location.lng),
            None => "no fix".to_string(),
        };
        format!(
            "{} {}  {} pts  {} notes  [{}]",
            state,
            Self::format_clock(snapshot.effective_ms / 1000),
            snapshot.location_count,
            snapshot.annotation_count,
            position
        )
    }

    /// One-line live status of playback
    pub fn format_playback_status(snapshot: &PlaybackSnapshot, duration_sec: u64) -> String {
        let position = match &snapshot.location {
            Some(location) => format!("{:.5},{:.5}", location.lat, location.lng),
            None => "—".to_string(),
        };
        format!(
            "{} / {}  [{}]",
            Self::format_clock(snapshot.display_ms / 1000),
            Self::format_clock(duration_sec),
            position
        )
    }

    /// Print one trace as a listing row
    pub fn trace_row(&self, trace: &Trace) {
        self.output(&format!(
            "{}  {}  {}  {} pts  {} notes{}",
            trace.id,
            trace.created_at.format("%Y-%m-%d %H:%M"),
            Self::format_clock(trace.duration_sec),
            trace.locations.len(),
            trace.annotations.len(),
            if trace.transcription.is_some() {
                "  transcribed"
            } else {
                ""
            }
        ));
    }

    /// Print one published index entry as a listing row
    pub fn published_row(&self, entry: &PublishMetadata) {
        self.output(&format!(
            "{}  {}  {}  {}",
            entry.id,
            entry.created_at.format("%Y-%m-%d %H:%M"),
            Self::format_clock(entry.duration_sec),
            if entry.has_password { "locked" } else { "open" }
        ));
    }
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new()
    }
}
