//! CLI presenter for output formatting

use std::time::Duration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::domain::connection::ConnectionState;
use crate::domain::envelope::Envelope;

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
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(80));
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

    /// Stop spinner without status
    pub fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    pub fn is_spinner_active(&self) -> bool {
        self.spinner.is_some()
    }

    /// Run `f` with the spinner hidden so the line is not overdrawn
    fn suspended(&self, f: impl FnOnce()) {
        match self.spinner {
            Some(ref spinner) => spinner.suspend(f),
            None => f(),
        }
    }

    /// Print info message to stderr
    pub fn info(&self, message: &str) {
        self.suspended(|| eprintln!("{} {}", "ℹ".cyan(), message));
    }

    /// Print success message to stderr
    pub fn success(&self, message: &str) {
        self.suspended(|| eprintln!("{} {}", "✓".green(), message));
    }

    /// Print warning message to stderr
    pub fn warn(&self, message: &str) {
        self.suspended(|| eprintln!("{} {}", "⚠".yellow(), message));
    }

    /// Print error message to stderr
    pub fn error(&self, message: &str) {
        self.suspended(|| eprintln!("{} {}", "✗".red(), message));
    }

    /// Output text to stdout
    pub fn output(&self, text: &str) {
        self.suspended(|| println!("{}", text));
    }

    /// Print an inbound envelope as a chat line
    pub fn incoming(&self, envelope: &Envelope) {
        self.output(&format!("{} {}", "◀".magenta(), envelope));
    }

    /// Echo an envelope that was handed to the channel
    pub fn outgoing(&self, envelope: &Envelope) {
        self.suspended(|| eprintln!("{} {}", "▶".blue(), envelope.to_string().dimmed()));
    }

    /// Print a connection state change
    pub fn connection_status(&self, state: &ConnectionState) {
        let dot = match state {
            ConnectionState::Open => "●".green(),
            ConnectionState::Connecting | ConnectionState::Closing => "●".yellow(),
            ConnectionState::Closed { .. } => "●".white(),
            ConnectionState::Errored { .. } => "●".red(),
        };
        self.suspended(|| eprintln!("{} Connection: {}", dot, state));
    }

    /// Format recording progress bar
    pub fn format_progress(&self, elapsed_ms: u64, total_ms: u64) -> String {
        let elapsed_secs = elapsed_ms / 1000;
        let total_secs = total_ms / 1000;
        let percent = if total_ms > 0 {
            (elapsed_ms as f64 / total_ms as f64 * 100.0).min(100.0)
        } else {
            0.0
        };

        let bar_width = 20;
        let filled = ((percent / 100.0) * bar_width as f64) as usize;
        let empty = bar_width - filled;

        format!(
            "[{}{}] {:>3}s / {}s",
            "█".repeat(filled).cyan(),
            "░".repeat(empty),
            elapsed_secs,
            total_secs
        )
    }

    /// Show a spinner for an audio take
    pub fn show_recording_progress(&mut self, limit: Duration) {
        self.start_spinner(&format!(
            "Recording... {}",
            self.format_progress(0, limit.as_millis() as u64)
        ));
    }

    /// Update recording progress
    pub fn update_recording_progress(&self, elapsed: Duration, limit: Duration) {
        let progress = self.format_progress(elapsed.as_millis() as u64, limit.as_millis() as u64);
        self.update_spinner(&format!("Recording... {}", progress));
    }

    /// Print a key-value pair (for config list)
    pub fn key_value(&self, key: &str, value: &str) {
        self.suspended(|| println!("{}: {}", key.cyan(), value));
    }
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new()
    }
}
