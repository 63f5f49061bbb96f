//! CLI presenter for output formatting

use std::io::{self, Write};

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::application::{
    CancelZoneView, ControlView, ControllerSnapshot, HapticPulse, Notice, UiIntent,
};
use crate::domain::session::SessionState;

/// Presenter for CLI output formatting
pub struct Presenter {
    spinner: Option<ProgressBar>,
    last_state: Option<(SessionState, SessionState, bool)>,
    max_secs: u64,
}

impl Presenter {
    /// Create a new presenter
    pub fn new() -> Self {
        Self {
            spinner: None,
            last_state: None,
            max_secs: 0,
        }
    }

    /// Presenter whose recording timer shows progress against `max_secs`
    pub fn with_limit(max_secs: u64) -> Self {
        Self {
            max_secs,
            ..Self::new()
        }
    }

    /// Start a spinner with message
    pub fn start_spinner(&mut self, message: &str) {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
        {
            spinner.set_style(style);
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        self.spinner = Some(spinner);
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

    pub fn is_spinning(&self) -> bool {
        self.spinner.is_some()
    }

    /// Print info message to stderr
    pub fn info(&self, message: &str) {
        self.line(format!("{} {}", "ℹ".cyan(), message));
    }

    /// Print success message to stderr
    pub fn success(&self, message: &str) {
        self.line(format!("{} {}", "✓".green(), message));
    }

    /// Print warning message to stderr
    pub fn warn(&self, message: &str) {
        self.line(format!("{} {}", "⚠".yellow(), message));
    }

    /// Print error message to stderr
    pub fn error(&self, message: &str) {
        self.line(format!("{} {}", "✗".red(), message));
    }

    /// Output text to stdout (the actual transcription output)
    pub fn output(&self, text: &str) {
        println!("{}", text);
    }

    /// Output text to stdout without newline
    pub fn output_inline(&self, text: &str) {
        print!("{}", text);
        let _ = io::stdout().flush();
    }

    /// Print a key-value pair (for config list)
    pub fn key_value(&self, key: &str, value: &str) {
        println!("{}: {}", key.cyan(), value);
    }

    /// Render one intent from the session controller
    pub fn intent(&mut self, intent: &UiIntent) {
        match intent {
            UiIntent::State(snapshot) => self.state(snapshot),
            UiIntent::Haptic(pulse) => self.haptic(*pulse),
            UiIntent::Notice(notice) => self.notice(notice),
            UiIntent::Tick { elapsed_seconds } => {
                let progress = self.format_progress(*elapsed_seconds, self.max_secs);
                self.line(format!("{} Recording {}", "●".red(), progress));
            }
        }
    }

    /// Print the control's visual state (debug aid for replays)
    pub fn view(&self, view: &ControlView) {
        self.line(
            format!(
                "  offset {:>7.1}  scale {:.1}  zone {:<7}  {}",
                view.offset_x,
                view.scale,
                zone_label(view),
                view.cancel_hint
            )
            .dimmed()
            .to_string(),
        );
    }

    fn state(&mut self, snapshot: &ControllerSnapshot) {
        let key = (snapshot.state, snapshot.intended, snapshot.over_cancel_zone);
        if self.last_state == Some(key) {
            return;
        }
        self.last_state = Some(key);

        if snapshot.intended == SessionState::StoppingAndProcessing {
            if !self.is_spinning() {
                self.start_spinner("Processing recording...");
            }
            return;
        }
        if snapshot.is_idle() {
            self.stop_spinner();
        }
        self.line(format!("{} {}", "●".cyan(), describe(snapshot)));
    }

    fn haptic(&self, pulse: HapticPulse) {
        self.line(format!("{} haptic {}", "〰".dimmed(), pulse).dimmed().to_string());
    }

    fn notice(&mut self, notice: &Notice) {
        match notice {
            Notice::LimitReached { .. } => self.warn(&notice.to_string()),
            _ => {
                if self.is_spinning() {
                    self.spinner_fail(notice.title());
                }
                self.error(&notice.to_string());
            }
        }
    }

    /// Format recording progress bar
    pub fn format_progress(&self, elapsed_secs: u64, total_secs: u64) -> String {
        if total_secs == 0 {
            return format!("{}s", elapsed_secs);
        }
        let percent = (elapsed_secs as f64 / total_secs as f64 * 100.0).min(100.0);

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

    /// Write a line to stderr without tearing an active spinner
    fn line(&self, text: String) {
        match &self.spinner {
            Some(spinner) => spinner.suspend(|| eprintln!("{}", text)),
            None => eprintln!("{}", text),
        }
    }
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new()
    }
}

/// Human-readable state line for a snapshot
pub fn describe(snapshot: &ControllerSnapshot) -> String {
    match (snapshot.state, snapshot.intended) {
        (SessionState::Idle, _) => "Idle".to_string(),
        (SessionState::Acquiring, SessionState::Recording) => "Starting microphone...".to_string(),
        (SessionState::Acquiring, SessionState::Cancelling) => {
            "Starting microphone (will cancel)...".to_string()
        }
        (SessionState::Recording, SessionState::Recording) if snapshot.over_cancel_zone => {
            format!("Recording {} - release to cancel", snapshot.elapsed_label())
        }
        (SessionState::Recording, SessionState::Recording) => {
            format!("Recording {}", snapshot.elapsed_label())
        }
        (_, SessionState::Cancelling) | (SessionState::Cancelling, _) => "Cancelled".to_string(),
        (_, SessionState::StoppingAndProcessing) | (SessionState::StoppingAndProcessing, _) => {
            "Processing recording...".to_string()
        }
        (state, intended) => format!("{} ({})", state, intended),
    }
}

fn zone_label(view: &ControlView) -> &'static str {
    match view.cancel_zone {
        CancelZoneView::Hidden => "hidden",
        CancelZoneView::Visible => "visible",
        CancelZoneView::Armed => "armed",
    }
}
