//! Terminal reporting for harness steps

use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Reports harness progress on stderr
#[derive(Debug)]
pub struct Reporter {
    term: Term,
    spinner: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl Reporter {
    /// Create a new reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            spinner: None,
            use_color,
            quiet,
        }
    }

    /// Show a spinner until [`Reporter::stop_spinner`]
    pub fn start_spinner(&mut self, message: &str) {
        if self.quiet || !self.term.is_term() {
            return;
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(spinner);
    }

    /// Clear the spinner, if any
    pub fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    fn line(&self, symbol: &str, plain: &str, paint: fn(&str) -> String, message: &str) {
        let prefix = if self.use_color {
            paint(symbol)
        } else {
            plain.to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.line("✓", "PASS", |s| style(s).green().bold().to_string(), message);
    }

    /// Print a failure message, even in quiet mode
    pub fn failure(&self, message: &str) {
        self.line("✗", "FAIL", |s| style(s).red().bold().to_string(), message);
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.line("⚠", "WARN", |s| style(s).yellow().bold().to_string(), message);
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.line("ℹ", "INFO", |s| style(s).blue().bold().to_string(), message);
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }

        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };

        let _ = self.term.write_line("");
        let _ = self.term.write_line(&styled);
    }

    /// Print the suite outcome
    pub fn outcome(&self, exit_code: i32, duration: Duration) {
        let secs = duration.as_secs_f64();
        if exit_code == 0 {
            self.success(&format!("e2e suite passed in {secs:.2}s"));
        } else {
            self.failure(&format!(
                "e2e suite failed with exit code {exit_code} after {secs:.2}s"
            ));
        }
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        self.stop_spinner();
    }
}
