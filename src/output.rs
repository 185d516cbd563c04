//! Report rendering
//!
//! Human-readable output for terminals and a JSON rendering of the full
//! [`PrevalidationReport`] for scripts.

use std::time::Duration;

use crate::cli::{OutputFormat, VerbosityLevel};
use crate::validator::{FileOutcome, PrevalidationReport};

/// Output formatter for pre-validation reports
pub struct Output {
    format: OutputFormat,
    verbosity: VerbosityLevel,
    show_colors: bool,
}

impl Output {
    pub fn new(format: OutputFormat, verbosity: VerbosityLevel) -> Self {
        Self {
            format,
            verbosity,
            show_colors: atty::is(atty::Stream::Stdout),
        }
    }

    /// Force colours on or off regardless of the terminal
    pub fn with_colors(mut self, show_colors: bool) -> Self {
        self.show_colors = show_colors;
        self
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    /// Render `report` in the configured format
    pub fn render(&self, report: &PrevalidationReport) -> serde_json::Result<String> {
        match self.format {
            OutputFormat::Human => Ok(self.format_report(report)),
            OutputFormat::Json => serde_json::to_string_pretty(report),
        }
    }

    pub fn format_report(&self, report: &PrevalidationReport) -> String {
        let mut output = String::new();

        match self.verbosity {
            VerbosityLevel::Quiet => {
                for file in report.file_outcomes.iter().filter(|f| !f.outcome.accepted) {
                    output.push_str(&self.format_file_outcome(file));
                    output.push('\n');
                }
            }
            VerbosityLevel::Normal | VerbosityLevel::Verbose => {
                for file in &report.file_outcomes {
                    output.push_str(&self.format_file_outcome(file));
                    output.push('\n');
                }
                output.push('\n');
                output.push_str(&self.format_summary(report));
            }
        }

        output
    }

    pub fn format_file_outcome(&self, file: &FileOutcome) -> String {
        let path_display = file.path.display();
        let outcome = &file.outcome;

        let mut line = if outcome.accepted {
            format!(
                "{}  {} - {}",
                self.colorize("✓ ACCEPTED", "32"),
                path_display,
                outcome.message
            )
        } else {
            format!(
                "{}  {} - {}",
                self.colorize("✗ REJECTED", "31"),
                path_display,
                outcome.message
            )
        };

        if self.verbosity >= VerbosityLevel::Verbose {
            if let Some(code) = outcome.code {
                line.push_str(&format!(" [{}]", code));
            }
            line.push_str(&format!(" ({})", format_duration(file.duration)));
        }

        line
    }

    fn format_summary(&self, report: &PrevalidationReport) -> String {
        let mut output = String::new();
        output.push_str("Pre-validation Summary:\n");
        output.push_str(&format!("  Total files: {}\n", report.total_files));
        output.push_str(&format!(
            "  {} {}\n",
            self.colorize("Accepted:", "32"),
            report.accepted_files
        ));

        if report.rejected_files > 0 {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Rejected:", "31"),
                report.rejected_files
            ));
            if self.verbosity >= VerbosityLevel::Verbose {
                for (kind, count) in &report.rejections_by_kind {
                    output.push_str(&format!("    {}: {}\n", kind, count));
                }
            }
        }

        output.push_str(&format!(
            "  Acceptance rate: {:.1}%\n",
            report.acceptance_rate()
        ));
        output.push_str(&format!(
            "  Duration: {}\n",
            format_duration(report.total_duration)
        ));

        output
    }
}

fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs_f64();
    if total_secs < 1.0 {
        format!("{:.0}ms", duration.as_millis())
    } else if total_secs < 60.0 {
        format!("{:.2}s", total_secs)
    } else {
        let mins = (total_secs / 60.0) as u64;
        let secs = total_secs % 60.0;
        format!("{}m{:.1}s", mins, secs)
    }
}
