//! Spinners for long-running steps

use super::context::UiContext;
use crate::prefetch::PrefetchStatus;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ";
const MAX_LINE_WIDTH: usize = 60;

/// Short-lived spinner for a single blocking step (registry checks)
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
}

impl TaskSpinner {
    /// Starts immediately; prints a `...` line in plain mode
    pub fn start(ctx: &UiContext, message: &str) -> Self {
        if ctx.use_fancy_output() {
            let spinner = cliclack::spinner();
            spinner.start(message);
            Self {
                spinner: Some(spinner),
            }
        } else {
            println!("{} {}", style("...").dim(), message);
            Self { spinner: None }
        }
    }

    pub fn stop(mut self, message: &str) {
        match self.spinner.take() {
            Some(spinner) => spinner.stop(message),
            None => println!("{} {}", style("[OK]").green(), message),
        }
    }

    pub fn stop_error(mut self, message: &str) {
        match self.spinner.take() {
            Some(spinner) => spinner.error(message),
            None => println!("{} {}", style("[FAIL]").red(), message),
        }
    }
}

/// Live view of a running prefetch.
///
/// The fetch emits one line per artifact with no total, so this is a spinner
/// with a line counter rather than a bar. Plain mode prints each status tick.
pub struct PrefetchProgress {
    bar: Option<ProgressBar>,
    label: String,
}

impl PrefetchProgress {
    pub fn new(ctx: &UiContext, label: &str) -> Self {
        let bar = if ctx.use_fancy_output() {
            let bar = ProgressBar::new_spinner();
            if let Ok(template) = ProgressStyle::default_spinner()
                .template("  {spinner:.green} Prefetching {prefix}  {pos} lines  {msg:.dim}  {elapsed:.dim}")
            {
                bar.set_style(template.tick_chars(TICK_CHARS));
            }
            bar.set_prefix(label.to_string());
            bar.enable_steady_tick(Duration::from_millis(120));
            Some(bar)
        } else {
            println!("Prefetching {}...", label);
            None
        };
        Self {
            bar,
            label: label.to_string(),
        }
    }

    /// Apply a coalesced status update
    pub fn on_status(&self, status: &PrefetchStatus) {
        match self.bar {
            Some(ref bar) => {
                bar.set_position(status.lines_emitted);
                bar.set_message(truncate(status.last_line.trim()));
            }
            None => println!(
                "  [{}] {} lines: {}",
                self.label,
                status.lines_emitted,
                status.last_line.trim()
            ),
        }
    }

    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

/// Clip to the display width on a char boundary
fn truncate(line: &str) -> String {
    if line.chars().count() <= MAX_LINE_WIDTH {
        return line.to_string();
    }
    let clipped: String = line.chars().take(MAX_LINE_WIDTH - 3).collect();
    format!("{}...", clipped)
}
