//! Visual styling utilities for the CLI.
//!
//! Spinners for long-running operations and colored status prefixes.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

/// Standard spinner tick characters (Braille dots animation)
const SPINNER_TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Standard spinner tick interval
const SPINNER_TICK_MS: u64 = 80;

/// Get the standard spinner style.
fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars(SPINNER_TICK_CHARS)
}

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(spinner_style());
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
    pb
}

/// Create a spinner for scanning operations.
pub fn scanning_spinner(timeout_secs: u64) -> ProgressBar {
    spinner(format!("Scanning for sensors... ({}s)", timeout_secs))
}

/// Create a spinner for connecting to a device.
pub fn connecting_spinner(device: &str) -> ProgressBar {
    spinner(format!("Connecting to {}...", device))
}

/// Create the live capture status line.
pub fn capture_spinner() -> ProgressBar {
    spinner("Waiting for frames...".to_string())
}

/// Print a message while suspending a spinner to prevent visual glitches.
/// If no spinner is provided, just prints normally.
pub fn print_suspended(spinner: Option<&ProgressBar>, message: &str) {
    if let Some(pb) = spinner {
        pb.suspend(|| {
            eprintln!("{}", message);
        });
    } else {
        eprintln!("{}", message);
    }
}

/// Format a success message.
pub fn format_success(message: &str, no_color: bool) -> String {
    if no_color {
        format!("[OK] {}", message)
    } else {
        format!("{} {}", "[OK]".green(), message)
    }
}

/// Format an info message.
pub fn format_info(message: &str, no_color: bool) -> String {
    if no_color {
        format!("[--] {}", message)
    } else {
        format!("{} {}", "[--]".cyan(), message)
    }
}

/// Format a warning message.
pub fn format_warning(message: &str, no_color: bool) -> String {
    if no_color {
        format!("[!!] {}", message)
    } else {
        format!("{} {}", "[!!]".yellow(), message)
    }
}

/// Format an error message.
pub fn format_error(message: &str, no_color: bool) -> String {
    if no_color {
        format!("[XX] {}", message)
    } else {
        format!("{} {}", "[XX]".red(), message)
    }
}
