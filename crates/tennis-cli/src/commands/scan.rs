//! Scan command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tennis_core::{ScanOptions, scan_for_sensors};

use crate::cli::OutputFormat;
use crate::format::{ScanRow, format_scan_json, format_scan_text};
use crate::style;
use crate::util::write_output;

pub async fn cmd_scan(
    timeout: u64,
    format: OutputFormat,
    all: bool,
    output: Option<&PathBuf>,
    quiet: bool,
) -> Result<()> {
    // Show spinner for text output (unless quiet)
    let spinner = if !quiet && matches!(format, OutputFormat::Text) {
        Some(style::scanning_spinner(timeout))
    } else {
        None
    };

    let options = ScanOptions::new().duration_secs(timeout).sensors_only(!all);
    let sensors = scan_for_sensors(options)
        .await
        .context("Failed to scan for sensors")?;

    if let Some(sp) = spinner {
        sp.finish_and_clear();
    }

    let rows: Vec<ScanRow> = sensors.iter().map(ScanRow::from).collect();
    let content = match format {
        OutputFormat::Json => format_scan_json(&rows)?,
        OutputFormat::Text => format_scan_text(&rows, !quiet),
    };

    write_output(output, &content)
}
