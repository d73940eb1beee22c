//! Utility functions for CLI operations.

use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tennis_core::export::decode_plain;
use tennis_core::{ConnectionConfig, Device, SensorFrame};

use crate::style;

const DATASET_PREFIX: &str = "dataset-";
const DATASET_SUFFIX: &str = ".json";

/// File name for a plain dataset export, e.g. `dataset-forehand.json`.
pub fn dataset_file_name(label: &str) -> String {
    format!("{}{}{}", DATASET_PREFIX, label, DATASET_SUFFIX)
}

/// Recover the label from a file named by [`dataset_file_name`].
pub fn label_from_file_name(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    name.strip_prefix(DATASET_PREFIX)?
        .strip_suffix(DATASET_SUFFIX)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
}

/// Connect to a sensor with a spinner and readable error messages.
///
/// With no identifier the first sensor in range is used.
pub async fn connect_device_with_progress(
    identifier: Option<&str>,
    timeout: Duration,
    show_progress: bool,
) -> Result<Device> {
    let target = identifier.unwrap_or("first sensor in range");
    let spinner = (show_progress && io::stderr().is_terminal())
        .then(|| style::connecting_spinner(target));

    let config = ConnectionConfig::default().connection_timeout(timeout);
    let result = Device::connect_with_config(identifier, config).await;

    if let Some(sp) = spinner {
        sp.finish_and_clear();
    }

    result.map_err(|e| {
        let suggestion = if e.is_transport_failure() {
            "\n\nPossible causes:\n  \
             - Bluetooth may be disabled -- check system settings\n  \
             - The sensor may be out of range or not advertising\n  \
             - The sensor may be connected to another host\n\n\
             Tip: Run 'tennis scan' to list nearby sensors"
        } else {
            ""
        };
        anyhow::anyhow!("Failed to connect to {}\n\nCause: {}{}", target, e, suggestion)
    })
}

/// Write output to file or stdout.
pub fn write_output(output: Option<&PathBuf>, content: &str) -> Result<()> {
    if let Some(path) = output {
        fs::write(path, content)
            .with_context(|| format!("Failed to write to {}", path.display()))?;
    } else {
        print!("{}", content);
        io::stdout().flush()?;
    }
    Ok(())
}

/// Write dataset bytes to `path`.
pub fn write_dataset(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

/// Load a plain dataset export.
pub fn read_dataset(path: &Path) -> Result<Vec<SensorFrame>> {
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read dataset {}", path.display()))?;
    decode_plain(&bytes).with_context(|| format!("{} is not a dataset export", path.display()))
}
