//! Sign command implementation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tennis_core::Envelope;

use crate::config::{Config, resolve_hmac_key};
use crate::style;
use crate::util::{read_dataset, write_output};

pub fn cmd_sign(
    file: &Path,
    hmac_key: Option<String>,
    output: Option<&PathBuf>,
    config: &Config,
    quiet: bool,
    no_color: bool,
) -> Result<()> {
    let frames = read_dataset(file)?;
    let key = resolve_hmac_key(hmac_key, config)?;
    let signed = Envelope::new(&frames, &config.envelope)
        .sign(&key)
        .context("Failed to sign dataset")?;

    let mut body = String::from_utf8(signed.body.clone()).context("Envelope is not UTF-8")?;
    body.push('\n');
    write_output(output, &body)?;

    if !quiet {
        eprintln!(
            "{}",
            style::format_info(
                &format!("Signed {} frames, signature {}", frames.len(), signed.signature()),
                no_color,
            )
        );
    }
    Ok(())
}
