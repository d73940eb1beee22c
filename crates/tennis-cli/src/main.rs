//! Command-line capture tool for BLE tennis-swing motion sensors.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `scan` | Scan for nearby sensors |
//! | `capture` | Stream frames into sessions, then export or upload |
//! | `upload` | Sign a saved dataset and upload it |
//! | `sign` | Print the signed envelope for a saved dataset |
//! | `config` | Manage CLI configuration |
//! | `completions` | Generate shell completions |
//!
//! # Configuration
//!
//! Settings live in `~/.config/tennis-capture/config.toml` (or platform
//! equivalent). Flags and environment variables override the file.
//!
//! # Environment Variables
//!
//! - `TENNIS_DEVICE`: Default device (overridden by `--device`)
//! - `TENNIS_API_KEY`: Ingestion API key
//! - `TENNIS_HMAC_KEY`: Envelope signing key
//! - `NO_COLOR`: Disable colored output when set

use std::io;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod format;
mod style;
mod util;

use cli::{Cli, Commands};
use commands::{CaptureArgs, cmd_capture, cmd_config, cmd_scan, cmd_sign, cmd_upload};
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    human_panic::setup_panic!();

    let cli = Cli::parse();

    // Handle completions command early (before tracing init)
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "tennis", &mut io::stdout());
        return Ok(());
    }

    // When quiet mode is enabled, suppress info-level logging
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let output = cli.output.as_ref();
    let quiet = cli.quiet;
    let no_color = cli.no_color;

    match cli.command {
        Commands::Scan {
            timeout,
            format,
            all,
        } => cmd_scan(timeout, format, all, output, quiet).await,
        Commands::Capture {
            device,
            dataset,
            count,
            export,
            upload,
        } => {
            let config = Config::load();
            let args = CaptureArgs {
                device,
                dataset,
                count,
                export,
                upload,
            };
            cmd_capture(args, output, &config, quiet, no_color).await
        }
        Commands::Upload { file, dataset } => {
            let config = Config::load();
            cmd_upload(&file, dataset, &config, no_color).await
        }
        Commands::Sign { file, hmac_key } => {
            let config = Config::load();
            cmd_sign(&file, hmac_key, output, &config, quiet, no_color)
        }
        Commands::Config { action } => cmd_config(action, quiet, no_color),
        Commands::Completions { .. } => Ok(()),
    }
}
