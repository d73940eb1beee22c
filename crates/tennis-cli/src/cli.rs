//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tennis_core::DatasetCategory;

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Reusable device connection arguments
#[derive(Debug, Clone, Args)]
pub struct DeviceArgs {
    /// Device name or address (MAC address or UUID), or use TENNIS_DEVICE env var.
    /// Without one, the first sensor advertising the UART service is used.
    #[arg(short, long, env = "TENNIS_DEVICE")]
    pub device: Option<String>,

    /// Connection timeout in seconds
    #[arg(short = 'T', long, default_value = "15")]
    pub timeout: u64,
}

/// Dataset labelling arguments shared by capture and upload
#[derive(Debug, Clone, Args)]
pub struct DatasetArgs {
    /// Dataset label (used as the file name on the ingestion service)
    #[arg(short, long)]
    pub label: Option<String>,

    /// Ingestion category (training, testing, anomaly)
    #[arg(short, long)]
    pub category: Option<DatasetCategory>,

    /// Ingestion API key, or use TENNIS_API_KEY env var
    #[arg(long, env = "TENNIS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// HMAC key for signing, or use TENNIS_HMAC_KEY env var
    #[arg(long, env = "TENNIS_HMAC_KEY", hide_env_values = true)]
    pub hmac_key: Option<String>,
}

#[derive(Parser)]
#[command(name = "tennis")]
#[command(author, version, about = "Capture motion data from a BLE tennis sensor", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Write output to file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan for nearby sensors
    Scan {
        /// Scan timeout in seconds
        #[arg(short, long, default_value = "5")]
        timeout: u64,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// List every peripheral, not just sensors
        #[arg(short, long)]
        all: bool,
    },

    /// Capture frames from a sensor.
    ///
    /// While running, type a command and press enter:
    /// clear, drop, status, export, upload, quit.
    Capture {
        #[command(flatten)]
        device: DeviceArgs,

        #[command(flatten)]
        dataset: DatasetArgs,

        /// Stop after this many frames
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Write the captured dataset to a file when capture ends
        #[arg(short, long)]
        export: bool,

        /// Upload the captured dataset when capture ends
        #[arg(short, long)]
        upload: bool,
    },

    /// Sign a saved dataset and upload it
    Upload {
        /// Dataset file written by `capture --export`
        file: PathBuf,

        #[command(flatten)]
        dataset: DatasetArgs,
    },

    /// Print the signed ingestion envelope for a saved dataset
    Sign {
        /// Dataset file written by `capture --export`
        file: PathBuf,

        /// HMAC key for signing, or use TENNIS_HMAC_KEY env var
        #[arg(long, env = "TENNIS_HMAC_KEY", hide_env_values = true)]
        hmac_key: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Configuration keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigKey {
    /// Default device name or address
    Device,
    /// Default dataset label
    Label,
    /// Default ingestion category
    Category,
    /// Ingestion API key
    ApiKey,
    /// HMAC signing key
    HmacKey,
    /// Ingestion service base URL
    IngestionUrl,
    /// Default connection timeout in seconds
    Timeout,
    /// Envelope device name
    DeviceName,
    /// Envelope device type
    DeviceType,
    /// Envelope sampling interval in milliseconds
    IntervalMs,
}

/// Configuration subcommands
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key
        #[arg(value_enum)]
        key: ConfigKey,
        /// Configuration value
        value: String,
    },

    /// Unset (remove) a configuration value
    Unset {
        /// Configuration key to remove
        #[arg(value_enum)]
        key: ConfigKey,
    },

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_capture_flags() {
        let cli = Cli::try_parse_from([
            "tennis", "capture", "-d", "Tennis Sensor", "-n", "500", "-l", "forehand", "-c",
            "testing", "--export", "--upload",
        ])
        .unwrap();

        let Commands::Capture {
            device,
            dataset,
            count,
            export,
            upload,
        } = cli.command
        else {
            panic!("expected capture");
        };
        assert_eq!(device.device.as_deref(), Some("Tennis Sensor"));
        assert_eq!(device.timeout, 15);
        assert_eq!(count, Some(500));
        assert_eq!(dataset.label.as_deref(), Some("forehand"));
        assert_eq!(dataset.category, Some(DatasetCategory::Testing));
        assert!(export && upload);
    }

    #[test]
    fn test_parse_rejects_unknown_category() {
        let result = Cli::try_parse_from(["tennis", "upload", "data.json", "-c", "validation"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_config_set() {
        let cli = Cli::try_parse_from(["tennis", "config", "set", "hmac-key", "secret"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Set {
                    key: ConfigKey::HmacKey,
                    ..
                }
            }
        ));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["tennis", "scan", "-q", "-o", "devices.txt"]).unwrap();
        assert!(cli.quiet);
        assert_eq!(cli.output, Some(PathBuf::from("devices.txt")));
    }
}
