//! Configuration file management.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use tennis_core::{DatasetCategory, EnvelopeOptions, IngestionClient};
use tracing::warn;

use crate::cli::ConfigKey;

/// Label used when neither the command line nor the config names one.
pub const DEFAULT_LABEL: &str = "capture";

const REDACTED: &str = "********";

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Default device name or address
    #[serde(default)]
    pub device: Option<String>,

    /// Default dataset label
    #[serde(default)]
    pub label: Option<String>,

    /// Default ingestion category
    #[serde(default)]
    pub category: Option<DatasetCategory>,

    /// Ingestion API key
    #[serde(default)]
    pub api_key: Option<String>,

    /// HMAC signing key
    #[serde(default)]
    pub hmac_key: Option<String>,

    /// Ingestion service base URL
    #[serde(default)]
    pub ingestion_url: Option<String>,

    /// Connection timeout in seconds
    #[serde(default)]
    pub timeout: Option<u64>,

    /// Device metadata written into signed envelopes
    #[serde(default)]
    pub envelope: EnvelopeOptions,
}

impl Config {
    /// Get the config file path
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tennis-capture")
            .join("config.toml")
    }

    /// Load config from the default path, or return default if not found
    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    /// Load config from `path`, falling back to defaults on any problem.
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => warn!(path = %path.display(), "Failed to parse config: {}", e),
                },
                Err(e) => warn!(path = %path.display(), "Failed to read config: {}", e),
            }
        }
        Self::default()
    }

    /// Save config to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path())
    }

    /// Save config to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Set a key from its command-line string form.
    pub fn set_key(&mut self, key: ConfigKey, value: &str) -> Result<()> {
        let value = value.trim();
        if value.is_empty() {
            bail!("Value for {:?} must not be empty (use 'config unset' to remove it)", key);
        }

        match key {
            ConfigKey::Device => self.device = Some(value.to_string()),
            ConfigKey::Label => self.label = Some(value.to_string()),
            ConfigKey::Category => {
                self.category = Some(value.parse().map_err(|e| anyhow!("{}", e))?);
            }
            ConfigKey::ApiKey => self.api_key = Some(value.to_string()),
            ConfigKey::HmacKey => self.hmac_key = Some(value.to_string()),
            ConfigKey::IngestionUrl => {
                // Validates the scheme without keeping the client.
                IngestionClient::new(value, "").map_err(|e| anyhow!("{}", e))?;
                self.ingestion_url = Some(value.to_string());
            }
            ConfigKey::Timeout => {
                let secs: u64 = value
                    .parse()
                    .map_err(|_| anyhow!("'{}' is not a valid number of seconds", value))?;
                if secs == 0 {
                    bail!("Timeout must be at least one second");
                }
                self.timeout = Some(secs);
            }
            ConfigKey::DeviceName => self.envelope.device_name = value.to_string(),
            ConfigKey::DeviceType => self.envelope.device_type = value.to_string(),
            ConfigKey::IntervalMs => {
                self.envelope.interval_ms = value
                    .parse()
                    .map_err(|_| anyhow!("'{}' is not a valid interval in milliseconds", value))?;
            }
        }
        Ok(())
    }

    /// Reset a key to its default.
    pub fn unset_key(&mut self, key: ConfigKey) {
        let defaults = EnvelopeOptions::default();
        match key {
            ConfigKey::Device => self.device = None,
            ConfigKey::Label => self.label = None,
            ConfigKey::Category => self.category = None,
            ConfigKey::ApiKey => self.api_key = None,
            ConfigKey::HmacKey => self.hmac_key = None,
            ConfigKey::IngestionUrl => self.ingestion_url = None,
            ConfigKey::Timeout => self.timeout = None,
            ConfigKey::DeviceName => self.envelope.device_name = defaults.device_name,
            ConfigKey::DeviceType => self.envelope.device_type = defaults.device_type,
            ConfigKey::IntervalMs => self.envelope.interval_ms = defaults.interval_ms,
        }
    }

    /// Copy with secrets masked, for display.
    pub fn redacted(&self) -> Self {
        let mask = |v: &Option<String>| v.as_ref().map(|_| REDACTED.to_string());
        Self {
            api_key: mask(&self.api_key),
            hmac_key: mask(&self.hmac_key),
            ..self.clone()
        }
    }

    /// Ingestion base URL, or the public service.
    pub fn ingestion_url(&self) -> &str {
        self.ingestion_url
            .as_deref()
            .unwrap_or(IngestionClient::DEFAULT_BASE_URL)
    }
}

/// Resolve device from arg, env var, or config.
pub fn resolve_device(device: Option<String>, config: &Config) -> Option<String> {
    device.or_else(|| config.device.clone())
}

/// Resolve timeout: use provided value, fall back to config, then default
pub fn resolve_timeout(cmd_timeout: u64, config: &Config, default: u64) -> u64 {
    // clap fills in the default, so only a differing value is explicit
    if cmd_timeout != default {
        cmd_timeout
    } else {
        config.timeout.unwrap_or(default)
    }
}

/// Resolve the dataset label from arg, then config, then [`DEFAULT_LABEL`].
pub fn resolve_label(label: Option<String>, config: &Config) -> String {
    label
        .or_else(|| config.label.clone())
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| DEFAULT_LABEL.to_string())
}

/// Resolve the ingestion category from arg, then config.
pub fn resolve_category(category: Option<DatasetCategory>, config: &Config) -> DatasetCategory {
    category.or(config.category).unwrap_or_default()
}

/// Resolve the HMAC key from arg or env var, then config.
pub fn resolve_hmac_key(key: Option<String>, config: &Config) -> Result<String> {
    resolve_secret(key, config.hmac_key.as_ref()).ok_or_else(|| {
        anyhow!(
            "No HMAC key configured. Use --hmac-key <KEY>, set TENNIS_HMAC_KEY, \
             or run 'tennis config set hmac-key <KEY>'."
        )
    })
}

/// Resolve the ingestion API key from arg or env var, then config.
pub fn resolve_api_key(key: Option<String>, config: &Config) -> Result<String> {
    resolve_secret(key, config.api_key.as_ref()).ok_or_else(|| {
        anyhow!(
            "No API key configured. Use --api-key <KEY>, set TENNIS_API_KEY, \
             or run 'tennis config set api-key <KEY>'."
        )
    })
}

fn resolve_secret(arg: Option<String>, configured: Option<&String>) -> Option<String> {
    arg.or_else(|| configured.cloned())
        .filter(|s| !s.trim().is_empty())
}
