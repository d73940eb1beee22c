//! Config command implementation.

use anyhow::{Context, Result};

use crate::cli::ConfigAction;
use crate::config::Config;
use crate::style;

pub fn cmd_config(action: ConfigAction, quiet: bool, no_color: bool) -> Result<()> {
    match action {
        ConfigAction::Path => {
            println!("{}", Config::path().display());
        }
        ConfigAction::Show => {
            let config = Config::load();
            let content =
                toml::to_string_pretty(&config.redacted()).context("Failed to serialize config")?;
            print!("{}", content);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load();
            config.set_key(key, &value)?;
            config.save()?;
            if !quiet {
                eprintln!("{}", style::format_success(&format!("Set {:?}", key), no_color));
            }
        }
        ConfigAction::Unset { key } => {
            let mut config = Config::load();
            config.unset_key(key);
            config.save()?;
            if !quiet {
                eprintln!("{}", style::format_success(&format!("Unset {:?}", key), no_color));
            }
        }
    }
    Ok(())
}
