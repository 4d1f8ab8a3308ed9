//! Config commands

use anyhow::{bail, Result};

use crate::config::{Config, KEYS};
use crate::output::{self, OutputFormat};
use crate::ConfigCommands;

pub fn handle(action: ConfigCommands, profile: Option<&str>) -> Result<()> {
    match action {
        ConfigCommands::Init => {
            let path = Config::default().save(profile)?;
            output::success(&format!("Configuration initialized at {}", path.display()));
        }
        ConfigCommands::Set { key, value } => {
            if key == "default_format" && OutputFormat::from_setting(&value).is_none() {
                bail!("default_format must be one of table, json, yaml");
            }
            let mut config = Config::load(profile)?;
            config.set(&key, value)?;
            config.save(profile)?;
            output::success(&format!("Set {} successfully", key));
        }
        ConfigCommands::Get { key } => {
            let config = Config::load(profile)?;
            println!("{}: {}", key, config.get(&key)?.unwrap_or_else(|| "(not set)".into()));
        }
        ConfigCommands::List => {
            let config = Config::load(profile)?;
            for key in KEYS {
                println!("{}: {}", key, config.get(key)?.unwrap_or_else(|| "(not set)".into()));
            }
        }
    }
    Ok(())
}
