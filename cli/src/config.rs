//! CLI Configuration

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub api_url: Option<String>,
    pub default_format: Option<String>,
    pub timeout_secs: Option<u64>,
    pub page_size: Option<usize>,
}

/// Keys accepted by `portal config set/get`
pub const KEYS: [&str; 4] = ["api_url", "default_format", "timeout_secs", "page_size"];

impl Config {
    pub fn load(profile: Option<&str>) -> Result<Self> {
        Self::load_from(&Self::config_path(profile)?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn save(&self, profile: Option<&str>) -> Result<PathBuf> {
        let path = Self::config_path(profile)?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("writing {}", path.display()))
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(match key {
            "api_url" => self.api_url.clone(),
            "default_format" => self.default_format.clone(),
            "timeout_secs" => self.timeout_secs.map(|v| v.to_string()),
            "page_size" => self.page_size.map(|v| v.to_string()),
            _ => return Err(anyhow!("Unknown config key: {}", key)),
        })
    }

    pub fn set(&mut self, key: &str, value: String) -> Result<()> {
        match key {
            "api_url" => self.api_url = Some(value),
            "default_format" => self.default_format = Some(value),
            "timeout_secs" => self.timeout_secs = Some(value.parse().context("timeout_secs must be a number")?),
            "page_size" => self.page_size = Some(value.parse().context("page_size must be a number")?),
            _ => return Err(anyhow!("Unknown config key: {}", key)),
        }
        Ok(())
    }

    fn config_path(profile: Option<&str>) -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("Cannot find home directory"))?;
        let filename = match profile {
            Some(p) => format!("config.{}.toml", p),
            None => "config.toml".to_string(),
        };
        Ok(home.join(".portal").join(filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut config = Config::default();
        config.set("api_url", "http://localhost:8080/".into()).unwrap();
        config.set("page_size", "25".into()).unwrap();
        assert_eq!(config.get("api_url").unwrap().as_deref(), Some("http://localhost:8080/"));
        assert_eq!(config.page_size, Some(25));
        assert!(config.set("page_size", "many".into()).is_err());
        assert!(config.get("api_key").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("portal-config-{}.toml", std::process::id()));
        let config = Config {
            api_url: Some("https://forms.example.com/".into()),
            default_format: Some("json".into()),
            timeout_secs: Some(5),
            page_size: None,
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file_is_default() {
        let path = std::env::temp_dir().join("portal-config-does-not-exist.toml");
        assert_eq!(Config::load_from(&path).unwrap(), Config::default());
    }
}
