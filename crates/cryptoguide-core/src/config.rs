use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::protocol::Protocol;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const BACKEND_URL_ENV: &str = "CRYPTOGUIDE_BACKEND_URL";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Config {
    #[serde(default)]
    pub backend_url: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub default_protocol: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn save_default_protocol(protocol: Protocol) -> Result<()> {
        let mut config = Self::load().unwrap_or_else(|_| Self::new());
        config.default_protocol = Some(protocol.as_str().to_string());
        config.save()
    }

    /// Flag value first, then the environment, then the file, then the default.
    pub fn resolve_backend_url(&self, flag: Option<&str>) -> String {
        self.resolve_backend_url_with(flag, std::env::var(BACKEND_URL_ENV).ok())
    }

    fn resolve_backend_url_with(&self, flag: Option<&str>, env: Option<String>) -> String {
        let usable = |url: &String| !url.trim().is_empty();
        flag.map(str::to_string)
            .filter(usable)
            .or_else(|| env.filter(usable))
            .or_else(|| self.backend_url.clone().filter(usable))
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        )
    }

    pub fn default_protocol(&self) -> Protocol {
        self.default_protocol
            .as_deref()
            .and_then(Protocol::from_str)
            .unwrap_or(Protocol::Aave)
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("cryptoguide"))
    }

    fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }
}
