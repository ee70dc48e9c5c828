use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

use crate::ai::gemini::DEFAULT_MODEL;
use crate::relay::DEFAULT_RELAY_URL;

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub model: Option<String>,
    pub relay_url: Option<String>,
    pub listen_addr: Option<String>,
    /// Origin allowed by the relay's CORS policy; any origin when unset
    pub allowed_origin: Option<String>,
    /// Replaces the built-in assistant prompt
    pub system_prompt: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    /// API key: GEMINI_API_KEY env var first, then config
    pub fn gemini_api_key(&self) -> Option<String> {
        env_value("GEMINI_API_KEY").or_else(|| non_empty(&self.gemini_api_key))
    }

    pub fn model(&self) -> String {
        non_empty(&self.model).unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

    pub fn relay_url(&self) -> String {
        env_value("KAIROS_RELAY_URL")
            .or_else(|| non_empty(&self.relay_url))
            .unwrap_or_else(|| DEFAULT_RELAY_URL.to_string())
    }

    pub fn listen_addr(&self) -> String {
        env_value("KAIROS_LISTEN")
            .or_else(|| non_empty(&self.listen_addr))
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("kairos").join("config.json"))
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.trim().is_empty()).cloned()
}
