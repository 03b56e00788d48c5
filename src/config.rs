use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

use crate::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};

pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub default_model: Option<String>,
    pub api_key: Option<String>,
    pub api_base: Option<String>,
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
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn save_default_model(model: &str) -> Result<()> {
        let mut config = Self::load().unwrap_or_else(|_| Self::new());
        config.default_model = Some(model.to_string());
        config.save()
    }

    /// API key from the environment, falling back to the config file.
    pub fn resolve_api_key(&self, from_env: Option<String>) -> Result<String> {
        let usable = |k: &String| !k.trim().is_empty();
        from_env
            .filter(usable)
            .or_else(|| self.api_key.clone().filter(usable))
            .ok_or_else(|| anyhow!("{} is not set (export it or add it to a .env file)", API_KEY_ENV))
    }

    pub fn model(&self) -> String {
        self.default_model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

    pub fn api_base(&self) -> String {
        self.api_base.clone().unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("autosage").join("config.json"))
    }
}
