//! Configuration Module
//!
//! TOML configuration with serde defaults, overridable by environment
//! variables (`PORT`, `SPREADSHEET_ID`, `GOOGLE_SERVICE_ACCOUNT_KEY_PATH`,
//! `OPENAI_API_KEY`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP gateway (QR page)
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Google Sheets datastore
    #[serde(default)]
    pub sheets: SheetsConfig,

    /// Intent extraction model
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Data directory for channel session storage. Defaults to
    /// `~/.mercabot`.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_bind")]
    pub bind: String,

    #[serde(default = "default_gateway_port")]
    pub port: u16,
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_gateway_bind(),
            port: default_gateway_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SheetsConfig {
    #[serde(default)]
    pub spreadsheet_id: String,

    /// Path to the Google service-account key JSON.
    #[serde(default)]
    pub service_account_key_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Normally supplied via `OPENAI_API_KEY`, never written to disk.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default = "default_openai_model")]
    pub model: String,
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_openai_model(),
        }
    }
}

/// Data home: `~/.mercabot` (or the current directory as a last resort).
pub fn mercabot_home() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".mercabot"))
        .unwrap_or_else(|| PathBuf::from(".mercabot"))
}

impl Config {
    /// Load from the given TOML file (or defaults when absent), then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("failed to read config file {}", path.display()))?;
                toml::from_str(&raw)
                    .with_context(|| format!("invalid config file {}", path.display()))?
            }
            None => {
                let default_path = mercabot_home().join("config.toml");
                if default_path.exists() {
                    let raw = fs::read_to_string(&default_path).with_context(|| {
                        format!("failed to read config file {}", default_path.display())
                    })?;
                    toml::from_str(&raw).with_context(|| {
                        format!("invalid config file {}", default_path.display())
                    })?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(port) = std::env::var("PORT")
            && let Ok(port) = port.parse()
        {
            self.gateway.port = port;
        }
        if let Ok(id) = std::env::var("SPREADSHEET_ID") {
            self.sheets.spreadsheet_id = id;
        }
        if let Ok(path) = std::env::var("GOOGLE_SERVICE_ACCOUNT_KEY_PATH") {
            self.sheets.service_account_key_path = Some(PathBuf::from(path));
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.openai.api_key = Some(key);
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            self.openai.model = model;
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(mercabot_home)
    }
}
