//! # Configuration Management Module
//!
//! Questo modulo gestisce la configurazione persistente dello strumento.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con i parametri dei tool esterni
//! - Fornisce validazione dei parametri caricati da file
//! - Supporta caricamento/salvataggio da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `lossy_range`: Range qualità pngquant (default: 65-80)
//! - `lossy_speed`: Velocità pngquant 1-11 (default: 3)
//! - `lossless_level`: Livello ottimizzazione optipng/oxipng 0-7 (default: 2)
//! - `tool_timeout_secs`: Timeout per ogni tool esterno (default: 120)
//! - `resize_tools` / `lossy_tools` / `lossless_tools`: Tool in ordine di
//!   preferenza. Una lista vuota disabilita la capability.
//!
//! ## Posizione del file:
//! `--config FILE`, altrimenti `<config_dir>/png-minify/config.json` se esiste,
//! altrimenti i default.
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     lossless_level: 5,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use crate::request::QualityRange;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the external tools driven by the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Quality range handed to the lossy compressor when `--lossy` is not given
    pub lossy_range: QualityRange,
    /// pngquant speed/quality trade-off (1 = slowest, 11 = fastest)
    pub lossy_speed: u8,
    /// Optimization level for the lossless optimizer (0-7)
    pub lossless_level: u8,
    /// Seconds before an external tool is killed
    pub tool_timeout_secs: u64,
    /// Resize tools in order of preference
    pub resize_tools: Vec<String>,
    /// Lossy compressors in order of preference
    pub lossy_tools: Vec<String>,
    /// Lossless optimizers in order of preference
    pub lossless_tools: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lossy_range: QualityRange::default(),
            lossy_speed: 3,
            lossless_level: 2,
            tool_timeout_secs: 120,
            resize_tools: ["sips", "magick", "convert", "vips"].map(String::from).to_vec(),
            lossy_tools: vec!["pngquant".to_string()],
            lossless_tools: vec!["optipng".to_string(), "oxipng".to_string()],
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        self.lossy_range.validate()?;

        if self.lossy_speed == 0 || self.lossy_speed > 11 {
            return Err(anyhow::anyhow!("Lossy speed must be between 1 and 11"));
        }

        if self.lossless_level > 7 {
            return Err(anyhow::anyhow!("Lossless level must be between 0 and 7"));
        }

        if self.tool_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Tool timeout must be greater than 0"));
        }

        let all_tools = self.resize_tools.iter()
            .chain(&self.lossy_tools)
            .chain(&self.lossless_tools);
        for tool in all_tools {
            if tool.trim().is_empty() {
                return Err(anyhow::anyhow!("Tool names must not be empty"));
            }
        }

        Ok(())
    }

    /// Timeout applied to every external tool run
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    /// Default location of the configuration file, if the platform has one
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("png-minify").join("config.json"))
    }

    /// Load configuration from file, falling back to defaults when it does not exist
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config file {}: {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the explicit config file if given, otherwise the default location
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(anyhow::anyhow!("Config file does not exist: {}", path.display()));
                }
                Self::from_file(path).await
            }
            None => match Self::default_path() {
                Some(path) => Self::from_file(&path).await,
                None => Ok(Self::default()),
            },
        }
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
