//! Configuration for the ttyctl utility.
//!
//! Loaded from `~/.ttyctl/config.toml`:
//!
//! ```toml
//! # Mode used by `ttyctl raw`: normal, raw, io
//! mode = "raw"
//!
//! # Ask the console to process VT sequences on start (Windows)
//! vterm = true
//!
//! # Log level: error, warn, info, debug, trace
//! log_level = "info"
//!
//! # Log file (default: ~/.ttyctl/ttyctl.log)
//! log_file = "/tmp/ttyctl.log"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::tty::TtyMode;

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Terminal mode used by interactive commands
    pub mode: TtyMode,
    /// Request virtual terminal processing on start
    pub vterm: bool,
    /// Log level filter
    pub log_level: String,
    /// Log file override
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: TtyMode::Raw,
            vterm: true,
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location, falling back to defaults
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load configuration from `path`; missing or invalid files yield defaults
    pub fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|content| toml::from_str(&content).ok())
            .unwrap_or_default()
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<(), String> {
        let dir = config_dir().ok_or_else(|| "Could not determine config path".to_string())?;
        fs::create_dir_all(&dir).map_err(|e| format!("Failed to create config dir: {}", e))?;
        let content = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;
        fs::write(dir.join("config.toml"), content)
            .map_err(|e| format!("Failed to write config: {}", e))
    }

    fn config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Where log output goes
    pub fn log_path(&self) -> PathBuf {
        self.log_file.clone().unwrap_or_else(|| {
            config_dir()
                .map(|dir| dir.join("ttyctl.log"))
                .unwrap_or_else(|| PathBuf::from("ttyctl.log"))
        })
    }
}

fn config_dir() -> Option<PathBuf> {
    home_dir().map(|home| home.join(".ttyctl"))
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
}
