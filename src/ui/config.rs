//! # Configuration
//!
//! User configuration read from `~/.config/host-test/config.json`.
//!
//! ## Overview
//!
//! Every field has a default, so a missing file or an empty object yields a
//! working setup that talks to the Chrome/Discord bridge host. Command-line
//! flags override individual fields after loading. The file is only ever
//! read; the harness keeps no state between runs.
//!
//! ```json
//! {
//!   "theme": "Nord",
//!   "host": "io.github.p00ya.cdb",
//!   "client_id": "922040684020645908",
//!   "activity_state": "Testing with host-test",
//!   "activity_pid": 0,
//!   "origin": "chrome-extension://host-test/",
//!   "manifest_dirs": ["/opt/hosts"]
//! }
//! ```
//!
//! The `directories` crate resolves the platform-appropriate config directory.

use crate::panel::{PanelSettings, DEFAULT_ACTIVITY_STATE, DEFAULT_CLIENT_ID};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Host the panel offers by default: the Chrome/Discord bridge.
pub const DEFAULT_HOST: &str = "io.github.p00ya.cdb";

/// Origin passed to spawned hosts when none is configured.
pub const DEFAULT_ORIGIN: &str = "chrome-extension://host-test/";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Name of a built-in theme.
    #[serde(default = "default_theme_name")]
    pub theme: String,

    /// Host id pre-filled in the host input.
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_client_id")]
    pub client_id: String,

    #[serde(default = "default_activity_state")]
    pub activity_state: String,

    #[serde(default)]
    pub activity_pid: u32,

    /// Extension origin presented to hosts as their first argument.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Extra manifest directories, searched before the browser's own.
    #[serde(default)]
    pub manifest_dirs: Vec<PathBuf>,
}

fn default_theme_name() -> String {
    "Catppuccin Mocha".to_string()
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_client_id() -> String {
    DEFAULT_CLIENT_ID.to_string()
}

fn default_activity_state() -> String {
    DEFAULT_ACTIVITY_STATE.to_string()
}

fn default_origin() -> String {
    DEFAULT_ORIGIN.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: default_theme_name(),
            host: default_host(),
            client_id: default_client_id(),
            activity_state: default_activity_state(),
            activity_pid: 0,
            origin: default_origin(),
            manifest_dirs: Vec::new(),
        }
    }
}

impl Config {
    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing file yields `Config::default()`; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => Self::load_from(&Self::config_path()?),
        }
    }

    /// Load configuration from a specific path. Returns `Config::default()` if
    /// the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Settings for the connection panel's outgoing payloads.
    pub fn panel_settings(&self) -> PanelSettings {
        PanelSettings {
            client_id: self.client_id.clone(),
            activity_state: self.activity_state.clone(),
            activity_pid: self.activity_pid,
        }
    }

    /// Return the path to the config file.
    pub fn config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "host-test")
            .context("Could not determine config directory")?;
        Ok(dirs.config_dir().join("config.json"))
    }
}
