//! Settings for plugin discovery and execution
//!
//! Read from a TOML file such as:
//!
//! ```toml
//! [plugins]
//! directory = "checks"
//!
//! [execution]
//! workers = 8
//! ```
//!
//! Every key is optional.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::pool;

/// Default plugin directory, relative to the working directory
pub const DEFAULT_PLUGIN_DIR: &str = "checks";

/// Settings file names looked up in the working directory
pub const SETTINGS_FILE_NAMES: [&str; 2] = ["setlint.toml", ".setlint.toml"];

/// Top-level settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Plugin discovery
    pub plugins: PluginSettings,

    /// Worker pool
    pub execution: ExecutionSettings,
}

/// Plugin discovery settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginSettings {
    /// Directory scanned for `.rhai` modules
    pub directory: PathBuf,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_PLUGIN_DIR),
        }
    }
}

/// Worker pool settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSettings {
    /// Maximum concurrent jobs; the host parallelism when unset
    pub workers: Option<usize>,
}

impl Settings {
    /// Parse settings from TOML text
    pub fn from_toml_str(input: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(input)
    }

    /// Effective worker count, never zero
    pub fn worker_count(&self) -> usize {
        self.execution
            .workers
            .filter(|n| *n > 0)
            .unwrap_or_else(pool::default_workers)
    }
}
