//! Error types for loading and running checks

use std::path::PathBuf;
use std::sync::Arc;

use setlint_core::{CheckError, CheckInfo};
use setlint_plugins::PluginError;
use thiserror::Error;

/// Errors surfaced by the loader and the orchestrator
#[derive(Debug, Error)]
pub enum ValidateError {
    /// A plugin module failed to load; aborts the whole load cycle
    #[error("Failed to load plugin module {}: {source}", .path.display())]
    PluginLoad {
        path: PathBuf,
        #[source]
        source: PluginError,
    },

    /// The plugin directory could not be created or listed
    #[error("Plugin directory {} is unusable: {source}", .path.display())]
    PluginDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The plugin directory produced an invalid search pattern
    #[error("Invalid plugin directory pattern: {0}")]
    PluginPattern(#[from] glob::PatternError),

    /// A check failed while producing issues; aborts the run
    #[error("Check '{}' failed: {source}", .check.name)]
    CheckFailed {
        check: Arc<CheckInfo>,
        #[source]
        source: CheckError,
    },
}

impl ValidateError {
    /// The check that caused a run to fail, if any
    pub fn failing_check(&self) -> Option<&CheckInfo> {
        match self {
            ValidateError::CheckFailed { check, .. } => Some(check),
            _ => None,
        }
    }
}

/// Result type for loader and orchestrator operations
pub type Result<T> = std::result::Result<T, ValidateError>;
