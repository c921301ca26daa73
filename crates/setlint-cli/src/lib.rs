//! setlint CLI - Command-line interface library
//!
//! This library provides the CLI functionality for setlint:
//! - Check: run every loaded check against a content set file
//! - List: show the checks found in the plugin directory
//!
//! # Library Usage
//!
//! ```ignore
//! use setlint_cli::{collect_issues, load_settings};
//!
//! let settings = load_settings(None)?;
//! let issues = collect_issues(Path::new("set.toml"), &settings, false)?;
//! ```
//!
//! # Binary Usage
//!
//! ```bash
//! # Check a content set with the plugins in ./checks
//! setlint check set.toml
//!
//! # Use another plugin directory and emit JSON
//! setlint check set.json --plugins lint/ --format json
//!
//! # List available checks
//! setlint list
//! ```

pub mod app;

// Re-export main entry point and types
pub use app::{
    apply_overrides, available_checks, check_command, collect_issues, discover_settings,
    list_command, load_content_set, load_settings, render_check_list, render_issues,
};
pub use app::{run_cli, OutputFormat};
