//! setlint-validate - Check registry, plugin loading and orchestration
//!
//! This crate turns a directory of `.rhai` plugin modules plus any
//! compiled-in checks into a [`CheckRegistry`], and runs it against a
//! [`setlint_core::ContentSet`].
//!
//! # Architecture
//!
//! - [`PluginLoader`] discovers modules and compiles them in parallel
//! - [`CheckRegistry`] holds the loaded checks, partitioned by tier
//! - [`Checker`] runs the whole-set, per-document and cross-document
//!   phases on a bounded worker pool and merges the issues by severity
//!
//! # Example
//!
//! ```
//! use setlint_core::{Check, CheckMetadata, CheckResult, ContentSet, Issue, WholeSetCheck};
//! use setlint_validate::Checker;
//!
//! struct HasDocuments;
//!
//! impl WholeSetCheck for HasDocuments {
//!     fn metadata(&self) -> CheckMetadata {
//!         CheckMetadata::new("has-documents", "Empty sets.")
//!     }
//!
//!     fn issues(&self, set: &ContentSet) -> CheckResult {
//!         if set.is_empty() {
//!             Ok(vec![Issue::problem("The set has no documents.")])
//!         } else {
//!             Ok(Vec::new())
//!         }
//!     }
//! }
//!
//! let plugins = tempfile::tempdir().unwrap();
//! let checker = Checker::new(plugins.path()).with_builtin([Check::whole_set(HasDocuments)]);
//!
//! let issues = checker.get_issues(&ContentSet::new("empty")).unwrap();
//! assert_eq!(issues.len(), 1);
//! ```

pub mod checker;
pub mod config;
pub mod error;
pub mod loader;
pub mod pool;
pub mod registry;
pub mod track;

pub use checker::Checker;
pub use config::Settings;
pub use error::{Result, ValidateError};
pub use loader::PluginLoader;
pub use registry::CheckRegistry;
pub use track::{LoadHooks, Track};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
