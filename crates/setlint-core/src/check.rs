//! Check traits and metadata
//!
//! Checks come in three tiers, each with its own trait:
//!
//! - [`WholeSetCheck`]: runs once against the whole content set
//! - [`DocumentCheck`]: runs once per document whose mode it supports
//! - [`CrossDocumentCheck`]: runs once against the whole set, but only when
//!   at least one document has a supported mode
//!
//! A [`Check`] pairs a trait object with its [`CheckInfo`], which is what
//! issues point back to as their origin.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::content::{ContentSet, Document, Mode};
use crate::issue::Issue;

/// Errors a check can raise while producing issues
#[derive(Debug, Error)]
pub enum CheckError {
    /// The check gave up with a message
    #[error("{0}")]
    Failed(String),

    /// A scripted check failed to evaluate
    #[error("script error: {0}")]
    Script(String),

    /// I/O failure while inspecting content
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The check panicked
    #[error("check panicked: {0}")]
    Panicked(String),
}

/// Result type returned by check bodies
pub type CheckResult = std::result::Result<Vec<Issue>, CheckError>;

/// Granularity at which a check operates
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
    /// Whole content set
    WholeSet,
    /// One document at a time
    PerDocument,
    /// Whole set, gated on document modes
    CrossDocument,
}

impl Tier {
    /// All tiers in execution order
    pub const ALL: [Tier; 3] = [Tier::WholeSet, Tier::PerDocument, Tier::CrossDocument];
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "set" | "whole-set" | "general" => Ok(Tier::WholeSet),
            "document" | "per-document" => Ok(Tier::PerDocument),
            "cross" | "cross-document" => Ok(Tier::CrossDocument),
            other => Err(format!("unknown check tier '{}'", other)),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::WholeSet => write!(f, "whole-set"),
            Tier::PerDocument => write!(f, "per-document"),
            Tier::CrossDocument => write!(f, "cross-document"),
        }
    }
}

/// Metadata a check reports about itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckMetadata {
    /// Unique check identifier
    pub name: String,
    /// Human-readable purpose, e.g. "Unsnapped objects."
    pub message: String,
    /// Supported document modes (ignored for whole-set checks)
    pub modes: BTreeSet<Mode>,
}

impl CheckMetadata {
    /// Create metadata with no modes
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            modes: BTreeSet::new(),
        }
    }

    /// Set the supported modes
    pub fn with_modes<I, M>(mut self, modes: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<Mode>,
    {
        self.modes = modes.into_iter().map(Into::into).collect();
        self
    }
}

/// Identity of a registered check
///
/// Shared by every issue the check produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckInfo {
    /// Unique check identifier
    pub name: String,
    /// Human-readable purpose
    pub message: String,
    /// Execution tier
    pub tier: Tier,
    /// Supported document modes
    pub modes: BTreeSet<Mode>,
    /// Plugin module the check was loaded from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
}

impl CheckInfo {
    /// Create check info from a tier and metadata
    pub fn new(tier: Tier, metadata: CheckMetadata) -> Self {
        Self {
            name: metadata.name,
            message: metadata.message,
            tier,
            modes: metadata.modes,
            source: None,
        }
    }

    /// Check whether documents of `mode` are supported
    pub fn supports(&self, mode: &Mode) -> bool {
        self.modes.contains(mode)
    }
}

impl fmt::Display for CheckInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.tier)?;
        if let Some(ref source) = self.source {
            write!(f, " from {}", source.display())?;
        }
        Ok(())
    }
}

/// A check that runs once against the whole content set
pub trait WholeSetCheck: Send + Sync {
    /// Describe the check
    fn metadata(&self) -> CheckMetadata;

    /// Produce issues for the set
    fn issues(&self, set: &ContentSet) -> CheckResult;
}

/// A check that runs once per document of a supported mode
pub trait DocumentCheck: Send + Sync {
    /// Describe the check, including its supported modes
    fn metadata(&self) -> CheckMetadata;

    /// Produce issues for one document
    fn issues(&self, document: &Document) -> CheckResult;
}

/// A check that compares documents across the set
///
/// Runs only when at least one document has a supported mode, and then
/// receives the whole set.
pub trait CrossDocumentCheck: Send + Sync {
    /// Describe the check, including its supported modes
    fn metadata(&self) -> CheckMetadata;

    /// Produce issues for the set
    fn issues(&self, set: &ContentSet) -> CheckResult;
}

/// Tier-specific check body
#[derive(Clone)]
pub enum CheckBody {
    /// Whole-set check
    WholeSet(Arc<dyn WholeSetCheck>),
    /// Per-document check
    PerDocument(Arc<dyn DocumentCheck>),
    /// Cross-document check
    CrossDocument(Arc<dyn CrossDocumentCheck>),
}

/// A check instance ready for registration
#[derive(Clone)]
pub struct Check {
    info: Arc<CheckInfo>,
    body: CheckBody,
}

impl Check {
    /// Wrap a whole-set check
    pub fn whole_set(check: impl WholeSetCheck + 'static) -> Self {
        Self::from_whole_set(Arc::new(check))
    }

    /// Wrap a per-document check
    pub fn per_document(check: impl DocumentCheck + 'static) -> Self {
        Self::from_per_document(Arc::new(check))
    }

    /// Wrap a cross-document check
    pub fn cross_document(check: impl CrossDocumentCheck + 'static) -> Self {
        Self::from_cross_document(Arc::new(check))
    }

    /// Wrap a shared whole-set check
    pub fn from_whole_set(check: Arc<dyn WholeSetCheck>) -> Self {
        Self {
            info: Arc::new(CheckInfo::new(Tier::WholeSet, check.metadata())),
            body: CheckBody::WholeSet(check),
        }
    }

    /// Wrap a shared per-document check
    pub fn from_per_document(check: Arc<dyn DocumentCheck>) -> Self {
        Self {
            info: Arc::new(CheckInfo::new(Tier::PerDocument, check.metadata())),
            body: CheckBody::PerDocument(check),
        }
    }

    /// Wrap a shared cross-document check
    pub fn from_cross_document(check: Arc<dyn CrossDocumentCheck>) -> Self {
        Self {
            info: Arc::new(CheckInfo::new(Tier::CrossDocument, check.metadata())),
            body: CheckBody::CrossDocument(check),
        }
    }

    /// Record the plugin module this check came from
    pub fn with_source(mut self, source: impl AsRef<Path>) -> Self {
        Arc::make_mut(&mut self.info).source = Some(source.as_ref().to_path_buf());
        self
    }

    /// Check identity
    pub fn info(&self) -> &Arc<CheckInfo> {
        &self.info
    }

    /// Execution tier
    pub fn tier(&self) -> Tier {
        self.info.tier
    }

    /// Tier-specific body
    pub fn body(&self) -> &CheckBody {
        &self.body
    }
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Check").field("info", &self.info).finish()
    }
}
