//! Issues reported by checks
//!
//! An [`Issue`] is a single finding: a severity, a message and optional
//! location context. The check that produced it is recorded as its origin
//! once the orchestrator collects it.

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::check::CheckInfo;

/// Severity level of an issue
///
/// Ordered from least to most severe, so sorting in descending order puts
/// the most pressing issues first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational note, not a problem
    Info,

    /// Cosmetic or trivial issue
    Minor,

    /// Potential issue that deserves a look
    Warning,

    /// Issue that should be fixed
    Problem,

    /// Issue that must be fixed
    Error,
}

impl Severity {
    /// All severities, least severe first
    pub const ALL: [Severity; 5] = [
        Severity::Info,
        Severity::Minor,
        Severity::Warning,
        Severity::Problem,
        Severity::Error,
    ];

    /// Parse a severity name, ignoring case
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "info" => Some(Severity::Info),
            "minor" => Some(Severity::Minor),
            "warning" => Some(Severity::Warning),
            "problem" => Some(Severity::Problem),
            "error" => Some(Severity::Error),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Minor => write!(f, "minor"),
            Severity::Warning => write!(f, "warning"),
            Severity::Problem => write!(f, "problem"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A finding produced by a check
///
/// # Example
///
/// ```
/// use setlint_core::{Issue, Severity};
///
/// let issue = Issue::warning("Preview point is missing")
///     .with_document("Hard")
///     .with_context("[General] section");
///
/// assert_eq!(issue.severity, Severity::Warning);
/// assert!(issue.origin().is_none());
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    /// Severity level of the issue
    pub severity: Severity,

    /// The issue message
    pub message: String,

    /// Name of the document the issue is about, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,

    /// Free-form location context (timestamp, section, file name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// The check that produced this issue
    #[serde(
        rename = "check",
        serialize_with = "serialize_origin",
        skip_serializing_if = "Option::is_none"
    )]
    origin: Option<Arc<CheckInfo>>,
}

impl Issue {
    /// Create a new issue
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            document: None,
            context: None,
            origin: None,
        }
    }

    /// Create an info issue
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    /// Create a minor issue
    pub fn minor(message: impl Into<String>) -> Self {
        Self::new(Severity::Minor, message)
    }

    /// Create a warning issue
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// Create a problem issue
    pub fn problem(message: impl Into<String>) -> Self {
        Self::new(Severity::Problem, message)
    }

    /// Create an error issue
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Set the document the issue refers to
    pub fn with_document(mut self, document: impl Into<String>) -> Self {
        self.document = Some(document.into());
        self
    }

    /// Set location context
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Record the check that produced this issue.
    ///
    /// The orchestrator calls this on every issue a check returns and
    /// replaces whatever origin was there before.
    pub fn with_origin(mut self, origin: Arc<CheckInfo>) -> Self {
        self.origin = Some(origin);
        self
    }

    /// The check that produced this issue, once collected
    pub fn origin(&self) -> Option<&CheckInfo> {
        self.origin.as_deref()
    }

    /// Shared handle to the originating check
    pub fn origin_handle(&self) -> Option<&Arc<CheckInfo>> {
        self.origin.as_ref()
    }

    /// Check if this is an error-level issue
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

fn serialize_origin<S: Serializer>(
    origin: &Option<Arc<CheckInfo>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match origin {
        Some(info) => serializer.serialize_str(&info.name),
        None => serializer.serialize_none(),
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Format: severity: message
        write!(f, "{}: {}", self.severity, self.message)?;

        if let Some(ref document) = self.document {
            write!(f, "\n  --> {}", document)?;
        }

        if let Some(ref context) = self.context {
            write!(f, "\n  = at: {}", context)?;
        }

        if let Some(ref origin) = self.origin {
            write!(f, "\n  = check: {}", origin.name)?;
        }

        Ok(())
    }
}
