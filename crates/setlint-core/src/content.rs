//! Content set and document definitions
//!
//! A [`ContentSet`] is the unit being validated: an ordered list of
//! [`Document`]s plus set-level attributes. Each document declares a
//! [`Mode`] that decides which per-document and cross-document checks apply.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Classification of a document, used to filter check applicability
///
/// Modes are compared by their lowercase name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Mode(String);

impl Mode {
    /// Create a mode from its name
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_lowercase())
    }

    /// The normalized mode name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Mode {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<&str> for Mode {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<Mode> for String {
    fn from(mode: Mode) -> Self {
        mode.0
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One unit within a content set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document name, used to label issues
    pub name: String,

    /// Declared mode of the document
    pub mode: Mode,

    /// Path of the backing file, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Free-form attributes read by checks
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

impl Document {
    /// Create a document with a name and mode
    pub fn new(name: impl Into<String>, mode: impl Into<Mode>) -> Self {
        Self {
            name: name.into(),
            mode: mode.into(),
            path: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Set the backing file path
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add an attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// The top-level unit being validated
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContentSet {
    /// Set name
    #[serde(default)]
    pub name: String,

    /// Root directory of the set on disk, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// Set-level attributes
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,

    /// Documents in declaration order
    #[serde(default)]
    pub documents: Vec<Document>,
}

impl ContentSet {
    /// Create an empty content set
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a document
    pub fn with_document(mut self, document: Document) -> Self {
        self.documents.push(document);
        self
    }

    /// Add a set-level attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Check whether any document has one of the given modes
    pub fn has_any_mode(&self, modes: &BTreeSet<Mode>) -> bool {
        self.documents.iter().any(|d| modes.contains(&d.mode))
    }

    /// Distinct modes present in the set
    pub fn modes(&self) -> BTreeSet<Mode> {
        self.documents.iter().map(|d| d.mode.clone()).collect()
    }

    /// Check if the set has no documents
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Get the number of documents
    pub fn len(&self) -> usize {
        self.documents.len()
    }
}
