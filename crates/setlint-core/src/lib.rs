//! setlint-core - Shared types for the setlint check engine
//!
//! This crate holds everything checks and the orchestrator agree on:
//!
//! - [`Issue`] and [`Severity`]: the findings a check produces
//! - [`ContentSet`], [`Document`] and [`Mode`]: the content being checked
//! - [`Check`] and the three tier traits ([`WholeSetCheck`],
//!   [`DocumentCheck`], [`CrossDocumentCheck`])
//!
//! # Example
//!
//! ```
//! use setlint_core::{Check, CheckMetadata, CheckResult, ContentSet, Issue, WholeSetCheck};
//!
//! struct NonEmpty;
//!
//! impl WholeSetCheck for NonEmpty {
//!     fn metadata(&self) -> CheckMetadata {
//!         CheckMetadata::new("non-empty", "Sets without documents.")
//!     }
//!
//!     fn issues(&self, set: &ContentSet) -> CheckResult {
//!         if set.documents.is_empty() {
//!             return Ok(vec![Issue::problem("The set contains no documents")]);
//!         }
//!         Ok(Vec::new())
//!     }
//! }
//!
//! let check = Check::whole_set(NonEmpty);
//! assert_eq!(check.info().name, "non-empty");
//! ```

pub mod check;
pub mod content;
pub mod issue;

pub use check::{
    Check, CheckBody, CheckError, CheckInfo, CheckMetadata, CheckResult, CrossDocumentCheck,
    DocumentCheck, Tier, WholeSetCheck,
};
pub use content::{ContentSet, Document, Mode};
pub use issue::{Issue, Severity};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
