//! Check Registry
//!
//! Stores loaded checks partitioned by tier. Appends are atomic per call so
//! loader workers can register concurrently.

use std::sync::{PoisonError, RwLock};

use setlint_core::{Check, Tier};

#[derive(Default, Clone)]
struct Buckets {
    whole_set: Vec<Check>,
    per_document: Vec<Check>,
    cross_document: Vec<Check>,
}

impl Buckets {
    fn bucket(&self, tier: Tier) -> &Vec<Check> {
        match tier {
            Tier::WholeSet => &self.whole_set,
            Tier::PerDocument => &self.per_document,
            Tier::CrossDocument => &self.cross_document,
        }
    }

    fn bucket_mut(&mut self, tier: Tier) -> &mut Vec<Check> {
        match tier {
            Tier::WholeSet => &mut self.whole_set,
            Tier::PerDocument => &mut self.per_document,
            Tier::CrossDocument => &mut self.cross_document,
        }
    }
}

/// The loaded-check store
///
/// No deduplication: registering the same check twice runs it twice.
#[derive(Default)]
pub struct CheckRegistry {
    buckets: RwLock<Buckets>,
}

impl CheckRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a check to the bucket of its tier
    pub fn register(&self, check: Check) {
        let mut buckets = self.buckets.write().unwrap_or_else(PoisonError::into_inner);
        buckets.bucket_mut(check.tier()).push(check);
    }

    /// Remove every check
    pub fn clear(&self) {
        let mut buckets = self.buckets.write().unwrap_or_else(PoisonError::into_inner);
        *buckets = Buckets::default();
    }

    /// Install the contents of a fully built registry in one step
    pub fn replace_with(&self, other: CheckRegistry) {
        let staged = other
            .buckets
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        let mut buckets = self.buckets.write().unwrap_or_else(PoisonError::into_inner);
        *buckets = staged;
    }

    /// Detached copy of every tier, taken under a single lock
    ///
    /// Later changes to this registry do not affect the copy.
    pub fn snapshot(&self) -> CheckRegistry {
        let buckets = self.buckets.read().unwrap_or_else(PoisonError::into_inner);
        CheckRegistry {
            buckets: RwLock::new(buckets.clone()),
        }
    }

    /// Snapshot of the checks in one tier, in registration order
    pub fn checks(&self, tier: Tier) -> Vec<Check> {
        let buckets = self.buckets.read().unwrap_or_else(PoisonError::into_inner);
        buckets.bucket(tier).clone()
    }

    /// Snapshot of every check, tier by tier
    pub fn all(&self) -> Vec<Check> {
        let buckets = self.buckets.read().unwrap_or_else(PoisonError::into_inner);
        Tier::ALL
            .iter()
            .flat_map(|tier| buckets.bucket(*tier).iter().cloned())
            .collect()
    }

    /// Number of checks in one tier
    pub fn count(&self, tier: Tier) -> usize {
        let buckets = self.buckets.read().unwrap_or_else(PoisonError::into_inner);
        buckets.bucket(tier).len()
    }

    /// Total number of checks
    pub fn len(&self) -> usize {
        let buckets = self.buckets.read().unwrap_or_else(PoisonError::into_inner);
        Tier::ALL.iter().map(|tier| buckets.bucket(*tier).len()).sum()
    }

    /// Check if no tier has any check
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
