//! FQDN filters
//!
//! Decides whether a DNS record name should be touched by a reconciliation
//! pass. Matching is raw, case-sensitive substring containment: no case
//! folding, no trailing-dot stripping and no label boundaries, so the filter
//! `ample` matches `example.com`.

use serde::{Deserialize, Serialize};

/// Return `true` if `fqdn` contains any of `filters`.
///
/// An empty filter list returns `empty_behavior` unconditionally. Pass `true`
/// for include lists (nothing configured means everything is included) and
/// `false` for exclude lists (nothing configured means nothing is excluded).
pub fn matches<S: AsRef<str>>(filters: &[S], fqdn: &str, empty_behavior: bool) -> bool {
    if filters.is_empty() {
        return empty_behavior;
    }
    filters.iter().any(|filter| fqdn.contains(filter.as_ref()))
}

/// Include and exclude filter lists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet {
    /// Names must contain one of these (empty = all names)
    #[serde(default)]
    pub include: Vec<String>,

    /// Names containing one of these are skipped (empty = none)
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl FilterSet {
    /// Create a filter set from include and exclude lists
    pub fn new(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self { include, exclude }
    }

    /// Whether `fqdn` passes the include filter
    pub fn included(&self, fqdn: &str) -> bool {
        matches(&self.include, fqdn, true)
    }

    /// Whether `fqdn` is caught by the exclude filter
    pub fn excluded(&self, fqdn: &str) -> bool {
        matches(&self.exclude, fqdn, false)
    }

    /// Whether a record named `fqdn` may be updated
    pub fn admits(&self, fqdn: &str) -> bool {
        self.included(fqdn) && !self.excluded(fqdn)
    }
}
