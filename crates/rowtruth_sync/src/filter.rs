//! View filters bounding which objects a pass covers.

use std::collections::{BTreeMap, BTreeSet};

/// A predicate selecting which objects are in scope for a pass.
///
/// Filters are produced and owned by an external collaborator; the
/// synchronizer only needs membership by object id plus the filter's named
/// parameters for diagnostics. Both legs of one pass must be given the same
/// filter, or the merge would report scope differences as drift.
pub trait ViewFilter: Send + Sync {
    /// Returns true if the object is in scope.
    fn includes(&self, object_id: u64) -> bool;

    /// Returns the filter's named parameters, for diagnostics only.
    fn parameters(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }
}

/// A filter built from explicit include and exclude sets.
///
/// With no include set, every id not explicitly excluded is in scope.
#[derive(Debug, Clone, Default)]
pub struct ScopeFilter {
    included: Option<BTreeSet<u64>>,
    excluded: BTreeSet<u64>,
}

impl ScopeFilter {
    /// Creates a filter covering every object.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Creates a filter covering exactly the given ids.
    #[must_use]
    pub fn of(ids: impl IntoIterator<Item = u64>) -> Self {
        Self {
            included: Some(ids.into_iter().collect()),
            excluded: BTreeSet::new(),
        }
    }

    /// Excludes the given ids.
    #[must_use]
    pub fn without(mut self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.excluded.extend(ids);
        self
    }
}

impl ViewFilter for ScopeFilter {
    fn includes(&self, object_id: u64) -> bool {
        if self.excluded.contains(&object_id) {
            return false;
        }
        match &self.included {
            Some(included) => included.contains(&object_id),
            None => true,
        }
    }

    fn parameters(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        if let Some(included) = &self.included {
            params.insert("included".to_string(), included.len().to_string());
        }
        if !self.excluded.is_empty() {
            params.insert("excluded".to_string(), self.excluded.len().to_string());
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_includes_everything() {
        let filter = ScopeFilter::all();
        assert!(filter.includes(0));
        assert!(filter.includes(u64::MAX));
    }

    #[test]
    fn of_restricts_membership() {
        let filter = ScopeFilter::of([1, 3]);
        assert!(filter.includes(1));
        assert!(!filter.includes(2));
        assert!(filter.includes(3));
    }

    #[test]
    fn without_wins_over_inclusion() {
        let filter = ScopeFilter::of([1, 2]).without([2]);
        assert!(filter.includes(1));
        assert!(!filter.includes(2));

        let filter = ScopeFilter::all().without([7]);
        assert!(filter.includes(6));
        assert!(!filter.includes(7));
    }

    #[test]
    fn parameters_describe_sets() {
        let filter = ScopeFilter::of([1, 2, 3]).without([2]);
        let params = filter.parameters();
        assert_eq!(params.get("included"), Some(&"3".to_string()));
        assert_eq!(params.get("excluded"), Some(&"1".to_string()));
    }
}
