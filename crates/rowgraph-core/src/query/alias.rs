//! Per-query alias allocation.

use std::collections::{HashMap, HashSet};

use super::column::projection_label;

/// Hands out aliases that are unique within one query build.
///
/// The first occurrence of a field name gets the name itself; later
/// occurrences get `name_1`, `name_2`, and so on. Suffixes are never reused
/// and names already issued (including the root alias) are skipped.
///
/// The allocator also tracks the `<alias>_<column>` projection labels
/// reserved so far. A candidate alias whose labels would collide with a
/// reserved one is skipped like an issued name, e.g. `owner` for an `id`
/// column when the root already projects `item_owner_id` under `item`.
#[derive(Debug, Default)]
pub struct AliasAllocator {
    issued: HashSet<String>,
    counters: HashMap<String, usize>,
    labels: HashSet<String>,
}

impl AliasAllocator {
    /// Create an allocator with `root` already taken.
    pub fn new(root: impl Into<String>) -> Self {
        let mut issued = HashSet::new();
        issued.insert(root.into());
        Self {
            issued,
            counters: HashMap::new(),
            labels: HashSet::new(),
        }
    }

    /// Allocate a fresh alias for an occurrence of `field`.
    pub fn allocate(&mut self, field: &str) -> String {
        self.allocate_for::<&str>(field, &[])
    }

    /// Allocate a fresh alias for `field` whose labels over `columns` are
    /// all unreserved.
    ///
    /// The labels are not reserved by this call; see [`AliasAllocator::reserve`].
    pub fn allocate_for<S: AsRef<str>>(&mut self, field: &str, columns: &[S]) -> String {
        let mut next = self.counters.get(field).copied().unwrap_or(0);
        loop {
            let candidate = match next {
                0 => field.to_string(),
                n => format!("{field}_{n}"),
            };
            next += 1;
            if !self.issued.contains(&candidate) && !self.collides(&candidate, columns) {
                self.counters.insert(field.to_string(), next);
                self.issued.insert(candidate.clone());
                return candidate;
            }
        }
    }

    /// Reserve the labels of `columns` projected through `alias`.
    pub fn reserve<S: AsRef<str>>(&mut self, alias: &str, columns: &[S]) {
        self.labels.extend(
            columns
                .iter()
                .map(|column| projection_label(alias, column.as_ref())),
        );
    }

    /// Check if `label` has been reserved.
    pub fn is_reserved(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    /// Check if `alias` has been issued.
    pub fn is_issued(&self, alias: &str) -> bool {
        self.issued.contains(alias)
    }

    /// Number of issued aliases, including the root.
    pub fn len(&self) -> usize {
        self.issued.len()
    }

    /// Check if nothing has been issued.
    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }

    fn collides<S: AsRef<str>>(&self, alias: &str, columns: &[S]) -> bool {
        columns
            .iter()
            .any(|column| self.labels.contains(&projection_label(alias, column.as_ref())))
    }
}
