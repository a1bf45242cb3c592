//! Remap tables: `before` sequences to remappings, per family and recursion class

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::keymap::{display_keys, Key, KeySequence, MapMode};

use super::remapping::Remapping;

/// A remapping found at the end of the typed keys
#[derive(Debug, Clone, PartialEq)]
pub struct RemapMatch {
    pub remapping: Arc<Remapping>,
    /// Offset of `before` within the keys it was found in
    pub start: usize,
}

impl RemapMatch {
    /// Offset just past the matched `before`
    pub fn end(&self) -> usize {
        self.start + self.remapping.before.len()
    }
}

/// Remappings of one family and recursion class
///
/// Immutable once built; reloads build a new table.
#[derive(Debug, Clone, Default)]
pub struct RemapTable {
    map: HashMap<KeySequence, Arc<Remapping>>,
    /// Every strict, non-empty prefix of every `before`
    prefixes: HashSet<KeySequence>,
    min_len: usize,
    max_len: usize,
}

impl RemapTable {
    /// Build a table; a later remapping with the same `before` replaces an earlier one
    pub fn new(remappings: impl IntoIterator<Item = Remapping>) -> Self {
        let mut map = HashMap::new();
        for remapping in remappings {
            if remapping.before.is_empty() {
                continue;
            }
            map.insert(remapping.before.clone(), Arc::new(remapping));
        }

        let mut prefixes = HashSet::new();
        for before in map.keys() {
            for len in 1..before.len() {
                prefixes.insert(before[..len].to_vec());
            }
        }

        let min_len = map.keys().map(Vec::len).min().unwrap_or(0);
        let max_len = map.keys().map(Vec::len).max().unwrap_or(0);

        Self {
            map,
            prefixes,
            min_len,
            max_len,
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get(&self, before: &[Key]) -> Option<&Arc<Remapping>> {
        self.map.get(before)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Remapping>> {
        self.map.values()
    }

    /// A copy holding only the remappings `keep` accepts
    pub fn retained(&self, keep: impl Fn(&Remapping) -> bool) -> Self {
        Self::new(
            self.map
                .values()
                .filter(|r| keep(r))
                .map(|r| Remapping::clone(r)),
        )
    }

    /// A copy with `remapping` added, replacing one with the same `before`
    pub fn extended(&self, remapping: Remapping) -> Self {
        Self::new(
            self.map
                .values()
                .map(|r| Remapping::clone(r))
                .chain(std::iter::once(remapping)),
        )
    }

    /// Whether `keys` is a strict, non-empty prefix of some `before`
    pub fn is_strict_prefix(&self, keys: &[Key]) -> bool {
        !keys.is_empty() && keys.len() < self.max_len && self.prefixes.contains(keys)
    }

    /// Longest suffix of `keys` that is a `before`
    ///
    /// Keys in front of the suffix must all be count digits, unless
    /// `allow_any_preceding` is set.
    pub fn longest_suffix_match(
        &self,
        keys: &[Key],
        allow_any_preceding: bool,
    ) -> Option<RemapMatch> {
        if self.is_empty() || keys.len() < self.min_len {
            return None;
        }

        let longest = self.max_len.min(keys.len());
        (self.min_len..=longest).rev().find_map(|len| {
            let start = keys.len() - len;
            let preceding = &keys[..start];
            if !allow_any_preceding && !preceding.iter().all(|k| k.digit().is_some()) {
                return None;
            }
            self.map.get(&keys[start..]).map(|remapping| RemapMatch {
                remapping: Arc::clone(remapping),
                start,
            })
        })
    }
}

/// All remap tables of a session, keyed by family and recursion class
#[derive(Debug, Clone, Default)]
pub struct RemapTables {
    tables: HashMap<(MapMode, bool), RemapTable>,
}

impl RemapTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mode: MapMode, recursive: bool, table: RemapTable) {
        self.tables.insert((mode, recursive), table);
    }

    pub fn table(&self, mode: MapMode, recursive: bool) -> Option<&RemapTable> {
        self.tables.get(&(mode, recursive))
    }

    /// Both tables of a family, recursive first
    fn family(&self, mode: MapMode) -> impl Iterator<Item = &RemapTable> {
        [true, false]
            .into_iter()
            .filter_map(move |recursive| self.table(mode, recursive))
    }

    /// Whether any remapping is declared for this family
    pub fn covers(&self, mode: MapMode) -> bool {
        self.family(mode).any(|t| !t.is_empty())
    }

    pub fn len(&self) -> usize {
        self.tables.values().map(RemapTable::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy with `remapping` in each family, replacing any remapping of the
    /// same keys in either class
    pub fn with_remapping(&self, modes: &[MapMode], remapping: &Remapping) -> Self {
        let mut tables = self
            .without(modes, &remapping.before)
            .unwrap_or_else(|| self.clone());
        for &mode in modes {
            let table = tables
                .table(mode, remapping.recursive)
                .cloned()
                .unwrap_or_default();
            tables.insert(mode, remapping.recursive, table.extended(remapping.clone()));
        }
        tables
    }

    /// Copy without remappings of `before` in these families, `None` when
    /// there is nothing to remove
    pub fn without(&self, modes: &[MapMode], before: &[Key]) -> Option<Self> {
        let mut tables = self.clone();
        let mut removed = false;
        for &mode in modes {
            for recursive in [true, false] {
                let Some(table) = self.table(mode, recursive) else {
                    continue;
                };
                if table.get(before).is_some() {
                    tables.insert(mode, recursive, table.retained(|r| r.before != before));
                    removed = true;
                }
            }
        }
        removed.then_some(tables)
    }

    /// Copy with every remapping of these families gone
    pub fn cleared(&self, modes: &[MapMode]) -> Self {
        let mut tables = self.clone();
        tables.tables.retain(|(mode, _), _| !modes.contains(mode));
        tables
    }

    /// Remappings of a family whose `before` starts with `prefix`, in key order
    pub fn listing(&self, mode: MapMode, prefix: &[Key]) -> Vec<&Arc<Remapping>> {
        let mut found: Vec<&Arc<Remapping>> = self
            .family(mode)
            .flat_map(RemapTable::iter)
            .filter(|r| r.before.starts_with(prefix))
            .collect();
        found.sort_by_cached_key(|r| display_keys(&r.before));
        found
    }

    /// The candidate remap for `keys`: longest suffix across both classes,
    /// with the recursive class winning ties
    pub fn find_candidate(&self, mode: MapMode, keys: &[Key]) -> Option<RemapMatch> {
        let allow_any_preceding = mode.allows_preceding_keys();
        let mut best: Option<RemapMatch> = None;
        for table in self.family(mode) {
            if let Some(found) = table.longest_suffix_match(keys, allow_any_preceding) {
                let longer = best
                    .as_ref()
                    .is_none_or(|b| found.remapping.before.len() > b.remapping.before.len());
                if longer {
                    best = Some(found);
                }
            }
        }
        best
    }

    /// Whether `keys` could still grow into some remapping of this family
    ///
    /// A leading count is skipped outside insert mode, the same way
    /// candidates tolerate it.
    pub fn is_potential(&self, mode: MapMode, keys: &[Key]) -> bool {
        let keys = if mode.allows_preceding_keys() {
            keys
        } else {
            let count_len = keys.iter().take_while(|k| k.digit().is_some()).count();
            &keys[count_len..]
        };
        self.family(mode).any(|t| t.is_strict_prefix(keys))
    }
}
