//! Dependency closure and offset resolution.
//!
//! Given the files a caller wants to load, the resolver finds the index keys
//! stored in those files, follows dependency edges to a fixpoint and returns
//! every container file and offset that must be read, in read order.

use std::collections::{BTreeSet, VecDeque};

use cabdex_common::file_name;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::hint::{rank_path, sort_paths, SortHint};
use crate::{Index, IndexEntry, Location};

/// How a requested file is matched against stored locations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchPolicy {
    /// File names must be equal (`blocks/31.blk` matches `31.blk`).
    #[default]
    BaseName,
    /// The request is a substring of the stored path. `1.blk` also matches
    /// `11.blk`; only use when stored paths are known not to collide.
    Containment,
}

/// Order in which dependencies are discovered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Expansion {
    /// Dependency pre-order, following each chain before the next sibling.
    #[default]
    DepthFirst,
    /// Direct dependencies of every matched key first, then the next level.
    BreadthFirst,
}

/// Offsets to read, grouped per container file in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedOffsets {
    order: Vec<String>,
    offsets: FxHashMap<String, BTreeSet<u64>>,
}

impl ResolvedOffsets {
    fn insert(&mut self, path: &str, offset: u64) {
        if let Some(set) = self.offsets.get_mut(path) {
            set.insert(offset);
            return;
        }
        self.order.push(path.to_string());
        self.offsets
            .insert(path.to_string(), BTreeSet::from([offset]));
    }

    /// Sorted offsets for a container, `None` if nothing was resolved in it.
    pub fn get(&self, path: &str) -> Option<&BTreeSet<u64>> {
        self.offsets.get(path)
    }

    /// Container paths in discovery order.
    pub fn paths(&self) -> &[String] {
        &self.order
    }

    /// Containers with their sorted offsets, in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<u64>)> + '_ {
        self.order
            .iter()
            .filter_map(|path| self.offsets.get(path).map(|set| (path.as_str(), set)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ResolvedOffsets {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.order.len()))?;
        for (path, offsets) in self.iter() {
            map.serialize_entry(path, offsets)?;
        }
        map.end()
    }
}

/// Result of a resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Resolution {
    /// Files to read, requested files first unless a sort hint reorders them.
    pub files: Vec<String>,
    /// Offsets per file. A requested file without an entry is read whole.
    pub offsets: ResolvedOffsets,
    /// Keys in the closure, in discovery order.
    pub keys: Vec<String>,
}

/// Resolves requested files against a read-only index.
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    index: &'a Index,
    matching: MatchPolicy,
    expansion: Expansion,
    hint: Option<&'a dyn SortHint>,
}

impl<'a> Resolver<'a> {
    pub fn new(index: &'a Index) -> Self {
        Self {
            index,
            matching: MatchPolicy::default(),
            expansion: Expansion::default(),
            hint: None,
        }
    }

    pub fn matching(mut self, policy: MatchPolicy) -> Self {
        self.matching = policy;
        self
    }

    pub fn expansion(mut self, expansion: Expansion) -> Self {
        self.expansion = expansion;
        self
    }

    pub fn sort_hint(mut self, hint: Option<&'a dyn SortHint>) -> Self {
        self.hint = hint;
        self
    }

    /// Resolve the requested files. Never fails; unknown files pass through.
    pub fn resolve<S: AsRef<str>>(&self, requested: &[S]) -> Resolution {
        let mut files: Vec<String> = Vec::with_capacity(requested.len());
        let mut seen_files: FxHashSet<String> = FxHashSet::default();
        for file in requested {
            let file = file.as_ref();
            if seen_files.insert(file.to_string()) {
                files.push(file.to_string());
            }
        }

        let seeds = self.match_keys(&files);
        let closure = self.expand(&seeds);

        let mut offsets = ResolvedOffsets::default();
        for &(_, entry) in &closure {
            let location = self.choose(entry);
            let path = self.output_path(&files, &location.path);
            offsets.insert(path, location.offset);
        }

        for path in offsets.paths() {
            if seen_files.insert(path.clone()) {
                files.push(path.clone());
            }
        }

        if let Some(hint) = self.hint {
            sort_paths(hint, &mut files);
        }

        Resolution {
            files,
            offsets,
            keys: closure.into_iter().map(|(key, _)| key.to_string()).collect(),
        }
    }

    /// Keys with a location in one of the requested files, in request order.
    fn match_keys(&self, files: &[String]) -> Vec<&'a str> {
        let mut keys = Vec::new();
        let mut seen = FxHashSet::default();

        match self.matching {
            MatchPolicy::BaseName => {
                let mut by_name: FxHashMap<&str, Vec<&'a str>> = FxHashMap::default();
                for (key, entry) in self.index {
                    for location in entry.locations() {
                        let names = by_name.entry(file_name(&location.path)).or_default();
                        if names.last() != Some(&key.as_str()) {
                            names.push(key.as_str());
                        }
                    }
                }
                for file in files {
                    for &key in by_name.get(file_name(file)).into_iter().flatten() {
                        if seen.insert(key) {
                            keys.push(key);
                        }
                    }
                }
            }
            MatchPolicy::Containment => {
                for file in files {
                    for (key, entry) in self.index {
                        let hit = entry
                            .locations()
                            .iter()
                            .any(|l| l.path.contains(file.as_str()));
                        if hit && seen.insert(key.as_str()) {
                            keys.push(key.as_str());
                        }
                    }
                }
            }
        }

        keys
    }

    /// Transitive closure over dependency edges. Keys missing from the index
    /// are skipped; the visited set makes cycles terminate.
    fn expand(&self, seeds: &[&'a str]) -> Vec<(&'a str, &'a IndexEntry)> {
        let mut visited: FxHashSet<&str> = FxHashSet::default();
        let mut closure = Vec::new();

        let mut visit = |key: &'a str, closure: &mut Vec<(&'a str, &'a IndexEntry)>| {
            if !visited.insert(key) {
                return None;
            }
            let (key, entry) = self.index.get_key_value(key)?;
            closure.push((key.as_str(), entry));
            Some(entry)
        };

        match self.expansion {
            Expansion::DepthFirst => {
                let mut stack: Vec<&'a str> = seeds.iter().rev().copied().collect();
                while let Some(key) = stack.pop() {
                    if let Some(entry) = visit(key, &mut closure) {
                        stack.extend(entry.dependencies().iter().rev().map(String::as_str));
                    }
                }
            }
            Expansion::BreadthFirst => {
                let mut queue: VecDeque<&'a str> = seeds.iter().copied().collect();
                while let Some(key) = queue.pop_front() {
                    if let Some(entry) = visit(key, &mut closure) {
                        queue.extend(entry.dependencies().iter().map(String::as_str));
                    }
                }
            }
        }

        closure
    }

    /// The location to read for an entry: lowest hint rank, else first.
    fn choose(&self, entry: &'a IndexEntry) -> &'a Location {
        let locations = entry.locations();
        match (self.hint, locations) {
            (Some(hint), [_, _, ..]) => locations
                .iter()
                .min_by_key(|l| rank_path(hint, &l.path).unwrap_or(usize::MAX))
                .unwrap_or(&locations[0]),
            _ => &locations[0],
        }
    }

    /// Report offsets under the caller's spelling of a requested file.
    ///
    /// Under containment a stored path only maps back to a request it ends
    /// with at a separator; over-matched files keep their own path.
    fn output_path<'p>(&self, files: &'p [String], path: &'p str) -> &'p str {
        let requested = match self.matching {
            MatchPolicy::BaseName => {
                let name = file_name(path);
                files.iter().find(|f| file_name(f) == name)
            }
            MatchPolicy::Containment => files.iter().find(|f| ends_with_component(path, f)),
        };
        requested.map_or(path, String::as_str)
    }
}

/// `path` equals `suffix` or ends with it right after a path separator.
fn ends_with_component(path: &str, suffix: &str) -> bool {
    match path.strip_suffix(suffix) {
        Some("") => true,
        Some(head) => !suffix.is_empty() && head.ends_with(['/', '\\']),
        None => false,
    }
}
