//! Index model and duplicate-key policies.

use std::collections::btree_map::{self, BTreeMap};

/// Where an indexed unit lives: a container file and a byte offset in it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Location {
    pub path: String,
    pub offset: u64,
}

impl Location {
    pub fn new(path: impl Into<String>, offset: u64) -> Self {
        Self {
            path: path.into(),
            offset,
        }
    }
}

/// Locations and dependency names of one indexed unit.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct IndexEntry {
    locations: Vec<Location>,
    dependencies: Vec<String>,
}

impl IndexEntry {
    /// Create an entry with its first location.
    pub fn new(location: Location, dependencies: Vec<String>) -> Self {
        Self {
            locations: vec![location],
            dependencies,
        }
    }

    /// Create an entry from stored parts.
    pub fn from_parts(locations: Vec<Location>, dependencies: Vec<String>) -> Self {
        Self {
            locations,
            dependencies,
        }
    }

    /// Locations in insertion order.
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    /// Dependency keys in declaration order.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Whether a location in `path` is already recorded.
    pub fn has_path(&self, path: &str) -> bool {
        self.locations.iter().any(|l| l.path == path)
    }
}

/// What to do when a key is observed a second time during a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Add the new location; dependencies of the first observation stay.
    MergeLocations,
    /// Replace location and dependencies with the newest observation.
    OverwriteLast,
    /// Ignore the new observation and count it as a collision.
    KeepFirst,
}

impl DuplicatePolicy {
    /// Whether entries built with this policy hold exactly one location.
    pub const fn is_single_location(self) -> bool {
        !matches!(self, Self::MergeLocations)
    }
}

/// Outcome of recording one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// The key was new.
    Inserted,
    /// A location was appended to an existing key.
    Merged,
    /// The existing key already had a location in this container.
    SamePath,
    /// The existing entry was replaced.
    Replaced,
    /// The observation was dropped as a collision.
    Collision,
}

/// Mapping from key to entry, iterated in ascending key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Index {
    entries: BTreeMap<String, IndexEntry>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&IndexEntry> {
        self.entries.get(key)
    }

    pub fn get_key_value(&self, key: &str) -> Option<(&String, &IndexEntry)> {
        self.entries.get_key_value(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Entries in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, IndexEntry> {
        self.entries.iter()
    }

    /// Insert an entry, failing if the key exists. Returns the rejected entry.
    pub fn try_insert(&mut self, key: String, entry: IndexEntry) -> Result<(), (String, IndexEntry)> {
        match self.entries.entry(key) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(entry);
                Ok(())
            }
            btree_map::Entry::Occupied(slot) => Err((slot.key().clone(), entry)),
        }
    }

    /// Record an observation of `key` at `location` under `policy`.
    pub fn observe(
        &mut self,
        key: &str,
        location: Location,
        dependencies: Vec<String>,
        policy: DuplicatePolicy,
    ) -> Observation {
        let Some(existing) = self.entries.get_mut(key) else {
            self.entries
                .insert(key.to_string(), IndexEntry::new(location, dependencies));
            return Observation::Inserted;
        };

        match policy {
            DuplicatePolicy::MergeLocations => {
                if existing.has_path(&location.path) {
                    Observation::SamePath
                } else {
                    existing.locations.push(location);
                    Observation::Merged
                }
            }
            DuplicatePolicy::OverwriteLast => {
                *existing = IndexEntry::new(location, dependencies);
                Observation::Replaced
            }
            DuplicatePolicy::KeepFirst => Observation::Collision,
        }
    }
}

impl<'a> IntoIterator for &'a Index {
    type Item = (&'a String, &'a IndexEntry);
    type IntoIter = btree_map::Iter<'a, String, IndexEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<(String, IndexEntry)> for Index {
    fn from_iter<I: IntoIterator<Item = (String, IndexEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_merge_locations_keeps_first_dependencies() {
        let mut index = Index::new();
        let policy = DuplicatePolicy::MergeLocations;

        assert_eq!(
            index.observe("ui", Location::new("1.blk", 0), deps(&["fonts"]), policy),
            Observation::Inserted
        );
        assert_eq!(
            index.observe("ui", Location::new("2.blk", 64), deps(&["other"]), policy),
            Observation::Merged
        );
        assert_eq!(
            index.observe("ui", Location::new("1.blk", 512), deps(&[]), policy),
            Observation::SamePath
        );

        let entry = index.get("ui").unwrap();
        assert_eq!(
            entry.locations(),
            [Location::new("1.blk", 0), Location::new("2.blk", 64)]
        );
        assert_eq!(entry.dependencies(), ["fonts"]);
    }

    #[test]
    fn test_overwrite_last() {
        let mut index = Index::new();
        let policy = DuplicatePolicy::OverwriteLast;

        index.observe("CAB-1", Location::new("a.bundle", 0), deps(&["CAB-2"]), policy);
        assert_eq!(
            index.observe("CAB-1", Location::new("b.bundle", 0), deps(&["CAB-3"]), policy),
            Observation::Replaced
        );

        let entry = index.get("CAB-1").unwrap();
        assert_eq!(entry.locations(), [Location::new("b.bundle", 0)]);
        assert_eq!(entry.dependencies(), ["CAB-3"]);
    }

    #[test]
    fn test_keep_first_counts_collision() {
        let mut index = Index::new();
        let policy = DuplicatePolicy::KeepFirst;

        index.observe("dup", Location::new("a.bundle", 0), deps(&[]), policy);
        assert_eq!(
            index.observe("dup", Location::new("b.bundle", 0), deps(&["x"]), policy),
            Observation::Collision
        );

        let entry = index.get("dup").unwrap();
        assert_eq!(entry.locations(), [Location::new("a.bundle", 0)]);
        assert!(entry.dependencies().is_empty());
    }

    #[test]
    fn test_keys_are_sorted_and_case_sensitive() {
        let mut index = Index::new();
        for key in ["b", "B", "a"] {
            index.observe(key, Location::new("f", 0), Vec::new(), DuplicatePolicy::KeepFirst);
        }

        let keys: Vec<&str> = index.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["B", "a", "b"]);
    }

    #[test]
    fn test_try_insert_rejects_duplicate() {
        let mut index = Index::new();
        let entry = IndexEntry::new(Location::new("f", 1), Vec::new());

        assert!(index.try_insert("k".into(), entry.clone()).is_ok());
        let (key, _) = index.try_insert("k".into(), entry).unwrap_err();
        assert_eq!(key, "k");
    }
}
