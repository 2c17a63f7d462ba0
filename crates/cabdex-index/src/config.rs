//! Index family configuration.

use std::path::{Path, PathBuf};

use crate::{CacheLayout, DuplicatePolicy, Expansion, MatchPolicy};

/// How container files are framed on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// `blk` container: encrypted payload holding segments back to back.
    Encrypted,
    /// Plain bundle: one segment at the start of the file.
    Plain,
}

/// Which probe results become index entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// Bundle manifests, keyed by bundle name.
    Manifest,
    /// External reference tables, keyed by sub-file path.
    References,
}

/// Parameters of one index family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    pub container: ContainerKind,
    pub key_source: KeySource,
    pub policy: DuplicatePolicy,
    pub layout: CacheLayout,
    pub cache_path: PathBuf,
    pub matching: MatchPolicy,
    pub expansion: Expansion,
}

impl IndexConfig {
    /// Encrypted containers indexed by bundle manifest.
    pub fn blk() -> Self {
        Self {
            container: ContainerKind::Encrypted,
            key_source: KeySource::Manifest,
            policy: DuplicatePolicy::MergeLocations,
            layout: CacheLayout::MultiLocation,
            cache_path: PathBuf::from("BLKMap.bin"),
            matching: MatchPolicy::BaseName,
            expansion: Expansion::DepthFirst,
        }
    }

    /// Plain bundles indexed by sub-file path; the newest observation wins.
    pub fn cab() -> Self {
        Self {
            container: ContainerKind::Plain,
            key_source: KeySource::References,
            policy: DuplicatePolicy::OverwriteLast,
            layout: CacheLayout::SingleLocation,
            cache_path: PathBuf::from("CABMap.bin"),
            ..Self::blk()
        }
    }

    /// Plain bundles indexed by sub-file path; the first observation wins.
    pub fn wmv() -> Self {
        Self {
            policy: DuplicatePolicy::KeepFirst,
            cache_path: PathBuf::from("WMVMap.bin"),
            ..Self::cab()
        }
    }

    pub fn with_container(mut self, container: ContainerKind) -> Self {
        self.container = container;
        self
    }

    pub fn with_key_source(mut self, key_source: KeySource) -> Self {
        self.key_source = key_source;
        self
    }

    pub fn with_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_layout(mut self, layout: CacheLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = path.into();
        self
    }

    pub fn with_matching(mut self, matching: MatchPolicy) -> Self {
        self.matching = matching;
        self
    }

    pub fn with_expansion(mut self, expansion: Expansion) -> Self {
        self.expansion = expansion;
        self
    }

    /// Display name of the index, taken from the cache file stem.
    pub fn name(&self) -> &str {
        self.cache_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("index")
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self::blk()
    }
}
