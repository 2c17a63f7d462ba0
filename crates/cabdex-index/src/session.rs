//! Index lifecycle: build or load, resolve, save.

use std::path::Path;

use tracing::{info, warn};

use crate::builder::{BuildOptions, BuildProgress, BuildReport, Decoders, IndexBuilder};
use crate::config::IndexConfig;
use crate::hint::SortHint;
use crate::resolve::{Resolution, Resolver};
use crate::{cache, Index};

/// One index family together with its in-memory index.
///
/// Several sessions can coexist; nothing is shared between them. Resolution
/// borrows the session immutably and can run from many threads.
pub struct IndexSession {
    config: IndexConfig,
    decoders: Decoders,
    options: BuildOptions,
    index: Index,
    hint: Option<Box<dyn SortHint>>,
}

impl IndexSession {
    /// Create a session with an empty index.
    pub fn new(config: IndexConfig) -> Self {
        Self {
            config,
            decoders: Decoders::default(),
            options: BuildOptions::default(),
            index: Index::new(),
            hint: None,
        }
    }

    pub fn with_decoders(mut self, decoders: Decoders) -> Self {
        self.decoders = decoders;
        self
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_sort_hint(mut self, hint: impl SortHint + 'static) -> Self {
        self.hint = Some(Box::new(hint));
        self
    }

    pub fn set_sort_hint(&mut self, hint: Option<Box<dyn SortHint>>) {
        self.hint = hint;
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Replace the index by one built from `files`, then write the cache.
    pub fn build<P: AsRef<Path> + Sync>(&mut self, files: &[P]) -> BuildReport {
        self.build_with_progress(files, |_| {})
    }

    /// [`build`](Self::build) with a per-file progress callback.
    pub fn build_with_progress<P, F>(&mut self, files: &[P], progress: F) -> BuildReport
    where
        P: AsRef<Path> + Sync,
        F: FnMut(BuildProgress<'_>),
    {
        info!("Building {} from {} files", self.config.name(), files.len());

        let (index, mut report) = IndexBuilder::new(&self.config, &self.decoders)
            .options(&self.options)
            .build(files, progress);
        self.index = index;

        report.saved = self.save();
        info!(
            "Built {} with {} entries ({} files failed)",
            self.config.name(),
            report.index_len,
            report.files_failed
        );
        report
    }

    /// Load the cache from the configured path.
    ///
    /// On failure the index is left empty and `false` is returned.
    pub fn load(&mut self) -> bool {
        let path = &self.config.cache_path;
        info!("Loading {}", path.display());

        match cache::load(path, self.config.layout) {
            Ok(index) => {
                info!("Loaded {} with {} entries", self.config.name(), index.len());
                self.index = index;
                true
            }
            Err(e) => {
                warn!("{} was not loaded: {}", path.display(), e);
                self.index = Index::new();
                false
            }
        }
    }

    /// Write the index to the configured cache path.
    ///
    /// On failure the in-memory index is kept and `false` is returned.
    pub fn save(&self) -> bool {
        let path = &self.config.cache_path;

        match cache::save(&self.index, path, self.config.layout) {
            Ok(()) => {
                info!("Saved {} to {}", self.config.name(), path.display());
                true
            }
            Err(e) => {
                warn!("{} was not saved: {}", path.display(), e);
                false
            }
        }
    }

    /// Files and offsets to read for `files`.
    pub fn resolve<S: AsRef<str>>(&self, files: &[S]) -> Resolution {
        self.resolver().resolve(files)
    }

    /// A resolver over the current index with the session's settings.
    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.index)
            .matching(self.config.matching)
            .expansion(self.config.expansion)
            .sort_hint(self.hint.as_deref())
    }
}

impl std::fmt::Debug for IndexSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexSession")
            .field("config", &self.config)
            .field("entries", &self.index.len())
            .field("hint", &self.hint.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hint::BlockSortList;

    #[test]
    fn test_failed_load_leaves_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BLKMap.bin");
        std::fs::write(&path, [2, 0, 0, 0, 9]).unwrap();

        let mut session = IndexSession::new(IndexConfig::blk().with_cache_path(&path));
        assert!(!session.load());
        assert!(session.index().is_empty());
    }

    #[test]
    fn test_failed_save_keeps_index() {
        let dir = tempfile::tempdir().unwrap();
        let config = IndexConfig::wmv().with_cache_path(dir.path().join("no/such/dir/WMVMap.bin"));
        let mut session = IndexSession::new(config);

        session.index = [(
            "k".to_string(),
            crate::IndexEntry::new(crate::Location::new("a.bundle", 0), Vec::new()),
        )]
        .into_iter()
        .collect();

        assert!(!session.save());
        assert_eq!(session.index().len(), 1);
    }

    #[test]
    fn test_resolver_uses_session_hint() {
        let mut session = IndexSession::new(IndexConfig::blk()).with_sort_hint(BlockSortList::new(vec![2, 1]));
        session.index = [
            (
                "a".to_string(),
                crate::IndexEntry::new(crate::Location::new("1.blk", 0), vec!["b".into()]),
            ),
            (
                "b".to_string(),
                crate::IndexEntry::new(crate::Location::new("2.blk", 4), Vec::new()),
            ),
        ]
        .into_iter()
        .collect();

        let resolution = session.resolve(&["1.blk"]);
        assert_eq!(resolution.files, ["2.blk", "1.blk"]);
    }
}
