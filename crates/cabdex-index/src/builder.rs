//! Index construction from container files.
//!
//! Each container is decoded into segments, every embedded sub-file is
//! probed, and the resulting records are applied to the index under the
//! configured duplicate policy. Failures are isolated: a bad container skips
//! that file, a bad sub-file skips that sub-file.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cabdex_container::{
    Aes128Gate, BlkContainer, BlockCipher, FramedSegments, PlainBundle, Segment, SegmentDecoder,
};
use cabdex_serialized::{AssetProbe, ProbeResult, SerializedProbe};
use memmap2::Mmap;
use tracing::{debug, info, warn};

use crate::config::{ContainerKind, IndexConfig, KeySource};
use crate::{Index, Location, Observation, Result};

/// Collaborators used to decode containers and probe sub-files.
#[derive(Clone)]
pub struct Decoders {
    pub cipher: Arc<dyn BlockCipher>,
    pub segments: Arc<dyn SegmentDecoder>,
    pub probe: Arc<dyn AssetProbe>,
}

impl Default for Decoders {
    fn default() -> Self {
        Self {
            cipher: Arc::new(Aes128Gate),
            segments: Arc::new(FramedSegments),
            probe: Arc::new(SerializedProbe),
        }
    }
}

impl std::fmt::Debug for Decoders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoders").finish_non_exhaustive()
    }
}

/// Per-build options.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Known segment offsets per encrypted container. Containers without an
    /// entry are scanned sequentially.
    pub segment_offsets: HashMap<PathBuf, Vec<u64>>,
}

/// Progress of a build, reported once per container file.
#[derive(Debug, Clone, Copy)]
pub struct BuildProgress<'a> {
    /// Files handled so far, including this one.
    pub current: usize,
    pub total: usize,
    pub path: &'a Path,
}

/// Summary of a finished build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub index_len: usize,
    pub files_processed: usize,
    pub files_failed: usize,
    /// Segments that could not be decoded inside otherwise readable files.
    pub segment_failures: usize,
    /// Sub-files the probe rejected.
    pub probe_failures: usize,
    /// Observations dropped under [`DuplicatePolicy::KeepFirst`](crate::DuplicatePolicy::KeepFirst).
    pub collisions: usize,
    /// Whether the cache was written. Set by the session.
    pub saved: bool,
}

/// One indexable record found in a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: String,
    pub location: Location,
    pub dependencies: Vec<String>,
}

/// Records found in one container file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileScan {
    pub records: Vec<Record>,
    pub segment_failures: usize,
    pub probe_failures: usize,
}

/// Builds an index for one family.
#[derive(Debug, Clone, Copy)]
pub struct IndexBuilder<'a> {
    config: &'a IndexConfig,
    decoders: &'a Decoders,
    options: Option<&'a BuildOptions>,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(config: &'a IndexConfig, decoders: &'a Decoders) -> Self {
        Self {
            config,
            decoders,
            options: None,
        }
    }

    pub fn options(mut self, options: &'a BuildOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Build an index from `files`, in list order.
    ///
    /// `progress` is called once per file after its records are applied.
    /// The returned index holds everything that could be read, even if some
    /// files failed.
    pub fn build<P, F>(&self, files: &[P], mut progress: F) -> (Index, BuildReport)
    where
        P: AsRef<Path> + Sync,
        F: FnMut(BuildProgress<'_>),
    {
        let total = files.len();
        let mut index = Index::new();
        let mut report = BuildReport::default();

        // Decoding may run concurrently; records are always applied in file
        // order so duplicate handling matches a sequential build.
        #[cfg(feature = "parallel")]
        let scans: Vec<Result<FileScan>> = {
            use rayon::prelude::*;
            files
                .par_iter()
                .map(|file| self.scan_file(file.as_ref()))
                .collect()
        };
        #[cfg(not(feature = "parallel"))]
        let scans = files.iter().map(|file| self.scan_file(file.as_ref()));

        for (i, (file, scan)) in files.iter().zip(scans).enumerate() {
            let path = file.as_ref();

            match scan {
                Ok(scan) => {
                    report.files_processed += 1;
                    report.segment_failures += scan.segment_failures;
                    report.probe_failures += scan.probe_failures;
                    self.apply(&mut index, scan.records, &mut report);
                }
                Err(e) => {
                    report.files_failed += 1;
                    warn!("Failed to index {}: {}", path.display(), e);
                }
            }

            info!("[{}/{}] Processed {}", i + 1, total, path.display());
            progress(BuildProgress {
                current: i + 1,
                total,
                path,
            });
        }

        if report.collisions > 0 {
            warn!(
                "{} key collisions, first observation kept",
                report.collisions
            );
        }

        report.index_len = index.len();
        (index, report)
    }

    fn apply(&self, index: &mut Index, records: Vec<Record>, report: &mut BuildReport) {
        for record in records {
            let path = record.location.path.clone();
            match index.observe(
                &record.key,
                record.location,
                record.dependencies,
                self.config.policy,
            ) {
                Observation::Collision => report.collisions += 1,
                Observation::SamePath => {
                    warn!("{} appears more than once in {}, first offset kept", record.key, path)
                }
                Observation::Inserted | Observation::Merged | Observation::Replaced => {}
            }
        }
    }

    /// Decode and probe one container file.
    pub fn scan_file(&self, path: &Path) -> Result<FileScan> {
        let file = File::open(path)?;
        // SAFETY: the map is read-only and dropped before this call returns.
        let mmap = unsafe { Mmap::map(&file)? };
        self.scan_bytes(path, &mmap)
    }

    /// Decode and probe a container held in memory. `path` becomes the
    /// location path of every record.
    pub fn scan_bytes(&self, path: &Path, data: &[u8]) -> Result<FileScan> {
        let location_path = path.to_string_lossy();
        let mut scan = FileScan::default();

        match self.config.container {
            ContainerKind::Encrypted => {
                let container = BlkContainer::parse(data, self.decoders.cipher.as_ref())?;
                let offsets = self
                    .options
                    .and_then(|o| o.segment_offsets.get(path))
                    .map(Vec::as_slice);

                let segments = container.segments(self.decoders.segments.as_ref(), offsets);
                for failure in &segments.failures {
                    warn!(
                        "Failed to load a segment at {:#x} in {}: {}",
                        failure.offset,
                        path.display(),
                        failure.error
                    );
                }
                scan.segment_failures = segments.failures.len();

                for (offset, segment) in &segments.segments {
                    self.probe_segment(&location_path, *offset, segment, &mut scan);
                }
            }
            ContainerKind::Plain => {
                let bundle = PlainBundle::parse(data, self.decoders.segments.as_ref())?;
                let segment = bundle.into_segment();
                self.probe_segment(&location_path, PlainBundle::OFFSET, &segment, &mut scan);
            }
        }

        Ok(scan)
    }

    fn probe_segment(&self, path: &str, offset: u64, segment: &Segment<'_>, scan: &mut FileScan) {
        debug!(path, offset, entries = segment.entries.len(), "probing segment");

        for entry in &segment.entries {
            let result = match self.decoders.probe.probe(entry.path, entry.data) {
                Ok(result) => result,
                Err(e) => {
                    warn!("Failed to probe {} in {}: {}", entry.path, path, e);
                    scan.probe_failures += 1;
                    continue;
                }
            };

            let location = || Location::new(path, offset);
            match (self.config.key_source, result) {
                (KeySource::Manifest, ProbeResult::Manifests { manifests, .. }) => {
                    for manifest in manifests {
                        scan.records.push(Record {
                            key: manifest.name,
                            location: location(),
                            dependencies: manifest.dependencies,
                        });
                    }
                }
                (
                    KeySource::References,
                    ProbeResult::Manifests { reference, .. } | ProbeResult::References(reference),
                ) => {
                    scan.records.push(Record {
                        key: reference.path,
                        location: location(),
                        dependencies: reference.dependencies,
                    });
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DuplicatePolicy;
    use cabdex_container::{BlkBuilder, Passthrough, SegmentBuilder};
    use cabdex_serialized::{AssetBundle, SerializedFileBuilder};

    fn manifest(name: &str, deps: &[&str]) -> Vec<u8> {
        let deps = deps.iter().map(|d| d.to_string()).collect();
        SerializedFileBuilder::new()
            .manifest(1, &AssetBundle::named(name, deps))
            .build()
    }

    fn references(externals: &[&str]) -> Vec<u8> {
        externals
            .iter()
            .fold(SerializedFileBuilder::new(), |b, e| b.external(*e))
            .build()
    }

    fn passthrough() -> Decoders {
        Decoders {
            cipher: Arc::new(Passthrough),
            ..Decoders::default()
        }
    }

    #[test]
    fn test_encrypted_records_use_segment_offsets() {
        let first = SegmentBuilder::new()
            .entry("CAB-a", manifest("ui", &["fonts"]))
            .build();
        let second = SegmentBuilder::new()
            .entry("CAB-b", manifest("fonts", &[]))
            .entry("readme", b"not serialized".to_vec())
            .build();

        let blk = BlkBuilder::new(vec![7; 16], 0).segment(&first).segment(&second);
        let offsets = blk.offsets().to_vec();
        let data = blk.build(&Passthrough).unwrap();

        let config = IndexConfig::blk();
        let decoders = passthrough();
        let scan = IndexBuilder::new(&config, &decoders)
            .scan_bytes(Path::new("31.blk"), &data)
            .unwrap();

        assert_eq!(
            scan.records,
            [
                Record {
                    key: "ui".into(),
                    location: Location::new("31.blk", offsets[0]),
                    dependencies: vec!["fonts".into()],
                },
                Record {
                    key: "fonts".into(),
                    location: Location::new("31.blk", offsets[1]),
                    dependencies: Vec::new(),
                },
            ]
        );
        assert_eq!(scan.segment_failures, 0);
    }

    #[test]
    fn test_key_source_selects_view() {
        let with_manifest = SerializedFileBuilder::new()
            .manifest(1, &AssetBundle::named("bundle", vec!["other".into()]))
            .external("archive:/CAB-x/CAB-x")
            .build();
        let data = SegmentBuilder::new()
            .entry("CAB-m", with_manifest)
            .entry("CAB-r", references(&["archive:/CAB-m/CAB-m"]))
            .build();
        let decoders = Decoders::default();

        let config = IndexConfig::cab();
        let scan = IndexBuilder::new(&config, &decoders)
            .scan_bytes(Path::new("data.bundle"), &data)
            .unwrap();
        assert_eq!(
            scan.records,
            [
                Record {
                    key: "CAB-m".into(),
                    location: Location::new("data.bundle", 0),
                    dependencies: vec!["CAB-x".into()],
                },
                Record {
                    key: "CAB-r".into(),
                    location: Location::new("data.bundle", 0),
                    dependencies: vec!["CAB-m".into()],
                },
            ]
        );

        let config = IndexConfig::blk().with_container(ContainerKind::Plain);
        let scan = IndexBuilder::new(&config, &decoders)
            .scan_bytes(Path::new("data.bundle"), &data)
            .unwrap();
        assert_eq!(
            scan.records,
            [Record {
                key: "bundle".into(),
                location: Location::new("data.bundle", 0),
                dependencies: vec!["other".into()],
            }]
        );
    }

    #[test]
    fn test_probe_failure_is_isolated() {
        let mut broken = manifest("broken", &[]);
        let len = broken.len();
        broken.truncate(len - 4);
        // Keep the declared file size consistent so the header still matches.
        let size = (broken.len() as u32).to_be_bytes();
        broken[4..8].copy_from_slice(&size);

        let data = SegmentBuilder::new()
            .entry("CAB-bad", broken)
            .entry("CAB-good", references(&["CAB-dep"]))
            .build();

        let decoders = Decoders::default();
        let config = IndexConfig::wmv();
        let scan = IndexBuilder::new(&config, &decoders)
            .scan_bytes(Path::new("x.bundle"), &data)
            .unwrap();

        assert_eq!(scan.probe_failures, 1);
        assert_eq!(scan.records.len(), 1);
        assert_eq!(scan.records[0].key, "CAB-good");
    }

    #[test]
    fn test_build_isolates_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.bundle");
        let bad = dir.path().join("bad.bundle");
        let missing = dir.path().join("missing.bundle");

        std::fs::write(
            &good,
            SegmentBuilder::new()
                .entry("CAB-1", references(&["CAB-2"]))
                .build(),
        )
        .unwrap();
        std::fs::write(&bad, b"garbage").unwrap();

        let config = IndexConfig::cab();
        let decoders = Decoders::default();
        let mut seen = Vec::new();
        let (index, report) = IndexBuilder::new(&config, &decoders).build(
            &[bad.clone(), good.clone(), missing],
            |p| seen.push((p.current, p.total)),
        );

        assert_eq!(seen, [(1, 3), (2, 3), (3, 3)]);
        assert_eq!(report.files_processed, 1);
        assert_eq!(report.files_failed, 2);
        assert_eq!(report.index_len, 1);

        let entry = index.get("CAB-1").unwrap();
        assert_eq!(entry.locations()[0].path, good.to_string_lossy());
        assert_eq!(entry.dependencies(), ["CAB-2"]);
    }

    #[test]
    fn test_explicit_offsets_skip_bad_segment() {
        let good = SegmentBuilder::new()
            .entry("CAB-a", manifest("kept", &[]))
            .build();
        let blk = BlkBuilder::new(vec![1; 16], 0)
            .raw(b"junk junk junk")
            .segment(&good);
        let offset = blk.offsets()[0];
        let data = blk.build(&Passthrough).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("5.blk");
        std::fs::write(&path, &data).unwrap();

        let config = IndexConfig::blk();
        let decoders = passthrough();
        let mut options = BuildOptions::default();
        options.segment_offsets.insert(path.clone(), vec![0, offset]);

        let (index, report) = IndexBuilder::new(&config, &decoders)
            .options(&options)
            .build(&[path], |_| {});

        assert_eq!(report.segment_failures, 1);
        assert_eq!(index.get("kept").unwrap().locations()[0].offset, offset);
    }

    #[test]
    fn test_policy_comes_from_config() {
        let config = IndexConfig::cab().with_policy(DuplicatePolicy::KeepFirst);
        let decoders = Decoders::default();
        let builder = IndexBuilder::new(&config, &decoders);

        let record = |path: &str| Record {
            key: "dup".into(),
            location: Location::new(path, 0),
            dependencies: Vec::new(),
        };

        let mut index = Index::new();
        let mut report = BuildReport::default();
        builder.apply(&mut index, vec![record("a"), record("b")], &mut report);

        assert_eq!(report.collisions, 1);
        assert_eq!(index.get("dup").unwrap().locations()[0].path, "a");
    }

    #[test]
    fn test_key_repeated_in_one_container() {
        let config = IndexConfig::blk();
        let decoders = Decoders::default();
        let builder = IndexBuilder::new(&config, &decoders);

        let record = |offset: u64, dep: &str| Record {
            key: "ui".into(),
            location: Location::new("20.blk", offset),
            dependencies: vec![dep.into()],
        };

        let mut index = Index::new();
        let mut report = BuildReport::default();
        builder.apply(&mut index, vec![record(16, "fonts"), record(64, "atlas")], &mut report);

        assert_eq!(report.collisions, 0);
        let entry = index.get("ui").unwrap();
        assert_eq!(entry.locations(), [Location::new("20.blk", 16)]);
        assert_eq!(entry.dependencies(), ["fonts"]);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_build_matches_sequential() {
        let dir = tempfile::tempdir().unwrap();
        let files: Vec<PathBuf> = (0..12)
            .map(|i| {
                let path = dir.path().join(format!("{i}.bundle"));
                let own = format!("CAB-{i}");
                let external = format!("archive:/{own}/{own}");
                let segment = SegmentBuilder::new()
                    .entry("CAB-shared", references(&[external.as_str()]))
                    .entry(own.as_str(), references(&["archive:/CAB-shared/CAB-shared"]))
                    .build();
                std::fs::write(&path, segment).unwrap();
                path
            })
            .collect();

        let decoders = Decoders::default();
        for policy in [DuplicatePolicy::KeepFirst, DuplicatePolicy::OverwriteLast] {
            let config = IndexConfig::cab().with_policy(policy);
            let builder = IndexBuilder::new(&config, &decoders);
            let (parallel, parallel_report) = builder.build(&files, |_| {});

            let mut sequential = Index::new();
            let mut report = BuildReport::default();
            for file in &files {
                let scan = builder.scan_file(file).unwrap();
                builder.apply(&mut sequential, scan.records, &mut report);
            }

            assert_eq!(parallel, sequential);
            assert_eq!(parallel_report.collisions, report.collisions);
        }
    }
}
