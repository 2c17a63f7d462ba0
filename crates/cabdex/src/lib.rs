//! cabdex - dependency index and offset resolution for engine asset
//! containers.
//!
//! This crate provides a single entry point to the cabdex crates.
//!
//! # Crates
//!
//! - [`cabdex_common`] - binary reading and writing primitives
//! - [`cabdex_container`] - encrypted `blk` containers, plain bundles, segments
//! - [`cabdex_serialized`] - serialized file probe and bundle manifests
//! - [`cabdex_index`] - index builder, binary cache and resolver
//!
//! # Example
//!
//! ```no_run
//! use cabdex::prelude::*;
//!
//! let mut session = IndexSession::new(IndexConfig::blk());
//! if !session.load() {
//!     let report = session.build(&["blocks/00/31.blk"]);
//!     println!("{} entries", report.index_len);
//! }
//!
//! let resolution = session.resolve(&["31.blk"]);
//! println!("{:?}", resolution.files);
//! ```

pub use cabdex_common as common;
pub use cabdex_container as container;
pub use cabdex_index as index;
pub use cabdex_serialized as serialized;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use cabdex_common::BinaryReader;
    pub use cabdex_container::{
        Aes128Gate, BlkContainer, BlockCipher, FramedSegments, PlainBundle, SegmentDecoder,
    };
    pub use cabdex_index::{
        BlockSortList, BuildOptions, BuildReport, CacheLayout, ContainerKind, Decoders,
        DuplicatePolicy, Expansion, Index, IndexConfig, IndexSession, KeySource, MatchPolicy,
        Resolution, SortHint,
    };
    pub use cabdex_serialized::{AssetProbe, ProbeResult, SerializedFile, SerializedProbe};
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
