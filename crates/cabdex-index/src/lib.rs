//! Dependency index and offset resolution for cabdex.
//!
//! Container files hold many small serialized files that depend on each
//! other by name. This crate scans containers once, records where every named
//! unit lives and what it depends on, and answers "which files and byte
//! offsets must be read to load these files":
//!
//! - [`IndexBuilder`] - scan containers into an [`Index`]
//! - [`cache`] - binary cache of an index
//! - [`Resolver`] - dependency closure and offset grouping
//! - [`IndexSession`] - one index family with build, load, save and resolve
//!
//! # Example
//!
//! ```no_run
//! use cabdex_index::{IndexConfig, IndexSession};
//!
//! let mut session = IndexSession::new(IndexConfig::blk());
//! if !session.load() {
//!     session.build(&["blocks/00/31.blk", "blocks/00/32.blk"]);
//! }
//!
//! let resolution = session.resolve(&["31.blk"]);
//! for (file, offsets) in resolution.offsets.iter() {
//!     println!("{file}: {offsets:?}");
//! }
//! ```
//!
//! # Features
//!
//! - `parallel` - decode containers concurrently with rayon
//! - `serde` - `Serialize` for [`Resolution`], [`Location`] and [`IndexEntry`]

mod builder;
pub mod cache;
mod config;
mod error;
mod hint;
mod index;
mod resolve;
mod session;

pub use builder::{
    BuildOptions, BuildProgress, BuildReport, Decoders, FileScan, IndexBuilder, Record,
};
pub use cache::CacheLayout;
pub use config::{ContainerKind, IndexConfig, KeySource};
pub use error::{Error, Result};
pub use hint::{file_id, rank_path, sort_paths, BlockSortList, SortHint};
pub use index::{DuplicatePolicy, Index, IndexEntry, Location, Observation};
pub use resolve::{Expansion, MatchPolicy, Resolution, ResolvedOffsets, Resolver};
pub use session::IndexSession;
