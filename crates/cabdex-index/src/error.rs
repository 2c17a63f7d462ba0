//! Error types for the index crate.

use thiserror::Error;

/// Errors raised while building, saving or loading an index.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error.
    #[error("{0}")]
    Common(#[from] cabdex_common::Error),

    /// Container could not be decoded.
    #[error("container: {0}")]
    Container(#[from] cabdex_container::Error),

    /// Sub-file could not be probed.
    #[error("serialized file: {0}")]
    Serialized(#[from] cabdex_serialized::Error),

    /// Cache file has bytes after the last entry.
    #[error("cache has {0} trailing bytes")]
    TrailingBytes(usize),

    /// Cache file lists the same key twice.
    #[error("duplicate key in cache: {0}")]
    DuplicateKey(String),

    /// Cache file holds a negative offset.
    #[error("negative offset {offset} for {key}")]
    NegativeOffset { key: String, offset: i64 },

    /// An entry cannot be written with a single-location layout.
    #[error("entry {key} has {locations} locations, layout stores exactly one")]
    LayoutMismatch { key: String, locations: usize },
}

/// Result type for index operations.
pub type Result<T> = std::result::Result<T, Error>;
