//! Error types for serialized file parsing.

use thiserror::Error;

/// Errors that can occur while reading a serialized file.
#[derive(Debug, Error)]
pub enum Error {
    /// Common library error.
    #[error("{0}")]
    Common(#[from] cabdex_common::Error),

    /// The stream does not pass the serialized-file header check.
    #[error("not a serialized file")]
    NotSerialized,

    /// An object's data range lies outside the file.
    #[error("object {path_id} data out of range: {start}..{end} in {len} bytes")]
    ObjectOutOfRange {
        path_id: i64,
        start: u64,
        end: u64,
        len: usize,
    },
}

/// Result type for serialized file operations.
pub type Result<T> = std::result::Result<T, Error>;
