//! Common utilities for cabdex.
//!
//! This crate provides the binary primitives shared by every cabdex crate:
//!
//! - [`BinaryReader`] - Zero-copy reading from byte slices, either endianness
//! - [`WriteExt`] - Length-prefixed string writing for cache files
//! - [`Endian`] - Byte order selector used by the reader

mod error;
mod reader;
mod writer;

pub use error::{Error, Result};
pub use reader::{BinaryReader, Endian};
pub use writer::WriteExt;

/// Re-export zerocopy traits for convenience
pub use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Return the last component of a `/` or `\` separated path.
///
/// Container paths are stored as strings so this works on paths recorded on
/// any platform.
pub fn file_name(path: &str) -> &str {
    path.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(path)
}
