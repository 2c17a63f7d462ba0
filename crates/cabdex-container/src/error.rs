//! Error types for the container crate.

use thiserror::Error;

/// Errors that can occur while decoding containers.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error.
    #[error("{0}")]
    Common(#[from] cabdex_common::Error),

    /// The container does not start with the expected magic.
    #[error("invalid container magic: expected {expected:?}, got {actual:?}")]
    InvalidMagic {
        expected: &'static [u8],
        actual: Vec<u8>,
    },

    /// Key length field is negative or larger than the file.
    #[error("invalid key length: {0}")]
    InvalidKeyLength(i32),

    /// Decryption error.
    #[error("decryption error: {0}")]
    Decryption(String),

    /// A segment offset points outside the decrypted payload.
    #[error("segment offset {offset:#x} is past the end of the payload ({len} bytes)")]
    OffsetOutOfRange { offset: u64, len: usize },

    /// A segment decoder consumed no bytes.
    #[error("segment at {0:#x} is empty")]
    EmptySegment(u64),
}

/// Result type for container operations.
pub type Result<T> = std::result::Result<T, Error>;
