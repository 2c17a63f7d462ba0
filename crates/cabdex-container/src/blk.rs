//! Encrypted block container (`.blk`).
//!
//! Layout:
//!
//! ```text
//! magic       "blk\0"
//! key_len     i32
//! key         key_len bytes
//! discard     key_len bytes
//! block_size  u16
//! payload     encrypted until end of file
//! ```
//!
//! The decrypted payload holds segments, either back to back or at offsets
//! known to the caller.

use std::collections::BTreeMap;

use cabdex_common::BinaryReader;
use tracing::debug;

use crate::crypto::BlockCipher;
use crate::segment::{Segment, SegmentDecoder};
use crate::{Error, Result};

/// A decrypted block container.
pub struct BlkContainer {
    key: Vec<u8>,
    block_size: u16,
    payload: Vec<u8>,
}

/// Segments decoded from a container payload, keyed by payload offset.
#[derive(Debug, Default)]
pub struct SegmentScan<'a> {
    pub segments: BTreeMap<u64, Segment<'a>>,
    pub failures: Vec<SegmentFailure>,
}

/// A segment that could not be decoded.
#[derive(Debug)]
pub struct SegmentFailure {
    pub offset: u64,
    pub error: Error,
}

impl BlkContainer {
    /// Container magic bytes.
    pub const MAGIC: &'static [u8; 4] = b"blk\0";

    /// Check whether data starts with the container magic.
    pub fn is_blk(data: &[u8]) -> bool {
        data.starts_with(Self::MAGIC)
    }

    /// Parse the header and decrypt the payload.
    pub fn parse(data: &[u8], cipher: &dyn BlockCipher) -> Result<Self> {
        if !Self::is_blk(data) {
            return Err(Error::InvalidMagic {
                expected: Self::MAGIC,
                actual: data[..Self::MAGIC.len().min(data.len())].to_vec(),
            });
        }

        let mut reader = BinaryReader::new_at(data, Self::MAGIC.len());
        let key_len = reader.read_i32()?;
        let len = usize::try_from(key_len)
            .ok()
            .filter(|len| len.saturating_mul(2) <= reader.remaining())
            .ok_or(Error::InvalidKeyLength(key_len))?;

        let key = reader.read_bytes(len)?.to_vec();
        reader.advance(len); // discard array
        let block_size = reader.read_u16()?;

        let mut payload = reader.remaining_bytes().to_vec();
        cipher.decrypt(&key, &mut payload, block_size)?;

        debug!(
            key_len = len,
            block_size,
            payload = payload.len(),
            "decrypted block container"
        );

        Ok(Self {
            key,
            block_size,
            payload,
        })
    }

    /// Container key as stored in the header.
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Cipher block size from the header.
    pub fn block_size(&self) -> u16 {
        self.block_size
    }

    /// Decrypted payload.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Decode the segments in the payload.
    ///
    /// With explicit `offsets` each segment is decoded independently and a
    /// failure only loses that segment. Without offsets segments are read
    /// back to back until the end of the payload; the first failure ends the
    /// scan because the position of the next segment is unknown.
    pub fn segments<'a>(
        &'a self,
        decoder: &dyn SegmentDecoder,
        offsets: Option<&[u64]>,
    ) -> SegmentScan<'a> {
        match offsets {
            Some(offsets) if !offsets.is_empty() => self.scan_at(decoder, offsets),
            _ => self.scan_sequential(decoder),
        }
    }

    fn scan_at<'a>(&'a self, decoder: &dyn SegmentDecoder, offsets: &[u64]) -> SegmentScan<'a> {
        let mut scan = SegmentScan::default();

        for &offset in offsets {
            match self.decode_at(decoder, offset) {
                Ok(segment) => {
                    scan.segments.insert(offset, segment);
                }
                Err(error) => scan.failures.push(SegmentFailure { offset, error }),
            }
        }

        scan
    }

    fn decode_at<'a>(&'a self, decoder: &dyn SegmentDecoder, offset: u64) -> Result<Segment<'a>> {
        let start = usize::try_from(offset)
            .ok()
            .filter(|&start| start < self.payload.len())
            .ok_or(Error::OffsetOutOfRange {
                offset,
                len: self.payload.len(),
            })?;

        let mut reader = BinaryReader::new_at(&self.payload, start);
        decoder.decode(&mut reader)
    }

    fn scan_sequential<'a>(&'a self, decoder: &dyn SegmentDecoder) -> SegmentScan<'a> {
        let mut scan = SegmentScan::default();
        let mut reader = BinaryReader::new(&self.payload);

        while !reader.is_empty() {
            let start = reader.position();
            let offset = start as u64;

            let result = decoder.decode(&mut reader).and_then(|segment| {
                if reader.position() <= start {
                    Err(Error::EmptySegment(offset))
                } else {
                    Ok(segment)
                }
            });

            match result {
                Ok(segment) => {
                    scan.segments.insert(offset, segment);
                }
                Err(error) => {
                    scan.failures.push(SegmentFailure { offset, error });
                    break;
                }
            }
        }

        scan
    }
}

impl std::fmt::Debug for BlkContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlkContainer")
            .field("key_len", &self.key.len())
            .field("block_size", &self.block_size)
            .field("payload", &self.payload.len())
            .finish()
    }
}

/// Builder for encrypted block containers.
///
/// Segments are appended back to back; [`segment`](Self::segment) returns
/// the builder and records the payload offset of the added segment in
/// [`offsets`](Self::offsets).
#[derive(Debug, Clone)]
pub struct BlkBuilder {
    key: Vec<u8>,
    block_size: u16,
    payload: Vec<u8>,
    offsets: Vec<u64>,
}

impl BlkBuilder {
    /// Create a builder with the given key and cipher block size.
    pub fn new(key: impl Into<Vec<u8>>, block_size: u16) -> Self {
        Self {
            key: key.into(),
            block_size,
            payload: Vec::new(),
            offsets: Vec::new(),
        }
    }

    /// Append raw bytes to the payload (padding, garbage, etc.).
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.payload.extend_from_slice(bytes);
        self
    }

    /// Append an encoded segment.
    pub fn segment(mut self, bytes: &[u8]) -> Self {
        self.offsets.push(self.payload.len() as u64);
        self.payload.extend_from_slice(bytes);
        self
    }

    /// Payload offsets of the segments added so far.
    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }

    /// Encrypt the payload and produce the container bytes.
    pub fn build(&self, cipher: &dyn BlockCipher) -> Result<Vec<u8>> {
        let key_len =
            i32::try_from(self.key.len()).map_err(|_| Error::InvalidKeyLength(i32::MAX))?;

        let mut payload = self.payload.clone();
        cipher.encrypt(&self.key, &mut payload, self.block_size)?;

        let mut out = Vec::with_capacity(payload.len() + self.key.len() * 2 + 10);
        out.extend_from_slice(BlkContainer::MAGIC);
        out.extend_from_slice(&key_len.to_le_bytes());
        out.extend_from_slice(&self.key);
        out.resize(out.len() + self.key.len(), 0);
        out.extend_from_slice(&self.block_size.to_le_bytes());
        out.extend_from_slice(&payload);
        Ok(out)
    }
}
