//! Segment framing: a named list of embedded sub-files.
//!
//! Both container families store their sub-files in segments. Layout:
//!
//! ```text
//! magic   "seg0"
//! count   u32
//! entry:  path (NUL-terminated) | size u32 | data[size]
//! ```
//!
//! The real engine bundle format can be plugged in through [`SegmentDecoder`].

use std::io::Write;

use cabdex_common::BinaryReader;

use crate::Result;

/// An embedded sub-file borrowed from its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubEntry<'a> {
    /// Path of the sub-file inside the segment.
    pub path: &'a str,
    /// Raw sub-file bytes.
    pub data: &'a [u8],
}

/// One decoded segment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segment<'a> {
    pub entries: Vec<SubEntry<'a>>,
}

/// Decodes one segment starting at the reader's position.
///
/// On success the reader must be left just past the segment so sequential
/// scans can continue from there.
pub trait SegmentDecoder: Send + Sync {
    fn decode<'a>(&self, reader: &mut BinaryReader<'a>) -> Result<Segment<'a>>;
}

/// Decoder for the `seg0` framing.
#[derive(Debug, Clone, Copy, Default)]
pub struct FramedSegments;

impl FramedSegments {
    /// Segment magic bytes.
    pub const MAGIC: &'static [u8; 4] = b"seg0";

    /// Check whether data starts with the segment magic.
    pub fn is_segment(data: &[u8]) -> bool {
        data.starts_with(Self::MAGIC)
    }
}

impl SegmentDecoder for FramedSegments {
    fn decode<'a>(&self, reader: &mut BinaryReader<'a>) -> Result<Segment<'a>> {
        reader.expect_magic(Self::MAGIC)?;
        let count = reader.read_u32()? as usize;

        // Each entry needs at least a NUL and a size field.
        let mut entries = Vec::with_capacity(count.min(reader.remaining() / 5));
        for _ in 0..count {
            let path = reader.read_cstring()?;
            let size = reader.read_u32()? as usize;
            let data = reader.read_bytes(size)?;
            entries.push(SubEntry { path, data });
        }

        Ok(Segment { entries })
    }
}

/// Builder for `seg0` segments.
///
/// # Example
///
/// ```
/// use cabdex_container::{BinaryReader, FramedSegments, SegmentBuilder, SegmentDecoder};
///
/// let bytes = SegmentBuilder::new()
///     .entry("CAB-0001", b"payload".to_vec())
///     .build();
///
/// let segment = FramedSegments.decode(&mut BinaryReader::new(&bytes)).unwrap();
/// assert_eq!(segment.entries[0].path, "CAB-0001");
/// ```
#[derive(Debug, Clone, Default)]
pub struct SegmentBuilder {
    entries: Vec<(String, Vec<u8>)>,
}

impl SegmentBuilder {
    /// Create an empty segment builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sub-file.
    pub fn entry(mut self, path: impl Into<String>, data: Vec<u8>) -> Self {
        self.entries.push((path.into(), data));
        self
    }

    /// Write the segment to a stream.
    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        out.write_all(FramedSegments::MAGIC)?;
        out.write_all(&(self.entries.len() as u32).to_le_bytes())?;
        for (path, data) in &self.entries {
            out.write_all(path.as_bytes())?;
            out.write_all(&[0])?;
            out.write_all(&(data.len() as u32).to_le_bytes())?;
            out.write_all(data)?;
        }
        Ok(())
    }

    /// Serialize the segment to bytes.
    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_to(&mut out);
        out
    }
}
