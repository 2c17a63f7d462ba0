//! Plain (unencrypted) bundle files.

use cabdex_common::BinaryReader;

use crate::segment::{Segment, SegmentDecoder, SubEntry};
use crate::Result;

/// A plain bundle: one segment stored at the start of the file.
#[derive(Debug, Clone)]
pub struct PlainBundle<'a> {
    segment: Segment<'a>,
}

impl<'a> PlainBundle<'a> {
    /// Byte offset of the bundle within its file.
    pub const OFFSET: u64 = 0;

    /// Parse a bundle file.
    pub fn parse(data: &'a [u8], decoder: &dyn SegmentDecoder) -> Result<Self> {
        let mut reader = BinaryReader::new(data);
        let segment = decoder.decode(&mut reader)?;
        Ok(Self { segment })
    }

    /// Sub-files in bundle order.
    pub fn entries(&self) -> &[SubEntry<'a>] {
        &self.segment.entries
    }

    /// Consume the bundle, returning its segment.
    pub fn into_segment(self) -> Segment<'a> {
        self.segment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, FramedSegments, SegmentBuilder};

    #[test]
    fn test_parse_bundle() {
        let bytes = SegmentBuilder::new()
            .entry("CAB-one", vec![1])
            .entry("CAB-one.resS", vec![2, 2])
            .build();

        let bundle = PlainBundle::parse(&bytes, &FramedSegments).unwrap();
        let paths: Vec<&str> = bundle.entries().iter().map(|e| e.path).collect();
        assert_eq!(paths, ["CAB-one", "CAB-one.resS"]);
    }

    #[test]
    fn test_not_a_bundle() {
        let err = PlainBundle::parse(b"UnityFS\0", &FramedSegments).unwrap_err();
        assert!(matches!(err, Error::Common(_)));
    }
}
