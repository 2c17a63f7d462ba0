//! Stream writing helpers mirroring [`BinaryReader`](crate::BinaryReader).

use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};

/// Extends `Write` with the little-endian encodings used by cache files.
pub trait WriteExt: Write {
    /// Write a 7-bit encoded unsigned integer (LEB128).
    fn write_7bit_encoded_u32(&mut self, mut value: u32) -> io::Result<()> {
        while value >= 0x80 {
            self.write_u8((value as u8) | 0x80)?;
            value >>= 7;
        }
        self.write_u8(value as u8)
    }

    /// Write a string prefixed by its 7-bit encoded byte length.
    fn write_prefixed_string(&mut self, value: &str) -> io::Result<()> {
        let length = u32::try_from(value.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "string too long"))?;
        self.write_7bit_encoded_u32(length)?;
        self.write_all(value.as_bytes())
    }

    /// Write a length or count as a little-endian `i32`.
    fn write_count(&mut self, count: usize) -> io::Result<()> {
        let count = i32::try_from(count)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "count exceeds i32"))?;
        self.write_i32::<LittleEndian>(count)
    }
}

impl<W: Write + ?Sized> WriteExt for W {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BinaryReader;

    #[test]
    fn test_7bit_encoding_matches_reader() {
        let mut buf = Vec::new();
        buf.write_7bit_encoded_u32(300).unwrap();
        assert_eq!(buf, [0xAC, 0x02]);

        buf.clear();
        buf.write_7bit_encoded_u32(u32::MAX).unwrap();
        let mut reader = BinaryReader::new(&buf);
        assert_eq!(reader.read_7bit_encoded_u32().unwrap(), u32::MAX);
    }

    #[test]
    fn test_prefixed_string() {
        let mut buf = Vec::new();
        buf.write_prefixed_string("blocks/31.blk").unwrap();
        assert_eq!(buf[0], 13);

        let mut reader = BinaryReader::new(&buf);
        assert_eq!(reader.read_prefixed_string().unwrap(), "blocks/31.blk");
    }

    #[test]
    fn test_write_count() {
        let mut buf = Vec::new();
        buf.write_count(3).unwrap();
        assert_eq!(buf, [3, 0, 0, 0]);
    }
}
