//! Binary reader for zero-copy parsing of byte slices.
//!
//! This module provides [`BinaryReader`], a cursor-like type that reads
//! binary data from a byte slice without copying. Containers are
//! little-endian throughout, but serialized-file headers are written
//! big-endian, so the reader carries a switchable [`Endian`].

use zerocopy::FromBytes;

use crate::{Error, Result};

/// Byte order used for multi-byte reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

/// A binary reader that provides zero-copy reading from a byte slice.
///
/// # Example
///
/// ```
/// use cabdex_common::{BinaryReader, Endian};
///
/// let data = [0x00, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06];
/// let mut reader = BinaryReader::new(&data);
///
/// reader.set_endian(Endian::Big);
/// assert_eq!(reader.read_u32().unwrap(), 0x0102);
/// reader.set_endian(Endian::Little);
/// assert_eq!(reader.read_u32().unwrap(), 0x06050403);
/// assert!(reader.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    position: usize,
    endian: Endian,
}

macro_rules! read_number {
    ($name:ident, $ty:ty, $size:literal) => {
        #[doc = concat!("Read a `", stringify!($ty), "` in the reader's byte order.")]
        #[inline]
        pub fn $name(&mut self) -> Result<$ty> {
            let bytes: [u8; $size] = self.read_array()?;
            Ok(match self.endian {
                Endian::Little => <$ty>::from_le_bytes(bytes),
                Endian::Big => <$ty>::from_be_bytes(bytes),
            })
        }
    };
}

impl<'a> BinaryReader<'a> {
    /// Create a new little-endian reader from a byte slice.
    #[inline]
    pub const fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            position: 0,
            endian: Endian::Little,
        }
    }

    /// Create a new reader starting at a specific position.
    #[inline]
    pub const fn new_at(data: &'a [u8], position: usize) -> Self {
        Self {
            data,
            position,
            endian: Endian::Little,
        }
    }

    /// Current byte order.
    #[inline]
    pub const fn endian(&self) -> Endian {
        self.endian
    }

    /// Switch the byte order for subsequent reads.
    #[inline]
    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    /// Get the current position in the buffer.
    #[inline]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Get the total length of the underlying buffer.
    #[inline]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// Get the number of bytes remaining to read.
    #[inline]
    pub const fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Check if there are no more bytes to read.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.position >= self.data.len()
    }

    /// Advance the position by a number of bytes.
    #[inline]
    pub fn advance(&mut self, count: usize) {
        self.position = self.position.saturating_add(count);
    }

    /// Skip to the next multiple of `alignment`. The padding must be present.
    #[inline]
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        let rem = self.position % alignment;
        if rem != 0 {
            self.read_bytes(alignment - rem)?;
        }
        Ok(())
    }

    /// Get the remaining bytes as a slice.
    #[inline]
    pub fn remaining_bytes(&self) -> &'a [u8] {
        &self.data[self.position.min(self.data.len())..]
    }

    /// Peek at bytes without advancing the position.
    #[inline]
    pub fn peek_bytes(&self, count: usize) -> Result<&'a [u8]> {
        if self.remaining() < count {
            return Err(Error::UnexpectedEof {
                needed: count,
                available: self.remaining(),
            });
        }
        Ok(&self.data[self.position..self.position + count])
    }

    /// Read bytes and advance the position.
    #[inline]
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        let bytes = self.peek_bytes(count)?;
        self.position += count;
        Ok(bytes)
    }

    /// Read a fixed-size array.
    #[inline]
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Read a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        self.read_bytes(1).map(|b| b[0])
    }

    read_number!(read_u16, u16, 2);
    read_number!(read_u32, u32, 4);
    read_number!(read_i32, i32, 4);
    read_number!(read_i64, i64, 8);

    /// Read an `i32` length or count field, rejecting negative values.
    pub fn read_count(&mut self) -> Result<usize> {
        let count = self.read_i32()?;
        usize::try_from(count).map_err(|_| Error::NegativeLength(count as i64))
    }

    /// Read a 7-bit encoded unsigned integer (LEB128, at most five bytes).
    pub fn read_7bit_encoded_u32(&mut self) -> Result<u32> {
        let mut value = 0u32;
        for shift in (0..35).step_by(7) {
            let byte = self.read_u8()?;
            value |= u32::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(Error::BadEncodedInt)
    }

    /// Read a null-terminated UTF-8 string.
    pub fn read_cstring(&mut self) -> Result<&'a str> {
        let remaining = self.remaining_bytes();
        let null_pos = memchr::memchr(0, remaining).ok_or(Error::MissingNullTerminator)?;

        let string_bytes = &remaining[..null_pos];
        self.position += null_pos + 1;

        std::str::from_utf8(string_bytes).map_err(Error::Utf8)
    }

    /// Read a string of a specific length.
    pub fn read_string(&mut self, length: usize) -> Result<&'a str> {
        let bytes = self.read_bytes(length)?;
        std::str::from_utf8(bytes).map_err(Error::Utf8)
    }

    /// Read a string prefixed by its 7-bit encoded byte length.
    pub fn read_prefixed_string(&mut self) -> Result<&'a str> {
        let length = self.read_7bit_encoded_u32()? as usize;
        self.read_string(length)
    }

    /// Read an `i32`-length string, then skip padding to a 4-byte boundary.
    pub fn read_aligned_string(&mut self) -> Result<&'a str> {
        let length = self.read_count()?;
        let value = self.read_string(length)?;
        self.align(4)?;
        Ok(value)
    }

    /// Read a struct using zerocopy.
    ///
    /// The struct must implement `FromBytes` from the zerocopy crate.
    #[inline]
    pub fn read_struct<T: FromBytes>(&mut self) -> Result<T> {
        let size = std::mem::size_of::<T>();
        let bytes = self.read_bytes(size)?;
        T::read_from_bytes(bytes).map_err(|_| Error::UnexpectedEof {
            needed: size,
            available: bytes.len(),
        })
    }

    /// Expect specific magic bytes.
    pub fn expect_magic(&mut self, expected: &[u8]) -> Result<()> {
        let actual = self.read_bytes(expected.len())?;
        if actual != expected {
            return Err(Error::InvalidMagic {
                expected: expected.to_vec(),
                actual: actual.to_vec(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_primitives() {
        let data = [
            0x01u8, 0x02, 0x03, 0x04, // u32: 0x04030201
            0xFF, 0xFF, 0xFF, 0xFF, // i32: -1
        ];
        let mut reader = BinaryReader::new(&data);

        assert_eq!(reader.read_u32().unwrap(), 0x04030201);
        assert_eq!(reader.read_i32().unwrap(), -1);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_big_endian() {
        let data = [0x00, 0x00, 0x00, 0x16, 0x12, 0x34];
        let mut reader = BinaryReader::new(&data);
        reader.set_endian(Endian::Big);

        assert_eq!(reader.read_u32().unwrap(), 22);
        assert_eq!(reader.read_u16().unwrap(), 0x1234);
    }

    #[test]
    fn test_read_cstring() {
        let data = b"hello\0world\0";
        let mut reader = BinaryReader::new(data);

        assert_eq!(reader.read_cstring().unwrap(), "hello");
        assert_eq!(reader.read_cstring().unwrap(), "world");
        assert!(matches!(reader.read_cstring(), Err(Error::MissingNullTerminator)));
    }

    #[test]
    fn test_7bit_encoded() {
        let data = [0x05, 0xAC, 0x02, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
        let mut reader = BinaryReader::new(&data);

        assert_eq!(reader.read_7bit_encoded_u32().unwrap(), 5);
        assert_eq!(reader.read_7bit_encoded_u32().unwrap(), 300);
        assert!(matches!(reader.read_7bit_encoded_u32(), Err(Error::BadEncodedInt)));
    }

    #[test]
    fn test_prefixed_string() {
        let data = b"\x03abcrest";
        let mut reader = BinaryReader::new(data);

        assert_eq!(reader.read_prefixed_string().unwrap(), "abc");
        assert_eq!(reader.remaining_bytes(), b"rest");
    }

    #[test]
    fn test_aligned_string() {
        let data = [5, 0, 0, 0, b'h', b'e', b'l', b'l', b'o', 0, 0, 0, 7, 0, 0, 0];
        let mut reader = BinaryReader::new(&data);

        assert_eq!(reader.read_aligned_string().unwrap(), "hello");
        assert_eq!(reader.position(), 12);
        assert_eq!(reader.read_i32().unwrap(), 7);
    }

    #[test]
    fn test_align_needs_padding() {
        let data = [1, 0, 0, 0, b'x', 0];
        let mut reader = BinaryReader::new(&data);

        assert!(matches!(
            reader.read_aligned_string(),
            Err(Error::UnexpectedEof { needed: 3, available: 1 })
        ));

        let mut reader = BinaryReader::new(&data);
        reader.advance(4);
        assert!(reader.align(4).is_ok());
        assert_eq!(reader.position(), 4);
    }

    #[test]
    fn test_negative_count() {
        let data = (-2i32).to_le_bytes();
        let mut reader = BinaryReader::new(&data);

        assert!(matches!(reader.read_count(), Err(Error::NegativeLength(-2))));
    }

    #[test]
    fn test_eof_error() {
        let data = [0x01, 0x02];
        let mut reader = BinaryReader::new(&data);

        assert!(matches!(
            reader.read_u32(),
            Err(Error::UnexpectedEof { needed: 4, available: 2 })
        ));
    }
}
