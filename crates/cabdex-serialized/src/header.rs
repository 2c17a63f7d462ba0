//! Serialized file header and signature check.

use cabdex_common::{BinaryReader, Endian};
use zerocopy::byteorder::big_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{Error, Result};

/// Leading 16 bytes of every serialized file, always big-endian.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct RawHeader {
    pub metadata_size: U32,
    pub file_size: U32,
    pub version: U32,
    pub data_offset: U32,
}

/// Decoded header with the wide fields applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializedHeader {
    pub metadata_size: u32,
    pub file_size: u64,
    pub version: u32,
    pub data_offset: u64,
    /// Byte order of the metadata and object data.
    pub endian: Endian,
}

impl SerializedHeader {
    /// Format version that introduced 64-bit sizes and offsets.
    pub const WIDE_VERSION: u32 = 22;

    /// Smallest stream that can hold a header.
    pub const MIN_SIZE: usize = 20;

    /// Smallest stream that can hold a wide header.
    pub const MIN_WIDE_SIZE: usize = 48;

    /// Read the header, leaving the reader at the start of the metadata.
    pub fn read(reader: &mut BinaryReader<'_>) -> Result<Self> {
        let stream_len = reader.len();
        if stream_len < Self::MIN_SIZE {
            return Err(Error::NotSerialized);
        }

        let raw: RawHeader = reader.read_struct()?;
        let endian_flag = reader.read_u8()?;
        reader.advance(3);

        let mut header = Self {
            metadata_size: raw.metadata_size.get(),
            file_size: u64::from(raw.file_size.get()),
            version: raw.version.get(),
            data_offset: u64::from(raw.data_offset.get()),
            endian: if endian_flag == 0 {
                Endian::Little
            } else {
                Endian::Big
            },
        };

        if header.version >= Self::WIDE_VERSION {
            if stream_len < Self::MIN_WIDE_SIZE {
                return Err(Error::NotSerialized);
            }
            let previous = reader.endian();
            reader.set_endian(Endian::Big);
            header.metadata_size = reader.read_u32()?;
            let file_size = reader.read_i64()?;
            let data_offset = reader.read_i64()?;
            let _reserved = reader.read_i64()?;
            reader.set_endian(previous);

            header.file_size = u64::try_from(file_size).map_err(|_| Error::NotSerialized)?;
            header.data_offset = u64::try_from(data_offset).map_err(|_| Error::NotSerialized)?;
        }

        if header.file_size != stream_len as u64 || header.data_offset > header.file_size {
            return Err(Error::NotSerialized);
        }

        Ok(header)
    }

    /// Signature check: does `data` look like a serialized file?
    pub fn is_serialized(data: &[u8]) -> bool {
        Self::read(&mut BinaryReader::new(data)).is_ok()
    }
}
