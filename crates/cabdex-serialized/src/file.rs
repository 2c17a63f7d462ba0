//! Serialized file metadata: object table and external references.

use cabdex_common::BinaryReader;

use crate::header::SerializedHeader;
use crate::{ClassId, Error, Result};

/// One row of the object table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectInfo {
    pub path_id: i64,
    /// Offset of the object data relative to the header's data offset.
    pub byte_start: u32,
    pub byte_size: u32,
    pub class_id: ClassId,
}

/// A parsed serialized file borrowing from its sub-file stream.
#[derive(Debug, Clone)]
pub struct SerializedFile<'a> {
    data: &'a [u8],
    header: SerializedHeader,
    unity_version: &'a str,
    platform: i32,
    objects: Vec<ObjectInfo>,
    externals: Vec<&'a str>,
}

impl<'a> SerializedFile<'a> {
    /// Parse the header and metadata of a serialized file.
    ///
    /// Returns [`Error::NotSerialized`] when the signature check fails.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(data);
        let header = SerializedHeader::read(&mut reader)?;
        reader.set_endian(header.endian);

        let unity_version = reader.read_cstring()?;
        let platform = reader.read_i32()?;

        let object_count = reader.read_count()?;
        // 20 bytes per row bounds the preallocation on corrupt counts.
        let mut objects = Vec::with_capacity(object_count.min(reader.remaining() / 20));
        for _ in 0..object_count {
            objects.push(ObjectInfo {
                path_id: reader.read_i64()?,
                byte_start: reader.read_u32()?,
                byte_size: reader.read_u32()?,
                class_id: ClassId::from(reader.read_i32()?),
            });
        }

        let external_count = reader.read_count()?;
        let mut externals = Vec::with_capacity(external_count.min(reader.remaining()));
        for _ in 0..external_count {
            externals.push(reader.read_cstring()?);
        }

        Ok(Self {
            data,
            header,
            unity_version,
            platform,
            objects,
            externals,
        })
    }

    /// Header fields.
    pub fn header(&self) -> &SerializedHeader {
        &self.header
    }

    /// Engine version string recorded by the writer.
    pub fn unity_version(&self) -> &'a str {
        self.unity_version
    }

    /// Target platform id.
    pub fn platform(&self) -> i32 {
        self.platform
    }

    /// Object table in file order.
    pub fn objects(&self) -> &[ObjectInfo] {
        &self.objects
    }

    /// Objects of a given class.
    pub fn objects_of(&self, class: ClassId) -> impl Iterator<Item = &ObjectInfo> + '_ {
        self.objects.iter().filter(move |o| o.class_id == class)
    }

    /// External file paths referenced by this file, in table order.
    pub fn externals(&self) -> &[&'a str] {
        &self.externals
    }

    /// External references reduced to file names (`archive:/CAB-1/CAB-1` -> `CAB-1`).
    pub fn external_names(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.externals.iter().map(|path| cabdex_common::file_name(path))
    }

    /// Raw bytes of an object.
    pub fn object_data(&self, object: &ObjectInfo) -> Result<&'a [u8]> {
        let start = self.header.data_offset + u64::from(object.byte_start);
        let end = start + u64::from(object.byte_size);

        if end > self.data.len() as u64 {
            return Err(Error::ObjectOutOfRange {
                path_id: object.path_id,
                start,
                end,
                len: self.data.len(),
            });
        }
        Ok(&self.data[start as usize..end as usize])
    }

    /// A reader over an object's data in the file's byte order.
    pub fn object_reader(&self, object: &ObjectInfo) -> Result<BinaryReader<'a>> {
        let mut reader = BinaryReader::new(self.object_data(object)?);
        reader.set_endian(self.header.endian);
        Ok(reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SerializedFileBuilder;

    #[test]
    fn test_parse_tables() {
        let data = SerializedFileBuilder::new()
            .object(1, ClassId::Texture2D, vec![0xAA; 12])
            .object(2, ClassId::AssetBundle, vec![0xBB; 3])
            .external("archive:/CAB-dep/CAB-dep")
            .external("library/unity default resources")
            .build();

        let file = SerializedFile::parse(&data).unwrap();

        assert_eq!(file.objects().len(), 2);
        assert_eq!(file.objects_of(ClassId::AssetBundle).count(), 1);
        assert_eq!(
            file.external_names().collect::<Vec<_>>(),
            ["CAB-dep", "unity default resources"]
        );

        let texture = file.objects()[0];
        assert_eq!(file.object_data(&texture).unwrap(), &[0xAA; 12]);
        let bundle = file.objects()[1];
        assert_eq!(file.object_data(&bundle).unwrap(), &[0xBB; 3]);
    }

    #[test]
    fn test_big_endian_file() {
        let data = SerializedFileBuilder::new()
            .big_endian(true)
            .object(-5, ClassId::Other(999), vec![1, 2])
            .build();

        let file = SerializedFile::parse(&data).unwrap();
        let object = file.objects()[0];

        assert_eq!(object.path_id, -5);
        assert_eq!(object.class_id, ClassId::Other(999));
        assert_eq!(file.object_data(&object).unwrap(), &[1, 2]);
    }

    #[test]
    fn test_wide_version() {
        let data = SerializedFileBuilder::new()
            .version(22)
            .external("archive:/CAB-x/CAB-x")
            .build();

        let file = SerializedFile::parse(&data).unwrap();
        assert_eq!(file.header().version, 22);
        assert_eq!(file.externals(), ["archive:/CAB-x/CAB-x"]);
    }

    #[test]
    fn test_object_out_of_range() {
        let data = SerializedFileBuilder::new().build();
        let file = SerializedFile::parse(&data).unwrap();
        let bogus = ObjectInfo {
            path_id: 9,
            byte_start: 0,
            byte_size: 4096,
            class_id: ClassId::Mesh,
        };

        assert!(matches!(
            file.object_data(&bogus),
            Err(Error::ObjectOutOfRange { path_id: 9, .. })
        ));
    }

    #[test]
    fn test_not_serialized() {
        assert!(matches!(
            SerializedFile::parse(b"definitely not an asset file"),
            Err(Error::NotSerialized)
        ));
    }
}
