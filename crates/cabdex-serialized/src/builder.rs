//! Builder for serialized files.
//!
//! Produces files that [`SerializedFile::parse`](crate::SerializedFile::parse)
//! accepts. Used to write minimal manifest-only files and in tests.

use cabdex_common::Endian;

use crate::{AssetBundle, ClassId, SerializedHeader};

/// Appends endian-aware fields to a buffer.
pub(crate) struct FieldWriter {
    buf: Vec<u8>,
    endian: Endian,
}

impl FieldWriter {
    pub(crate) fn new(endian: Endian) -> Self {
        Self {
            buf: Vec::new(),
            endian,
        }
    }

    pub(crate) fn u32(&mut self, value: u32) {
        let bytes = match self.endian {
            Endian::Little => value.to_le_bytes(),
            Endian::Big => value.to_be_bytes(),
        };
        self.buf.extend_from_slice(&bytes);
    }

    pub(crate) fn i32(&mut self, value: i32) {
        self.u32(value as u32);
    }

    pub(crate) fn i64(&mut self, value: i64) {
        let bytes = match self.endian {
            Endian::Little => value.to_le_bytes(),
            Endian::Big => value.to_be_bytes(),
        };
        self.buf.extend_from_slice(&bytes);
    }

    pub(crate) fn count(&mut self, count: usize) {
        self.i32(count as i32);
    }

    pub(crate) fn cstring(&mut self, value: &str) {
        self.buf.extend_from_slice(value.as_bytes());
        self.buf.push(0);
    }

    pub(crate) fn aligned_string(&mut self, value: &str) {
        self.count(value.len());
        self.buf.extend_from_slice(value.as_bytes());
        self.align(4);
    }

    pub(crate) fn align(&mut self, alignment: usize) {
        let rem = self.buf.len() % alignment;
        if rem != 0 {
            self.buf.resize(self.buf.len() + alignment - rem, 0);
        }
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Builder for serialized files.
///
/// # Example
///
/// ```
/// use cabdex_serialized::{AssetBundle, SerializedFile, SerializedFileBuilder};
///
/// let data = SerializedFileBuilder::new()
///     .manifest(1, &AssetBundle::named("ui_common", vec!["fonts".into()]))
///     .build();
///
/// let file = SerializedFile::parse(&data).unwrap();
/// assert_eq!(file.objects().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct SerializedFileBuilder {
    version: u32,
    endian: Endian,
    unity_version: String,
    platform: i32,
    objects: Vec<(i64, ClassId, Vec<u8>)>,
    externals: Vec<String>,
}

impl Default for SerializedFileBuilder {
    fn default() -> Self {
        Self {
            version: 21,
            endian: Endian::Little,
            unity_version: "2017.4.30f1".to_string(),
            platform: 19,
            objects: Vec::new(),
            externals: Vec::new(),
        }
    }
}

impl SerializedFileBuilder {
    /// Create a builder for an empty little-endian file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the format version (22 and above writes the wide header).
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Write metadata and objects big-endian.
    pub fn big_endian(mut self, big: bool) -> Self {
        self.endian = if big { Endian::Big } else { Endian::Little };
        self
    }

    /// Add an object with raw data.
    pub fn object(mut self, path_id: i64, class_id: ClassId, data: Vec<u8>) -> Self {
        self.objects.push((path_id, class_id, data));
        self
    }

    /// Add a bundle manifest object.
    pub fn manifest(self, path_id: i64, bundle: &AssetBundle) -> Self {
        let data = bundle.to_bytes(self.endian);
        self.object(path_id, ClassId::AssetBundle, data)
    }

    /// Add an external file reference.
    pub fn external(mut self, path: impl Into<String>) -> Self {
        self.externals.push(path.into());
        self
    }

    /// Serialize the file.
    pub fn build(&self) -> Vec<u8> {
        let wide = self.version >= SerializedHeader::WIDE_VERSION;

        // Object data layout, each object 8-byte aligned.
        let mut data = FieldWriter::new(self.endian);
        let mut starts = Vec::with_capacity(self.objects.len());
        for (_, _, bytes) in &self.objects {
            data.align(8);
            starts.push(data.buf.len() as u32);
            data.buf.extend_from_slice(bytes);
        }
        let data = data.into_bytes();

        let mut meta = FieldWriter::new(self.endian);
        meta.cstring(&self.unity_version);
        meta.i32(self.platform);
        meta.count(self.objects.len());
        for ((path_id, class_id, bytes), start) in self.objects.iter().zip(&starts) {
            meta.i64(*path_id);
            meta.u32(*start);
            meta.u32(bytes.len() as u32);
            meta.i32(class_id.raw());
        }
        meta.count(self.externals.len());
        for path in &self.externals {
            meta.cstring(path);
        }
        let meta = meta.into_bytes();

        let header_len = if wide {
            SerializedHeader::MIN_WIDE_SIZE
        } else {
            SerializedHeader::MIN_SIZE
        };
        let data_offset = (header_len + meta.len()).next_multiple_of(16);
        let file_size = data_offset + data.len();
        let metadata_size = meta.len() as u32;

        let mut out = FieldWriter::new(Endian::Big);
        if wide {
            out.u32(0);
            out.u32(0);
            out.u32(self.version);
            out.u32(0);
        } else {
            out.u32(metadata_size);
            out.u32(file_size as u32);
            out.u32(self.version);
            out.u32(data_offset as u32);
        }
        out.buf.push(u8::from(self.endian == Endian::Big));
        out.buf.extend_from_slice(&[0, 0, 0]);
        if wide {
            out.u32(metadata_size);
            out.i64(file_size as i64);
            out.i64(data_offset as i64);
            out.i64(0);
        }

        let mut out = out.into_bytes();
        out.extend_from_slice(&meta);
        out.resize(data_offset, 0);
        out.extend_from_slice(&data);
        out
    }
}
