//! Bundle manifest object (class 142).

use cabdex_common::{BinaryReader, Endian};

use crate::builder::FieldWriter;
use crate::Result;

/// Pointer to an object, possibly in another file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PPtr {
    pub file_id: i32,
    pub path_id: i64,
}

impl PPtr {
    fn read(reader: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Self {
            file_id: reader.read_i32()?,
            path_id: reader.read_i64()?,
        })
    }
}

/// Preload range and main object of one container entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetInfo {
    pub preload_index: i32,
    pub preload_size: i32,
    pub asset: PPtr,
}

/// Decoded bundle manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetBundle {
    pub name: String,
    pub preload_table: Vec<PPtr>,
    pub container: Vec<(String, AssetInfo)>,
    pub asset_bundle_name: String,
    pub dependencies: Vec<String>,
}

impl AssetBundle {
    /// Decode a manifest from an object reader.
    pub fn read(reader: &mut BinaryReader<'_>) -> Result<Self> {
        let name = reader.read_aligned_string()?.to_owned();

        let preload_count = reader.read_count()?;
        let mut preload_table = Vec::with_capacity(preload_count.min(reader.remaining() / 12));
        for _ in 0..preload_count {
            preload_table.push(PPtr::read(reader)?);
        }

        let container_count = reader.read_count()?;
        let mut container = Vec::with_capacity(container_count.min(reader.remaining() / 24));
        for _ in 0..container_count {
            let path = reader.read_aligned_string()?.to_owned();
            let info = AssetInfo {
                preload_index: reader.read_i32()?,
                preload_size: reader.read_i32()?,
                asset: PPtr::read(reader)?,
            };
            container.push((path, info));
        }

        let asset_bundle_name = reader.read_aligned_string()?.to_owned();

        let dependency_count = reader.read_count()?;
        let mut dependencies = Vec::with_capacity(dependency_count.min(reader.remaining() / 4));
        for _ in 0..dependency_count {
            dependencies.push(reader.read_aligned_string()?.to_owned());
        }

        Ok(Self {
            name,
            preload_table,
            container,
            asset_bundle_name,
            dependencies,
        })
    }

    /// Create a manifest with a name and dependency list, other tables empty.
    pub fn named(name: impl Into<String>, dependencies: Vec<String>) -> Self {
        let name = name.into();
        Self {
            asset_bundle_name: name.clone(),
            name,
            dependencies,
            ..Self::default()
        }
    }

    /// Encode the manifest as object data.
    pub fn to_bytes(&self, endian: Endian) -> Vec<u8> {
        let mut w = FieldWriter::new(endian);

        w.aligned_string(&self.name);
        w.count(self.preload_table.len());
        for pptr in &self.preload_table {
            w.i32(pptr.file_id);
            w.i64(pptr.path_id);
        }
        w.count(self.container.len());
        for (path, info) in &self.container {
            w.aligned_string(path);
            w.i32(info.preload_index);
            w.i32(info.preload_size);
            w.i32(info.asset.file_id);
            w.i64(info.asset.path_id);
        }
        w.aligned_string(&self.asset_bundle_name);
        w.count(self.dependencies.len());
        for dep in &self.dependencies {
            w.aligned_string(dep);
        }

        w.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AssetBundle {
        AssetBundle {
            name: "scene_main".into(),
            preload_table: vec![
                PPtr { file_id: 0, path_id: 11 },
                PPtr { file_id: 1, path_id: -3 },
            ],
            container: vec![(
                "assets/scenes/main.unity".into(),
                AssetInfo {
                    preload_index: 0,
                    preload_size: 2,
                    asset: PPtr { file_id: 0, path_id: 11 },
                },
            )],
            asset_bundle_name: "scene_main".into(),
            dependencies: vec!["shared_ui".into(), "fonts".into()],
        }
    }

    #[test]
    fn test_decode_encoded_manifest() {
        for endian in [Endian::Little, Endian::Big] {
            let bytes = sample().to_bytes(endian);
            let mut reader = BinaryReader::new(&bytes);
            reader.set_endian(endian);

            assert_eq!(AssetBundle::read(&mut reader).unwrap(), sample());
            assert!(reader.is_empty());
        }
    }

    #[test]
    fn test_strings_are_aligned() {
        let bytes = AssetBundle::named("abcde", Vec::new()).to_bytes(Endian::Little);
        // 4 (len) + 5 + 3 (pad) for the name, then the preload count.
        assert_eq!(&bytes[..4], &5i32.to_le_bytes());
        assert_eq!(&bytes[9..12], &[0, 0, 0]);
        assert_eq!(&bytes[12..16], &0i32.to_le_bytes());
    }

    #[test]
    fn test_truncated_manifest() {
        let bytes = sample().to_bytes(Endian::Little);
        let mut reader = BinaryReader::new(&bytes[..bytes.len() - 2]);
        assert!(AssetBundle::read(&mut reader).is_err());
    }
}
