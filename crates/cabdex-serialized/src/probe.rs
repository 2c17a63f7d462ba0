//! Classify sub-file streams and extract dependency information.

use tracing::trace;

use crate::{AssetBundle, ClassId, Error, Result, SerializedFile};

/// Identity and dependencies taken from a bundle manifest object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRecord {
    pub name: String,
    pub dependencies: Vec<String>,
}

/// Identity and dependencies taken from the external reference table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceRecord {
    /// Path of the sub-file inside its container.
    pub path: String,
    /// File names of the referenced externals, in table order.
    pub dependencies: Vec<String>,
}

/// What a sub-file turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    /// Not a serialized file; ignored for indexing.
    NotSerialized,
    /// Serialized file holding one or more bundle manifests. The reference
    /// view of the same file is kept alongside.
    Manifests {
        manifests: Vec<ManifestRecord>,
        reference: ReferenceRecord,
    },
    /// Serialized file without a manifest.
    References(ReferenceRecord),
}

impl ProbeResult {
    /// Path and external references of any serialized file.
    pub fn reference(&self) -> Option<&ReferenceRecord> {
        match self {
            Self::NotSerialized => None,
            Self::Manifests { reference, .. } | Self::References(reference) => Some(reference),
        }
    }

    /// Manifest records, empty unless the file holds a manifest.
    pub fn manifests(&self) -> &[ManifestRecord] {
        match self {
            Self::Manifests { manifests, .. } => manifests,
            _ => &[],
        }
    }
}

/// Inspects a sub-file stream.
pub trait AssetProbe: Send + Sync {
    fn probe(&self, path: &str, data: &[u8]) -> Result<ProbeResult>;
}

/// Probe for the engine's serialized file format.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerializedProbe;

impl AssetProbe for SerializedProbe {
    fn probe(&self, path: &str, data: &[u8]) -> Result<ProbeResult> {
        let file = match SerializedFile::parse(data) {
            Ok(file) => file,
            Err(Error::NotSerialized) => {
                trace!(path, "skipping non-serialized sub-file");
                return Ok(ProbeResult::NotSerialized);
            }
            Err(e) => return Err(e),
        };

        let mut manifests = Vec::new();
        for object in file.objects_of(ClassId::AssetBundle) {
            let mut reader = file.object_reader(object)?;
            let bundle = AssetBundle::read(&mut reader)?;
            manifests.push(ManifestRecord {
                name: bundle.name,
                dependencies: bundle.dependencies,
            });
        }

        let reference = ReferenceRecord {
            path: path.to_string(),
            dependencies: file.external_names().map(str::to_string).collect(),
        };

        if manifests.is_empty() {
            Ok(ProbeResult::References(reference))
        } else {
            Ok(ProbeResult::Manifests {
                manifests,
                reference,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SerializedFileBuilder;

    #[test]
    fn test_manifest_keeps_reference_view() {
        let data = SerializedFileBuilder::new()
            .object(7, ClassId::Texture2D, vec![0; 16])
            .manifest(1, &AssetBundle::named("ui_common", vec!["fonts".into(), "atlas".into()]))
            .external("archive:/CAB-fonts/CAB-fonts")
            .build();

        let result = SerializedProbe.probe("CAB-ui", &data).unwrap();
        assert_eq!(
            result,
            ProbeResult::Manifests {
                manifests: vec![ManifestRecord {
                    name: "ui_common".into(),
                    dependencies: vec!["fonts".into(), "atlas".into()],
                }],
                reference: ReferenceRecord {
                    path: "CAB-ui".into(),
                    dependencies: vec!["CAB-fonts".into()],
                },
            }
        );
        assert_eq!(result.reference().unwrap().path, "CAB-ui");
        assert_eq!(result.manifests().len(), 1);
    }

    #[test]
    fn test_references_without_manifest() {
        let data = SerializedFileBuilder::new()
            .object(7, ClassId::Mesh, vec![0; 4])
            .external("archive:/CAB-b/CAB-b")
            .external("archive:/CAB-c/CAB-c")
            .build();

        let result = SerializedProbe.probe("CAB-a", &data).unwrap();
        assert_eq!(
            result,
            ProbeResult::References(ReferenceRecord {
                path: "CAB-a".into(),
                dependencies: vec!["CAB-b".into(), "CAB-c".into()],
            })
        );
    }

    #[test]
    fn test_resource_stream_is_ignored() {
        let result = SerializedProbe.probe("CAB-a.resS", &[0u8; 64]).unwrap();
        assert_eq!(result, ProbeResult::NotSerialized);
    }

    #[test]
    fn test_corrupt_manifest_is_an_error() {
        let data = SerializedFileBuilder::new()
            .object(1, ClassId::AssetBundle, vec![0xFF; 6])
            .build();

        assert!(SerializedProbe.probe("CAB-bad", &data).is_err());
    }
}
