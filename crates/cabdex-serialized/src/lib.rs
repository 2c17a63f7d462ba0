//! Serialized asset file probe for cabdex.
//!
//! Sub-files inside containers are often serialized asset files: a header,
//! an object table, an external reference table and the object data. This
//! crate reads just enough of that format to index dependencies:
//!
//! - [`SerializedHeader`] - signature check and header fields
//! - [`SerializedFile`] - object table and external references
//! - [`AssetBundle`] - the bundle manifest object (class 142)
//! - [`SerializedProbe`] - classification into a [`ProbeResult`]
//!
//! Decoding typed assets (textures, meshes, ...) is left to other tools.
//!
//! # Example
//!
//! ```no_run
//! use cabdex_serialized::{AssetProbe, ProbeResult, SerializedProbe};
//!
//! let data = std::fs::read("CAB-0123")?;
//! match SerializedProbe.probe("CAB-0123", &data)? {
//!     ProbeResult::Manifests { manifests, .. } => {
//!         for record in manifests {
//!             println!("{} -> {:?}", record.name, record.dependencies);
//!         }
//!     }
//!     ProbeResult::References(record) => println!("{:?}", record.dependencies),
//!     ProbeResult::NotSerialized => {}
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod asset_bundle;
mod builder;
mod class_id;
mod error;
mod file;
mod header;
mod probe;

pub use asset_bundle::{AssetBundle, AssetInfo, PPtr};
pub use builder::SerializedFileBuilder;
pub use class_id::ClassId;
pub use error::{Error, Result};
pub use file::{ObjectInfo, SerializedFile};
pub use header::{RawHeader, SerializedHeader};
pub use probe::{AssetProbe, ManifestRecord, ProbeResult, ReferenceRecord, SerializedProbe};
