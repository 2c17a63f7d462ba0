//! Binary index cache.
//!
//! Little-endian layout:
//!
//! ```text
//! i32 entry_count
//! per entry, ascending key order:
//!   string key
//!   i32 dependency_count, string[dependency_count]
//!   i32 location_count                 (multi-location layout only)
//!   (string path, i64 offset)[location_count, or exactly 1]
//! ```
//!
//! Strings are a 7-bit encoded byte length followed by UTF-8.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, WriteBytesExt};
use cabdex_common::{BinaryReader, WriteExt};

use crate::{Error, Index, IndexEntry, Location, Result};

/// How locations are stored per entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLayout {
    /// Location count followed by that many locations.
    MultiLocation,
    /// Exactly one location, no count.
    SingleLocation,
}

/// Serialize an index.
pub fn write_index<W: Write>(out: &mut W, index: &Index, layout: CacheLayout) -> Result<()> {
    out.write_count(index.len())?;

    for (key, entry) in index {
        out.write_prefixed_string(key)?;

        out.write_count(entry.dependencies().len())?;
        for dep in entry.dependencies() {
            out.write_prefixed_string(dep)?;
        }

        let locations = entry.locations();
        match layout {
            CacheLayout::MultiLocation => out.write_count(locations.len())?,
            CacheLayout::SingleLocation if locations.len() != 1 => {
                return Err(Error::LayoutMismatch {
                    key: key.clone(),
                    locations: locations.len(),
                });
            }
            CacheLayout::SingleLocation => {}
        }
        for location in locations {
            out.write_prefixed_string(&location.path)?;
            out.write_i64::<LittleEndian>(location.offset as i64)?;
        }
    }

    Ok(())
}

/// Deserialize an index. The whole buffer must be consumed.
pub fn read_index(data: &[u8], layout: CacheLayout) -> Result<Index> {
    let mut reader = BinaryReader::new(data);
    let mut index = Index::new();

    let count = reader.read_count()?;
    for _ in 0..count {
        let key = reader.read_prefixed_string()?.to_string();

        let dep_count = reader.read_count()?;
        let mut dependencies = Vec::with_capacity(dep_count.min(reader.remaining()));
        for _ in 0..dep_count {
            dependencies.push(reader.read_prefixed_string()?.to_string());
        }

        let loc_count = match layout {
            CacheLayout::MultiLocation => reader.read_count()?,
            CacheLayout::SingleLocation => 1,
        };
        let mut locations = Vec::with_capacity(loc_count.min(reader.remaining() / 9));
        for _ in 0..loc_count {
            let path = reader.read_prefixed_string()?.to_string();
            let offset = reader.read_i64()?;
            let offset = u64::try_from(offset).map_err(|_| Error::NegativeOffset {
                key: key.clone(),
                offset,
            })?;
            locations.push(Location { path, offset });
        }

        index
            .try_insert(key, IndexEntry::from_parts(locations, dependencies))
            .map_err(|(key, _)| Error::DuplicateKey(key))?;
    }

    if !reader.is_empty() {
        return Err(Error::TrailingBytes(reader.remaining()));
    }

    Ok(index)
}

/// Write an index to `path`, replacing any previous cache.
///
/// The data goes to a sibling temporary file first and is renamed into
/// place, so a failed save leaves the old cache intact.
pub fn save(index: &Index, path: &Path, layout: CacheLayout) -> Result<()> {
    let tmp = temp_path(path);

    let result = (|| -> Result<()> {
        let mut out = BufWriter::new(File::create(&tmp)?);
        write_index(&mut out, index, layout)?;
        out.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        fs::rename(&tmp, path)?;
        Ok(())
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

/// Read an index from `path`.
pub fn load(path: &Path, layout: CacheLayout) -> Result<Index> {
    let data = fs::read(path)?;
    read_index(&data, layout)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "index".into());
    name.push(".tmp");
    path.with_file_name(name)
}
