//! Container decoders for cabdex.
//!
//! Two container families are supported:
//!
//! - [`BlkContainer`] - encrypted block containers. A header carries the key
//!   and cipher block size; the decrypted payload holds a run of segments.
//! - [`PlainBundle`] - unencrypted bundle files holding a single segment.
//!
//! Segments list embedded sub-files by path ([`SubEntry`]). Decryption goes
//! through a [`BlockCipher`] gate and segment decoding through a
//! [`SegmentDecoder`], so the vendor formats can be swapped in.
//!
//! # Example
//!
//! ```no_run
//! use cabdex_container::{Aes128Gate, BlkContainer, FramedSegments};
//!
//! let data = std::fs::read("31.blk")?;
//! let blk = BlkContainer::parse(&data, &Aes128Gate)?;
//!
//! let scan = blk.segments(&FramedSegments, None);
//! for (offset, segment) in &scan.segments {
//!     for entry in &segment.entries {
//!         println!("{offset:#x}: {} ({} bytes)", entry.path, entry.data.len());
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod blk;
mod bundle;
mod crypto;
mod error;
mod segment;

pub use blk::{BlkBuilder, BlkContainer, SegmentFailure, SegmentScan};
pub use bundle::PlainBundle;
pub use crypto::{Aes128Gate, BlockCipher, Passthrough, AES_BLOCK};
pub use error::{Error, Result};
pub use segment::{FramedSegments, Segment, SegmentBuilder, SegmentDecoder, SubEntry};

pub use cabdex_common::BinaryReader;
