//! XZ container format support.
//!
//! XZ is a container format for LZMA2-compressed data (optionally preceded
//! by BCJ/Delta filters) with integrity checks.
//!
//! ## File structure
//!
//! - Stream header (12 bytes): magic + flags + CRC32
//! - Blocks: filtered/compressed data plus an integrity check, each
//!   4-byte aligned
//! - Index: block size records, for decoder-side cross-verification
//! - Stream footer (12 bytes): CRC32 + backward size + flags + magic

mod block;
mod filters;
mod format;
mod stream;

pub use filters::{BcjArch, FilterSpec};
pub use format::{BLOCK_HEADER_SIZE_MAX, BLOCK_HEADER_SIZE_MIN, StreamFlags};
pub use stream::{XzDecoder, XzEncoder, XzOptions, compress, decompress};
