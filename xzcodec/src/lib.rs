//! # xzcodec
//!
//! Pure-Rust XZ container format: stream/block header and footer codecs,
//! the index, and the public streaming API (`XzEncoder`/`XzDecoder`) that
//! drives a filter chain — BCJ/Delta filters ahead of an LZMA2 tail — to
//! completion across suspend points.
//!
//! ```
//! use xzcodec::xz::{self, XzOptions};
//!
//! let data: &[u8] = b"Hello, World! Hello, World!";
//! let compressed = xz::compress(data, &XzOptions::default()).unwrap();
//! let decompressed = xz::decompress(&compressed).unwrap();
//! assert_eq!(decompressed, data);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod xz;

pub use xz::{XzDecoder, XzEncoder, XzOptions, compress, decompress};
