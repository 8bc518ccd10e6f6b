//! # xzcodec-core
//!
//! Shared foundation for the xzcodec workspace: the error taxonomy, the
//! variable-length integer codec, integrity checks (CRC-32, CRC-64,
//! SHA-256), the memory-tracked allocator shim, and the `Action`/`Status`
//! vocabulary used by every streaming layer above this crate (filters, the
//! block engine, the stream engine, the public API).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ xzcodec        — public API, stream/block/index engine  │
//! ├─────────────────────────────────────────────────────────┤
//! │ xzcodec-filters — filter chain, BCJ, delta               │
//! ├─────────────────────────────────────────────────────────┤
//! │ xzcodec-lzma    — range coder, match finder, LZMA/LZMA2  │
//! ├─────────────────────────────────────────────────────────┤
//! │ xzcodec-core (this crate) — errors, VLI, checks, alloc   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use xzcodec_core::checksum::Crc32;
//! use xzcodec_core::vli;
//!
//! let crc = Crc32::compute(b"Hello, World!");
//! assert_eq!(crc, 0xEC4AC3D0);
//!
//! let mut buf = Vec::new();
//! vli::encode(300, &mut buf).unwrap();
//! let (value, len) = vli::decode(&buf).unwrap();
//! assert_eq!((value, len), (300, buf.len()));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod checksum;
pub mod error;
pub mod mem;
pub mod vli;

// Re-exports for convenience.
pub use action::{Action, Input, Output, Status};
pub use checksum::{Check, CheckType, Crc32, Crc64, Sha256};
pub use error::{Result, XzError};
pub use mem::{Allocator, DefaultAllocator, MemLimiter};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::action::{Action, Input, Output, Status};
    pub use crate::checksum::{Check, CheckType};
    pub use crate::error::{Result, XzError};
    pub use crate::mem::Allocator;
}
