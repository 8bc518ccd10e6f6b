//! # xzcodec-filters
//!
//! The `Filter` trait, the filter-chain runtime, and the preprocessing
//! filters XZ streams may place ahead of the LZMA2 compressor: Delta and the
//! six BCJ branch-converters (x86, PowerPC, IA-64, ARM, ARM-Thumb, SPARC).
//!
//! These filters exploit structure LZMA's byte-oriented match finder can't
//! see directly — BCJ turns scattered relative call targets into repeated
//! absolute ones, Delta turns smoothly varying samples into small residuals.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bcj;
pub mod chain;
pub mod delta;
pub mod filter;
pub mod ids;

pub use bcj::{BcjArm, BcjArmThumb, BcjIa64, BcjPowerPc, BcjSparc, BcjX86};
pub use chain::FilterChain;
pub use delta::DeltaFilter;
pub use filter::Filter;
