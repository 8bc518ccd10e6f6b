//! Filter id constants from the XZ filter-id registry.
//!
//! `LZMA2` is listed here only so the chain-construction validator in
//! [`crate::chain`] can recognize it as the tail-only filter; the LZMA2
//! codec itself lives in `xzcodec-lzma` and its `Filter` adapter is
//! assembled by the container crate that depends on both.

/// Delta filter.
pub const FILTER_ID_DELTA: u64 = 0x03;
/// x86 BCJ filter.
pub const FILTER_ID_BCJ_X86: u64 = 0x04;
/// PowerPC BCJ filter.
pub const FILTER_ID_BCJ_POWERPC: u64 = 0x05;
/// IA-64 BCJ filter.
pub const FILTER_ID_BCJ_IA64: u64 = 0x06;
/// ARM BCJ filter.
pub const FILTER_ID_BCJ_ARM: u64 = 0x07;
/// ARM-Thumb BCJ filter.
pub const FILTER_ID_BCJ_ARM_THUMB: u64 = 0x08;
/// SPARC BCJ filter.
pub const FILTER_ID_BCJ_SPARC: u64 = 0x09;
/// LZMA2, the only filter allowed in the chain's tail slot.
pub const FILTER_ID_LZMA2: u64 = 0x21;

/// Whether `id` may only appear in the tail (compressor) position of a chain.
pub const fn is_tail_only(id: u64) -> bool {
    id == FILTER_ID_LZMA2
}
