//! # xzcodec-lzma
//!
//! LZMA1/LZMA2 compression and decompression: the range coder, probability
//! models, match finder, optimal parser, and LZMA2 chunk framing that sit
//! underneath the XZ container format.
//!
//! ## Features
//!
//! - **Pure Rust** implementation
//! - Single-pass, in-memory compression and streaming, symbol-at-a-time
//!   decompression
//! - A forward dynamic-programming optimal parser alongside hash-chain
//!   match finding
//! - LZMA2 chunking with all four reset modes (none / state / state+props /
//!   state+props+dictionary)
//!
//! ## Usage
//!
//! ### Decompression
//!
//! ```ignore
//! use xzcodec_lzma::decompress;
//!
//! let compressed = include_bytes!("data.lzma");
//! let decompressed = decompress(compressed)?;
//! ```
//!
//! ### Compression
//!
//! ```ignore
//! use xzcodec_lzma::{compress, LzmaLevel};
//!
//! let data = b"Hello, World!";
//! let compressed = compress(data, LzmaLevel::DEFAULT)?;
//! ```
//!
//! ## LZMA1 stream format
//!
//! A `.lzma`-style LZMA1 stream consists of:
//! 1. Properties byte (lc, lp, pb encoded)
//! 2. Dictionary size (4 bytes, little-endian)
//! 3. Uncompressed size (8 bytes, little-endian, `0xFFFF_FFFF_FFFF_FFFF` = unknown)
//! 4. Compressed data
//!
//! The algorithm uses:
//! - LZ77-style dictionary compression with a sliding window
//! - Range coding for entropy encoding
//! - Context-dependent probability models

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod decoder;
pub mod dictionary;
pub mod encoder;
pub mod lzma2;
pub mod match_finder;
pub mod model;
pub mod optimal;
pub mod range_coder;

// Re-exports
pub use decoder::{DecodeOutcome, LzmaDecoder, decompress, decompress_raw};
pub use encoder::{EncoderTuning, LzmaEncoder, compress, compress_raw};
pub use lzma2::{
    Lzma2Decoder, Lzma2Encoder, ResetMode, decode_lzma2, dict_size_from_props, encode_lzma2,
    props_from_dict_size,
};
pub use match_finder::{Match, MatchFinder};
pub use model::{LzmaModel, LzmaProperties, State};
pub use range_coder::{ByteCursor, RangeDecoder, RangeEncoder};

use xzcodec_core::error::Result;
use xzcodec_core::mem::MatchFinderKind;

/// LZMA compression level (0 = fastest, 9 = best), mapped to a dictionary
/// size and [`EncoderTuning`] preset the way `xz`'s `-0`..`-9` flags are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LzmaLevel(u8);

impl LzmaLevel {
    /// Fastest compression (level 0).
    pub const FAST: Self = Self(0);
    /// Default compression (level 6).
    pub const DEFAULT: Self = Self(6);
    /// Best compression (level 9).
    pub const BEST: Self = Self(9);

    /// Create a new compression level, clamped to `0..=9`.
    pub fn new(level: u8) -> Self {
        Self(level.min(9))
    }

    /// Get the level value.
    pub fn level(&self) -> u8 {
        self.0
    }

    /// Dictionary size used at this level.
    pub fn dict_size(&self) -> u32 {
        match self.0 {
            0 => 1 << 16, // 64 KB
            1 => 1 << 18, // 256 KB
            2 => 1 << 19, // 512 KB
            3 => 1 << 20, // 1 MB
            4 => 1 << 21, // 2 MB
            5 => 1 << 22, // 4 MB
            6 => 1 << 23, // 8 MB
            7 => 1 << 24, // 16 MB
            8 => 1 << 25, // 32 MB
            _ => 1 << 26, // 64 MB
        }
    }

    /// Match finder and optimal-parser tuning used at this level.
    pub fn tuning(&self) -> EncoderTuning {
        match self.0 {
            0..=2 => EncoderTuning::fastest(),
            3..=6 => EncoderTuning::default_preset(),
            _ => EncoderTuning::strongest(),
        }
    }
}

impl Default for LzmaLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Decompress an LZMA1 stream (with its `.lzma`-style header) to a `Vec`.
pub fn decompress_bytes(data: &[u8]) -> Result<Vec<u8>> {
    decompress(data)
}

/// Compress data to a `Vec` using default settings.
pub fn compress_bytes(data: &[u8]) -> Result<Vec<u8>> {
    compress(data, LzmaLevel::DEFAULT.dict_size())
}

/// Compress data as an LZMA2 stream at the given level.
pub fn compress_lzma2(data: &[u8], level: LzmaLevel) -> Result<Vec<u8>> {
    encode_lzma2(data, level.dict_size(), level.tuning())
}

/// Decompress an LZMA2 stream given the dictionary size used to encode it.
pub fn decompress_lzma2(data: &[u8], dict_size: u32) -> Result<Vec<u8>> {
    decode_lzma2(data, dict_size)
}

// MatchFinderKind is re-exported through xzcodec_core for callers building
// a custom EncoderTuning.
pub use xzcodec_core::mem::MatchFinderKind as FinderKind;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level() {
        assert_eq!(LzmaLevel::FAST.level(), 0);
        assert_eq!(LzmaLevel::DEFAULT.level(), 6);
        assert_eq!(LzmaLevel::BEST.level(), 9);
    }

    #[test]
    fn test_level_clamp() {
        assert_eq!(LzmaLevel::new(100).level(), 9);
    }

    #[test]
    fn test_dict_size() {
        assert_eq!(LzmaLevel::FAST.dict_size(), 1 << 16);
        assert_eq!(LzmaLevel::DEFAULT.dict_size(), 1 << 23);
        assert_eq!(LzmaLevel::BEST.dict_size(), 1 << 26);
    }

    #[test]
    fn test_tuning_scales_with_level() {
        assert_eq!(LzmaLevel::FAST.tuning().finder_kind, MatchFinderKind::Hc4);
        assert_eq!(LzmaLevel::BEST.tuning().finder_kind, MatchFinderKind::Hc4);
        assert!(LzmaLevel::BEST.tuning().depth > LzmaLevel::FAST.tuning().depth);
    }

    #[test]
    fn test_properties_roundtrip() {
        let props = LzmaProperties::new(3, 0, 2);
        let byte = props.to_byte();
        let decoded = LzmaProperties::from_byte(byte).unwrap();

        assert_eq!(decoded.lc, 3);
        assert_eq!(decoded.lp, 0);
        assert_eq!(decoded.pb, 2);
    }

    #[test]
    fn test_compress_decompress_single_byte() {
        let original = b"A";
        let compressed = compress(original, LzmaLevel::DEFAULT.dict_size()).unwrap();
        let decompressed = decompress_bytes(&compressed).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn test_compress_decompress_roundtrip() {
        let original = b"Hello, LZMA World! This is a test of compression and decompression.";
        let compressed = compress(original, LzmaLevel::DEFAULT.dict_size()).unwrap();
        let decompressed = decompress_bytes(&compressed).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn test_compress_decompress_empty() {
        let original: &[u8] = b"";
        let compressed = compress(original, LzmaLevel::DEFAULT.dict_size()).unwrap();
        let decompressed = decompress_bytes(&compressed).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn test_compress_decompress_repeated() {
        let original = vec![b'A'; 1000];
        let compressed = compress(&original, LzmaLevel::DEFAULT.dict_size()).unwrap();
        let decompressed = decompress_bytes(&compressed).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn test_lzma2_roundtrip_at_each_level() {
        let data = b"Hello World! This is a test of LZMA compression with various levels.";
        for level in 0..=9 {
            let level = LzmaLevel::new(level);
            let compressed = compress_lzma2(data, level).unwrap();
            let decompressed = decompress_lzma2(&compressed, level.dict_size()).unwrap();
            assert_eq!(&decompressed[..], &data[..], "level {} roundtrip failed", level.level());
        }
    }
}
