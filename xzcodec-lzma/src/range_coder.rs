//! Range coder: the binary arithmetic coding core of LZMA.
//!
//! The encoder buffers its own output (carry propagation needs to rewrite
//! already-"emitted" bytes, so it accumulates into an internal `Vec` that
//! the caller drains). The decoder is a pure state machine over an
//! explicit byte cursor supplied by the caller on every call, so callers
//! only invoke decoder methods once enough bytes are staged (see
//! `decoder.rs`'s `LOOKAHEAD_MAX` staging buffer) — this module itself
//! never has to represent a mid-bit "need more input" state.

use xzcodec_core::error::{Result, XzError};

/// Number of bits in the probability model.
pub const PROB_BITS: u32 = 11;

/// Probability representing 50% (1024 out of 2048).
pub const PROB_INIT: u16 = 1 << (PROB_BITS - 1);

/// Maximum probability value (2048).
pub const PROB_MAX: u16 = 1 << PROB_BITS;

/// Shift applied on every probability update.
pub const MOVE_BITS: u32 = 5;

/// Renormalization threshold.
const TOP_VALUE: u32 = 1 << 24;

/// A byte cursor into a staged-input buffer, shared by all range-decoder
/// primitives for one symbol decode.
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    /// Wrap `data`, starting at offset 0.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes consumed so far.
    pub fn consumed(&self) -> usize {
        self.pos
    }

    fn next_byte(&mut self) -> Result<u8> {
        let byte = self
            .data
            .get(self.pos)
            .copied()
            .ok_or_else(|| XzError::data(self.pos as u64, "unexpected end of LZMA payload"))?;
        self.pos += 1;
        Ok(byte)
    }
}

/// Binary range decoder.
#[derive(Debug, Clone)]
pub struct RangeDecoder {
    range: u32,
    code: u32,
}

impl RangeDecoder {
    /// Create a decoder; call [`RangeDecoder::init`] before decoding.
    pub fn new() -> Self {
        Self {
            range: 0xFFFF_FFFF,
            code: 0,
        }
    }

    /// Read the 5-byte range-coder prologue (a zero byte followed by the
    /// big-endian initial `code`). `cursor` must have at least 5 bytes
    /// available.
    pub fn init(&mut self, cursor: &mut ByteCursor<'_>) -> Result<()> {
        let first = cursor.next_byte()?;
        if first != 0 {
            return Err(XzError::header("LZMA stream must start with a zero byte"));
        }
        let mut code = 0u32;
        for _ in 0..4 {
            code = (code << 8) | cursor.next_byte()? as u32;
        }
        self.range = 0xFFFF_FFFF;
        self.code = code;
        Ok(())
    }

    #[inline]
    fn normalize(&mut self, cursor: &mut ByteCursor<'_>) -> Result<()> {
        if self.range < TOP_VALUE {
            self.range <<= 8;
            self.code = (self.code << 8) | cursor.next_byte()? as u32;
        }
        Ok(())
    }

    /// Decode one adaptively-modeled bit.
    pub fn decode_bit(&mut self, prob: &mut u16, cursor: &mut ByteCursor<'_>) -> Result<u32> {
        self.normalize(cursor)?;
        let bound = (self.range >> PROB_BITS) * (*prob as u32);
        if self.code < bound {
            self.range = bound;
            *prob += (PROB_MAX - *prob) >> MOVE_BITS;
            Ok(0)
        } else {
            self.range -= bound;
            self.code -= bound;
            *prob -= *prob >> MOVE_BITS;
            Ok(1)
        }
    }

    /// Decode one fixed (50/50) probability bit.
    pub fn decode_direct_bit(&mut self, cursor: &mut ByteCursor<'_>) -> Result<u32> {
        self.normalize(cursor)?;
        self.range >>= 1;
        self.code = self.code.wrapping_sub(self.range);
        let bit = (self.code as i32) >> 31;
        self.code = self.code.wrapping_add(self.range & bit as u32);
        Ok((bit + 1) as u32 & 1)
    }

    /// Decode `count` fixed-probability bits, MSB first.
    pub fn decode_direct_bits(&mut self, count: u32, cursor: &mut ByteCursor<'_>) -> Result<u32> {
        let mut result = 0u32;
        for _ in 0..count {
            result = (result << 1) | self.decode_direct_bit(cursor)?;
        }
        Ok(result)
    }

    /// Decode a forward bit-tree symbol.
    pub fn decode_bit_tree(
        &mut self,
        probs: &mut [u16],
        num_bits: u32,
        cursor: &mut ByteCursor<'_>,
    ) -> Result<u32> {
        let mut index = 1usize;
        for _ in 0..num_bits {
            let bit = self.decode_bit(&mut probs[index], cursor)?;
            index = (index << 1) | bit as usize;
        }
        Ok((index as u32) - (1 << num_bits))
    }

    /// Decode a reverse bit-tree symbol (LSB path chosen first, as used by
    /// the alignment coder and short distance slots).
    pub fn decode_bit_tree_reverse(
        &mut self,
        probs: &mut [u16],
        num_bits: u32,
        cursor: &mut ByteCursor<'_>,
    ) -> Result<u32> {
        let mut index = 1usize;
        let mut result = 0u32;
        for i in 0..num_bits {
            let bit = self.decode_bit(&mut probs[index], cursor)?;
            index = (index << 1) | bit as usize;
            result |= bit << i;
        }
        Ok(result)
    }

    /// Whether the decoder has consumed its terminating state (all zero
    /// `code`), as the end-of-payload marker / chunk boundary leaves it.
    pub fn is_finished_ok(&self) -> bool {
        self.code == 0
    }
}

impl Default for RangeDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Binary range encoder. Accumulates output into an internal buffer that
/// the caller drains via [`RangeEncoder::take_output`], since carry
/// propagation can rewrite bytes already considered "emitted".
#[derive(Debug, Clone)]
pub struct RangeEncoder {
    output: Vec<u8>,
    range: u32,
    low: u64,
    cache: u8,
    cache_size: u64,
}

impl RangeEncoder {
    /// Create a new range encoder.
    pub fn new() -> Self {
        Self {
            output: Vec::new(),
            range: 0xFFFF_FFFF,
            low: 0,
            cache: 0,
            cache_size: 1,
        }
    }

    /// Bytes produced so far but not yet drained.
    pub fn pending_len(&self) -> usize {
        self.output.len()
    }

    /// Drain and return all output produced so far.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }

    fn shift_low(&mut self) {
        if self.low < 0xFF00_0000 || self.low > 0xFFFF_FFFF {
            let mut tmp = self.cache;
            let carry = (self.low >> 32) as u8;
            loop {
                self.output.push(tmp.wrapping_add(carry));
                tmp = 0xFF;
                self.cache_size -= 1;
                if self.cache_size == 0 {
                    break;
                }
            }
            self.cache = (self.low >> 24) as u8;
        }
        self.cache_size += 1;
        self.low = (self.low << 8) & 0xFFFF_FFFF;
    }

    #[inline]
    fn normalize(&mut self) {
        if self.range < TOP_VALUE {
            self.range <<= 8;
            self.shift_low();
        }
    }

    /// Encode one adaptively-modeled bit.
    pub fn encode_bit(&mut self, prob: &mut u16, bit: u32) {
        let bound = (self.range >> PROB_BITS) * (*prob as u32);
        if bit == 0 {
            self.range = bound;
            *prob += (PROB_MAX - *prob) >> MOVE_BITS;
        } else {
            self.low += bound as u64;
            self.range -= bound;
            *prob -= *prob >> MOVE_BITS;
        }
        self.normalize();
    }

    /// Encode one fixed (50/50) probability bit.
    pub fn encode_direct_bit(&mut self, bit: u32) {
        self.range >>= 1;
        if bit != 0 {
            self.low += self.range as u64;
        }
        self.normalize();
    }

    /// Encode `count` fixed-probability bits, MSB first.
    pub fn encode_direct_bits(&mut self, value: u32, count: u32) {
        for i in (0..count).rev() {
            self.encode_direct_bit((value >> i) & 1);
        }
    }

    /// Encode a forward bit-tree symbol.
    pub fn encode_bit_tree(&mut self, probs: &mut [u16], num_bits: u32, value: u32) {
        let mut index = 1usize;
        for i in (0..num_bits).rev() {
            let bit = (value >> i) & 1;
            self.encode_bit(&mut probs[index], bit);
            index = (index << 1) | bit as usize;
        }
    }

    /// Encode a reverse bit-tree symbol.
    pub fn encode_bit_tree_reverse(&mut self, probs: &mut [u16], num_bits: u32, value: u32) {
        let mut index = 1usize;
        for i in 0..num_bits {
            let bit = (value >> i) & 1;
            self.encode_bit(&mut probs[index], bit);
            index = (index << 1) | bit as usize;
        }
    }

    /// Write the 5-byte prologue (zero byte + initial `low` window).
    /// Must be called exactly once before any bit is encoded.
    pub fn write_prologue(&mut self) {
        self.output.push(0);
    }

    /// Flush all pending carry bytes. Call once at end of stream/chunk.
    pub fn flush(&mut self) {
        for _ in 0..5 {
            self.shift_low();
        }
    }
}

impl Default for RangeEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prob_constants() {
        assert_eq!(PROB_INIT, 1024);
        assert_eq!(PROB_MAX, 2048);
    }

    #[test]
    fn test_encode_decode_bits_roundtrip() {
        let mut enc = RangeEncoder::new();
        enc.write_prologue();
        let mut prob = PROB_INIT;
        let bits = [0u32, 1, 0, 1, 1, 1, 0, 0];
        for &b in &bits {
            enc.encode_bit(&mut prob, b);
        }
        enc.flush();
        let data = enc.take_output();

        let mut dec = RangeDecoder::new();
        let mut cursor = ByteCursor::new(&data);
        dec.init(&mut cursor).unwrap();
        let mut prob = PROB_INIT;
        for &b in &bits {
            assert_eq!(dec.decode_bit(&mut prob, &mut cursor).unwrap(), b);
        }
    }

    #[test]
    fn test_direct_bits_roundtrip() {
        let mut enc = RangeEncoder::new();
        enc.write_prologue();
        enc.encode_direct_bits(0b10110, 5);
        enc.flush();
        let data = enc.take_output();

        let mut dec = RangeDecoder::new();
        let mut cursor = ByteCursor::new(&data);
        dec.init(&mut cursor).unwrap();
        assert_eq!(dec.decode_direct_bits(5, &mut cursor).unwrap(), 0b10110);
    }

    #[test]
    fn test_bit_tree_roundtrip() {
        let mut enc = RangeEncoder::new();
        enc.write_prologue();
        let mut probs = [PROB_INIT; 8];
        enc.encode_bit_tree(&mut probs, 3, 5);
        enc.flush();
        let data = enc.take_output();

        let mut dec = RangeDecoder::new();
        let mut cursor = ByteCursor::new(&data);
        dec.init(&mut cursor).unwrap();
        let mut probs = [PROB_INIT; 8];
        assert_eq!(dec.decode_bit_tree(&mut probs, 3, &mut cursor).unwrap(), 5);
    }

    #[test]
    fn test_bit_tree_reverse_roundtrip() {
        let mut enc = RangeEncoder::new();
        enc.write_prologue();
        let mut probs = [PROB_INIT; 16];
        enc.encode_bit_tree_reverse(&mut probs, 4, 9);
        enc.flush();
        let data = enc.take_output();

        let mut dec = RangeDecoder::new();
        let mut cursor = ByteCursor::new(&data);
        dec.init(&mut cursor).unwrap();
        let mut probs = [PROB_INIT; 16];
        assert_eq!(
            dec.decode_bit_tree_reverse(&mut probs, 4, &mut cursor).unwrap(),
            9
        );
    }
}
