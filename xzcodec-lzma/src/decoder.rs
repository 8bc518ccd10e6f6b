//! LZMA1 decompression, resumable at symbol granularity.
//!
//! Unlike the original `Read`-based decoder, [`LzmaDecoder`] decodes one
//! full symbol (a literal byte, or a match/rep copy) per call to
//! [`LzmaDecoder::decode_symbol`], from an in-memory slice the caller has
//! staged. Callers (the LZMA2 chunk layer and the raw LZMA1 facade) keep at
//! least [`LOOKAHEAD_MAX`] bytes staged before calling, which is always
//! enough for one symbol's worth of range-coder bits; this gives the
//! streaming `Action`/`Status` API a clean suspend point between symbols
//! without needing to track bit-level decode position the way a true
//! incremental bit-stream reader would.

use crate::dictionary::Dictionary;
use crate::model::{
    DIST_ALIGN_BITS, END_POS_MODEL_INDEX, LEN_HIGH_BITS, LEN_LOW_BITS, LEN_MID_BITS, LengthModel,
    LzmaModel, LzmaProperties, MATCH_LEN_MIN, State,
};
use crate::range_coder::{ByteCursor, RangeDecoder};
use xzcodec_core::error::{Result, XzError};

/// Maximum bytes a single symbol decode can consume from the compressed
/// stream. LZMA's worst case is a long-rep/match distance+length decode;
/// 64 bytes is a generous upper bound with headroom for the range coder's
/// own renormalization bytes.
pub const LOOKAHEAD_MAX: usize = 64;

/// Outcome of decoding a single symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// A literal byte or match/rep copy was decoded and appended to the
    /// output; the payload carries how many compressed bytes were consumed.
    Symbol(usize),
    /// The LZMA1 end-of-stream marker (distance `0xFFFF_FFFF`) was decoded.
    EndMarker(usize),
}

fn decode_bit_tree(
    rc: &mut RangeDecoder,
    probs: &mut [u16],
    num_bits: u32,
    cursor: &mut ByteCursor<'_>,
) -> Result<u32> {
    rc.decode_bit_tree(probs, num_bits, cursor)
}

fn decode_length(
    rc: &mut RangeDecoder,
    len_model: &mut LengthModel,
    pos_state: usize,
    cursor: &mut ByteCursor<'_>,
) -> Result<u32> {
    if rc.decode_bit(&mut len_model.choice, cursor)? == 0 {
        let len = decode_bit_tree(rc, &mut len_model.low[pos_state], LEN_LOW_BITS, cursor)?;
        Ok(len + MATCH_LEN_MIN as u32)
    } else if rc.decode_bit(&mut len_model.choice2, cursor)? == 0 {
        let len = decode_bit_tree(rc, &mut len_model.mid[pos_state], LEN_MID_BITS, cursor)?;
        Ok(len + MATCH_LEN_MIN as u32 + (1 << LEN_LOW_BITS))
    } else {
        let len = decode_bit_tree(rc, &mut len_model.high, LEN_HIGH_BITS, cursor)?;
        Ok(len + MATCH_LEN_MIN as u32 + (1 << LEN_LOW_BITS) + (1 << LEN_MID_BITS))
    }
}

/// LZMA1 decoder state machine, resumable at symbol granularity.
pub struct LzmaDecoder {
    rc: RangeDecoder,
    rc_initialized: bool,
    model: LzmaModel,
    dict: Dictionary,
    state: State,
    rep: [u32; 4],
    bytes_decoded: u64,
}

impl LzmaDecoder {
    /// Create a decoder with the given properties and dictionary capacity.
    pub fn new(props: LzmaProperties, dict_size: u32) -> Self {
        Self {
            rc: RangeDecoder::new(),
            rc_initialized: false,
            model: LzmaModel::new(props),
            dict: Dictionary::new(dict_size.max(4096) as usize),
            state: State::new(),
            rep: [0; 4],
            bytes_decoded: 0,
        }
    }

    /// Borrow the underlying output history (used by LZMA2's "no dictionary
    /// reset" chunk handling to carry history across chunk boundaries).
    pub fn dictionary(&self) -> &Dictionary {
        &self.dict
    }

    /// Replace the dictionary (used when LZMA2 changes dict size between
    /// streams, or to inject a preset dictionary).
    pub fn set_dictionary(&mut self, dict: Dictionary) {
        self.dict = dict;
    }

    /// Total bytes decoded since the last dictionary reset.
    pub fn bytes_decoded(&self) -> u64 {
        self.bytes_decoded
    }

    /// Reset the probability models and match/rep state (LZMA2 "state
    /// reset"), without touching the dictionary.
    pub fn reset_state(&mut self, props: LzmaProperties) {
        self.model = LzmaModel::new(props);
        self.state = State::new();
        self.rep = [0; 4];
        self.rc_initialized = false;
    }

    /// Reset the dictionary (LZMA2 "dictionary reset"). Does not touch the
    /// probability models.
    pub fn reset_dictionary(&mut self) {
        self.dict.reset();
        self.bytes_decoded = 0;
    }

    fn get_byte(&self, dist: u32) -> Result<u8> {
        self.dict.byte_at_distance(dist as usize + 1)
    }

    fn decode_literal(&mut self, cursor: &mut ByteCursor<'_>) -> Result<u8> {
        let prev_byte = self.dict.prev_byte();
        let lit_state = self.model.literal.get_state(
            self.bytes_decoded,
            prev_byte,
            self.model.props.lc,
            self.model.props.lp,
        );

        if self.state.is_literal() {
            let mut symbol = 1usize;
            loop {
                let bit = self
                    .rc
                    .decode_bit(&mut self.model.literal.probs[lit_state][symbol], cursor)?;
                symbol = (symbol << 1) | bit as usize;
                if symbol >= 0x100 {
                    break;
                }
            }
            Ok((symbol - 0x100) as u8)
        } else {
            let mut match_byte = self.get_byte(self.rep[0])? as usize;
            let mut symbol = 1usize;
            loop {
                let match_bit = (match_byte >> 7) & 1;
                match_byte <<= 1;
                let prob_idx = 0x100 + (match_bit << 8) + symbol;
                let bit = self
                    .rc
                    .decode_bit(&mut self.model.literal.probs[lit_state][prob_idx], cursor)?;
                symbol = (symbol << 1) | bit as usize;
                if symbol >= 0x100 {
                    break;
                }
                if bit as usize != match_bit {
                    while symbol < 0x100 {
                        let bit = self
                            .rc
                            .decode_bit(&mut self.model.literal.probs[lit_state][symbol], cursor)?;
                        symbol = (symbol << 1) | bit as usize;
                    }
                    break;
                }
            }
            Ok((symbol - 0x100) as u8)
        }
    }

    fn decode_distance(&mut self, len: u32, cursor: &mut ByteCursor<'_>) -> Result<u32> {
        let len_state = (len - MATCH_LEN_MIN as u32).min(3) as usize;
        let slot = decode_bit_tree(&mut self.rc, &mut self.model.distance.slot[len_state], 6, cursor)?;

        if slot < 4 {
            return Ok(slot);
        }

        let num_direct_bits = (slot >> 1) - 1;
        let mut dist = (2 | (slot & 1)) << num_direct_bits;

        if (slot as usize) < END_POS_MODEL_INDEX {
            let base_idx = (slot as usize) - (slot as usize >> 1) - 1;
            let mut result = 0u32;
            let mut m = 1usize;
            for i in 0..num_direct_bits {
                let bit = self
                    .rc
                    .decode_bit(&mut self.model.distance.special[base_idx + m - 1], cursor)?;
                m = (m << 1) | bit as usize;
                result |= bit << i;
            }
            dist += result;
        } else {
            let num_align_bits = DIST_ALIGN_BITS;
            let num_direct = num_direct_bits - num_align_bits;
            let direct = self.rc.decode_direct_bits(num_direct, cursor)?;
            dist += direct << num_align_bits;
            let align = self
                .rc
                .decode_bit_tree_reverse(&mut self.model.distance.align, num_align_bits, cursor)?;
            dist += align;
        }

        Ok(dist)
    }

    /// Decode exactly one symbol from `input`, appending decoded bytes to
    /// `output`. Returns how many bytes of `input` were consumed. `input`
    /// must hold at least [`LOOKAHEAD_MAX`] bytes unless this is the final
    /// tail of the stream.
    pub fn decode_symbol(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<DecodeOutcome> {
        let mut cursor = ByteCursor::new(input);
        if !self.rc_initialized {
            self.rc.init(&mut cursor)?;
            self.rc_initialized = true;
        }

        let pos_state = (self.bytes_decoded as usize) & (self.model.props.num_pos_states() - 1);
        let state_idx = self.state.value();

        let is_match = self
            .rc
            .decode_bit(&mut self.model.is_match[state_idx][pos_state], &mut cursor)?;

        if is_match == 0 {
            let byte = self.decode_literal(&mut cursor)?;
            self.dict.write_byte(byte);
            output.push(byte);
            self.bytes_decoded += 1;
            self.state.update_literal();
            return Ok(DecodeOutcome::Symbol(cursor.consumed()));
        }

        let is_rep = self.rc.decode_bit(&mut self.model.is_rep[state_idx], &mut cursor)?;

        let (len, dist) = if is_rep == 0 {
            let len = decode_length(&mut self.rc, &mut self.model.match_len, pos_state, &mut cursor)?;
            let dist = self.decode_distance(len, &mut cursor)?;

            self.rep[3] = self.rep[2];
            self.rep[2] = self.rep[1];
            self.rep[1] = self.rep[0];
            self.rep[0] = dist;

            if dist == 0xFFFF_FFFF {
                return Ok(DecodeOutcome::EndMarker(cursor.consumed()));
            }

            self.state.update_match();
            (len, dist)
        } else {
            let is_rep0 = self.rc.decode_bit(&mut self.model.is_rep0[state_idx], &mut cursor)?;

            if is_rep0 == 0 {
                let is_rep0_long = self
                    .rc
                    .decode_bit(&mut self.model.is_rep0_long[state_idx][pos_state], &mut cursor)?;

                if is_rep0_long == 0 {
                    let dist = self.rep[0];
                    let byte = self.get_byte(dist)?;
                    self.dict.write_byte(byte);
                    output.push(byte);
                    self.bytes_decoded += 1;
                    self.state.update_short_rep();
                    return Ok(DecodeOutcome::Symbol(cursor.consumed()));
                }

                self.state.update_long_rep();
                let len =
                    decode_length(&mut self.rc, &mut self.model.rep_len, pos_state, &mut cursor)?;
                (len, self.rep[0])
            } else {
                let is_rep1 = self.rc.decode_bit(&mut self.model.is_rep1[state_idx], &mut cursor)?;

                let dist = if is_rep1 == 0 {
                    self.rep.swap(0, 1);
                    self.rep[0]
                } else {
                    let is_rep2 = self.rc.decode_bit(&mut self.model.is_rep2[state_idx], &mut cursor)?;
                    if is_rep2 == 0 {
                        let d = self.rep[2];
                        self.rep[2] = self.rep[1];
                        self.rep[1] = self.rep[0];
                        self.rep[0] = d;
                        d
                    } else {
                        let d = self.rep[3];
                        self.rep[3] = self.rep[2];
                        self.rep[2] = self.rep[1];
                        self.rep[1] = self.rep[0];
                        self.rep[0] = d;
                        d
                    }
                };

                self.state.update_long_rep();
                let len =
                    decode_length(&mut self.rc, &mut self.model.rep_len, pos_state, &mut cursor)?;
                (len, dist)
            }
        };

        if dist as usize >= self.dict.len() {
            return Err(XzError::data(self.bytes_decoded, "match distance exceeds available history"));
        }

        self.dict.copy_match(dist as usize + 1, len as usize, output)?;
        self.bytes_decoded += len as u64;

        Ok(DecodeOutcome::Symbol(cursor.consumed()))
    }
}

/// Decompress a raw LZMA1 stream (no header) given its properties and
/// dictionary size, decoding until the end-of-stream marker or until
/// `unpacked_size` bytes have been produced (whichever is declared).
pub fn decompress_raw(
    data: &[u8],
    props: LzmaProperties,
    dict_size: u32,
    unpacked_size: Option<u64>,
) -> Result<Vec<u8>> {
    let mut decoder = LzmaDecoder::new(props, dict_size);
    let mut output = Vec::new();
    let mut pos = 0usize;
    loop {
        if let Some(limit) = unpacked_size {
            if output.len() as u64 >= limit {
                break;
            }
        }
        let remaining = &data[pos..];
        if remaining.is_empty() {
            if unpacked_size.is_some() {
                return Err(XzError::data(pos as u64, "truncated LZMA1 stream"));
            }
            break;
        }
        match decoder.decode_symbol(remaining, &mut output)? {
            DecodeOutcome::Symbol(n) => pos += n,
            DecodeOutcome::EndMarker(n) => {
                pos += n;
                break;
            }
        }
    }
    Ok(output)
}

/// Decompress a `.lzma`-style header (properties byte + 4-byte LE dict
/// size + 8-byte LE uncompressed size, `0xFFFF_FFFF_FFFF_FFFF` meaning
/// unknown) followed by a raw LZMA1 stream, as produced by
/// [`crate::encoder::compress`].
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < 13 {
        return Err(XzError::header("truncated LZMA header"));
    }
    let props = LzmaProperties::from_byte(data[0])
        .ok_or_else(|| XzError::header("invalid LZMA properties byte"))?;
    let dict_size = u32::from_le_bytes(data[1..5].try_into().unwrap());
    let unpacked_raw = u64::from_le_bytes(data[5..13].try_into().unwrap());
    let unpacked_size = if unpacked_raw == u64::MAX {
        None
    } else {
        Some(unpacked_raw)
    };
    decompress_raw(&data[13..], props, dict_size, unpacked_size)
}
