//! LZMA1 compression, driven by the forward-DP optimal parser.
//!
//! [`LzmaEncoder`] always parses through [`OptimalParser`] rather than a
//! greedy/heuristic match selector; match-finder depth/nice-length still
//! vary by preset, so "fast" presets simply get a shallower, earlier-exiting
//! search rather than a different parsing algorithm.

use crate::match_finder::{MATCH_LEN_MIN, MatchFinder};
use crate::model::{
    DIST_ALIGN_BITS, END_POS_MODEL_INDEX, LEN_HIGH_BITS, LEN_LOW_BITS, LEN_MID_BITS, LengthModel,
    LzmaModel, LzmaProperties, State,
};
use crate::optimal::{Decision, OptimalParser};
use crate::range_coder::RangeEncoder;
use xzcodec_core::error::Result;
use xzcodec_core::mem::MatchFinderKind;

fn encode_bit_tree(rc: &mut RangeEncoder, probs: &mut [u16], num_bits: u32, value: u32) {
    rc.encode_bit_tree(probs, num_bits, value);
}

fn encode_length(rc: &mut RangeEncoder, len_model: &mut LengthModel, len: u32, pos_state: usize) {
    let len = len - MATCH_LEN_MIN as u32;
    if len < (1 << LEN_LOW_BITS) {
        rc.encode_bit(&mut len_model.choice, 0);
        encode_bit_tree(rc, &mut len_model.low[pos_state], LEN_LOW_BITS, len);
    } else if len < (1 << LEN_LOW_BITS) + (1 << LEN_MID_BITS) {
        rc.encode_bit(&mut len_model.choice, 1);
        rc.encode_bit(&mut len_model.choice2, 0);
        encode_bit_tree(
            rc,
            &mut len_model.mid[pos_state],
            LEN_MID_BITS,
            len - (1 << LEN_LOW_BITS),
        );
    } else {
        rc.encode_bit(&mut len_model.choice, 1);
        rc.encode_bit(&mut len_model.choice2, 1);
        encode_bit_tree(
            rc,
            &mut len_model.high,
            LEN_HIGH_BITS,
            len - (1 << LEN_LOW_BITS) - (1 << LEN_MID_BITS),
        );
    }
}

fn get_dist_slot(dist: u32) -> u32 {
    if dist < 4 {
        return dist;
    }
    let bits = 32 - dist.leading_zeros();
    ((bits - 1) << 1) | ((dist >> (bits - 2)) & 1)
}

/// Match-finder and optimal-parser tuning for one compression preset.
#[derive(Debug, Clone, Copy)]
pub struct EncoderTuning {
    /// Match-finder family.
    pub finder_kind: MatchFinderKind,
    /// Maximum chain/tree search depth per position.
    pub depth: usize,
    /// Match length at which the search stops early.
    pub nice_length: u32,
    /// `fast_bytes` passed to the optimal parser.
    pub fast_bytes: u32,
}

impl EncoderTuning {
    /// Tuning used by the default preset (6).
    pub fn default_preset() -> Self {
        Self {
            finder_kind: MatchFinderKind::Hc4,
            depth: 128,
            nice_length: 64,
            fast_bytes: 64,
        }
    }

    /// Tuning for the fastest preset (0).
    pub fn fastest() -> Self {
        Self {
            finder_kind: MatchFinderKind::Hc4,
            depth: 4,
            nice_length: 16,
            fast_bytes: 16,
        }
    }

    /// Tuning for the strongest preset (9 / 9|EXTREME).
    pub fn strongest() -> Self {
        Self {
            finder_kind: MatchFinderKind::Hc4,
            depth: 512,
            nice_length: 273,
            fast_bytes: 273,
        }
    }
}

/// LZMA1 encoder. Always runs the full input through the optimal parser
/// (see module docs); callers needing raw-buffer LZMA1 use
/// [`LzmaEncoder::compress_all`].
pub struct LzmaEncoder {
    rc: RangeEncoder,
    model: LzmaModel,
    state: State,
    rep: [u32; 4],
    finder: MatchFinder,
    parser: OptimalParser,
    dict_size: usize,
}

impl LzmaEncoder {
    /// Create an encoder with the given properties, dictionary size, and
    /// match-finder/parser tuning.
    pub fn with_tuning(props: LzmaProperties, dict_size: u32, tuning: EncoderTuning) -> Self {
        let dict_size = dict_size.max(4096) as usize;
        Self {
            rc: RangeEncoder::new(),
            model: LzmaModel::new(props),
            state: State::new(),
            rep: [0; 4],
            finder: MatchFinder::new(tuning.finder_kind, dict_size, tuning.depth, tuning.nice_length as usize),
            parser: OptimalParser::new(tuning.fast_bytes, tuning.nice_length),
            dict_size,
        }
    }

    /// Create an encoder using the default preset's tuning.
    pub fn new(props: LzmaProperties, dict_size: u32) -> Self {
        Self::with_tuning(props, dict_size, EncoderTuning::default_preset())
    }

    /// Properties this encoder is using.
    pub fn properties(&self) -> LzmaProperties {
        self.model.props
    }

    /// Configured dictionary size.
    pub fn dict_size(&self) -> u32 {
        self.dict_size as u32
    }

    fn encode_literal(&mut self, pos: usize, data: &[u8]) {
        let byte = data[pos];
        let prev_byte = if pos == 0 { 0 } else { data[pos - 1] };
        let lit_state =
            self.model
                .literal
                .get_state(pos as u64, prev_byte, self.model.props.lc, self.model.props.lp);

        if self.state.is_literal() {
            let mut symbol = (byte as usize) | 0x100;
            let mut context = 1usize;
            loop {
                let bit = (symbol >> 7) & 1;
                symbol <<= 1;
                self.rc
                    .encode_bit(&mut self.model.literal.probs[lit_state][context], bit as u32);
                context = (context << 1) | bit;
                if context >= 0x100 {
                    break;
                }
            }
        } else {
            let match_byte = data[pos - self.rep[0] as usize - 1] as usize;
            let mut match_symbol = match_byte << 1;
            let mut symbol = (byte as usize) | 0x100;
            let mut context = 1usize;
            loop {
                let match_bit = (match_symbol >> 8) & 1;
                match_symbol <<= 1;
                let bit = (symbol >> 7) & 1;
                symbol <<= 1;
                let prob_idx = 0x100 + (match_bit << 8) + context;
                self.rc
                    .encode_bit(&mut self.model.literal.probs[lit_state][prob_idx], bit as u32);
                context = (context << 1) | bit;
                if context >= 0x100 {
                    break;
                }
                if bit != match_bit {
                    while context < 0x100 {
                        let bit = (symbol >> 7) & 1;
                        symbol <<= 1;
                        self.rc
                            .encode_bit(&mut self.model.literal.probs[lit_state][context], bit as u32);
                        context = (context << 1) | bit;
                    }
                    break;
                }
            }
        }
    }

    fn encode_distance(&mut self, dist: u32, len: u32) {
        let len_state = (len - MATCH_LEN_MIN as u32).min(3) as usize;
        let slot = get_dist_slot(dist);
        encode_bit_tree(&mut self.rc, &mut self.model.distance.slot[len_state], 6, slot);

        if slot >= 4 {
            let num_direct_bits = (slot >> 1) - 1;
            let base = (2 | (slot & 1)) << num_direct_bits;
            let dist_reduced = dist - base;

            if slot < END_POS_MODEL_INDEX as u32 {
                let base_idx = (slot as usize) - (slot as usize >> 1) - 1;
                self.rc.encode_bit_tree_reverse(
                    &mut self.model.distance.special[base_idx..],
                    num_direct_bits,
                    dist_reduced,
                );
            } else {
                let num_align_bits = DIST_ALIGN_BITS;
                let num_direct = num_direct_bits - num_align_bits;
                self.rc.encode_direct_bits(dist_reduced >> num_align_bits, num_direct);
                self.rc.encode_bit_tree_reverse(
                    &mut self.model.distance.align,
                    num_align_bits,
                    dist_reduced & ((1 << num_align_bits) - 1),
                );
            }
        }
    }

    fn apply_decision(&mut self, pos: usize, data: &[u8], decision: Decision) {
        let pos_state = pos & (self.model.props.num_pos_states() - 1);
        let state_idx = self.state.value();

        match decision {
            Decision::Literal => {
                self.rc.encode_bit(&mut self.model.is_match[state_idx][pos_state], 0);
                self.encode_literal(pos, data);
                self.state.update_literal();
            }
            Decision::ShortRep => {
                self.rc.encode_bit(&mut self.model.is_match[state_idx][pos_state], 1);
                self.rc.encode_bit(&mut self.model.is_rep[state_idx], 1);
                self.rc.encode_bit(&mut self.model.is_rep0[state_idx], 0);
                self.rc
                    .encode_bit(&mut self.model.is_rep0_long[state_idx][pos_state], 0);
                self.state.update_short_rep();
            }
            Decision::Rep { rep_idx, len } => {
                self.rc.encode_bit(&mut self.model.is_match[state_idx][pos_state], 1);
                self.rc.encode_bit(&mut self.model.is_rep[state_idx], 1);

                if rep_idx == 0 {
                    self.rc.encode_bit(&mut self.model.is_rep0[state_idx], 0);
                    self.rc
                        .encode_bit(&mut self.model.is_rep0_long[state_idx][pos_state], 1);
                } else {
                    self.rc.encode_bit(&mut self.model.is_rep0[state_idx], 1);
                    if rep_idx == 1 {
                        self.rc.encode_bit(&mut self.model.is_rep1[state_idx], 0);
                    } else {
                        self.rc.encode_bit(&mut self.model.is_rep1[state_idx], 1);
                        self.rc
                            .encode_bit(&mut self.model.is_rep2[state_idx], if rep_idx == 2 { 0 } else { 1 });
                    }
                    let d = self.rep[rep_idx as usize];
                    for j in (1..=rep_idx as usize).rev() {
                        self.rep[j] = self.rep[j - 1];
                    }
                    self.rep[0] = d;
                }

                encode_length(&mut self.rc, &mut self.model.rep_len, len, pos_state);
                self.state.update_long_rep();
            }
            Decision::Match { dist, len } => {
                self.rc.encode_bit(&mut self.model.is_match[state_idx][pos_state], 1);
                self.rc.encode_bit(&mut self.model.is_rep[state_idx], 0);

                encode_length(&mut self.rc, &mut self.model.match_len, len, pos_state);
                self.encode_distance(dist, len);

                self.rep[3] = self.rep[2];
                self.rep[2] = self.rep[1];
                self.rep[1] = self.rep[0];
                self.rep[0] = dist;
                self.state.update_match();
            }
        }
    }

    /// Compress `data` in full, appending the LZMA1 end-of-stream marker,
    /// and return the raw compressed payload (no header).
    pub fn compress_all(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        self.compress_all_inner(data, true)
    }

    /// Compress `data` in full without the end-of-stream marker, for a
    /// caller (LZMA2 chunk framing) that delimits the payload by its own
    /// declared size and so never needs the marker symbol.
    pub(crate) fn compress_all_without_marker(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        self.compress_all_inner(data, false)
    }

    fn compress_all_inner(&mut self, data: &[u8], write_end_marker: bool) -> Result<Vec<u8>> {
        self.rc.write_prologue();

        let mut pos = 0usize;
        while pos < data.len() {
            let decisions =
                self.parser
                    .parse_window(data, pos, self.state, self.rep, &self.model, &mut self.finder);
            for decision in decisions {
                let len = decision.len();
                self.apply_decision(pos, data, decision);
                pos += len;
            }
        }

        if write_end_marker {
            let pos_state = pos & (self.model.props.num_pos_states() - 1);
            let state_idx = self.state.value();
            self.rc.encode_bit(&mut self.model.is_match[state_idx][pos_state], 1);
            self.rc.encode_bit(&mut self.model.is_rep[state_idx], 0);
            encode_length(
                &mut self.rc,
                &mut self.model.match_len,
                MATCH_LEN_MIN as u32,
                pos_state,
            );
            self.encode_distance(0xFFFF_FFFF, MATCH_LEN_MIN as u32);
        }

        self.rc.flush();
        Ok(self.rc.take_output())
    }
}

/// Compress `data` with a full LZMA1 header (properties byte, 4-byte
/// dictionary size, 8-byte uncompressed size), as the `.lzma` container
/// (LZMA_Alone) expects.
pub fn compress(data: &[u8], dict_size: u32) -> Result<Vec<u8>> {
    let props = LzmaProperties::default();
    let mut encoder = LzmaEncoder::new(props, dict_size);

    let mut output = Vec::new();
    output.push(props.to_byte());
    output.extend_from_slice(&encoder.dict_size().to_le_bytes());
    output.extend_from_slice(&(data.len() as u64).to_le_bytes());
    output.extend_from_slice(&encoder.compress_all(data)?);
    Ok(output)
}

/// Compress `data` as a headerless LZMA1 stream with the given properties
/// and dictionary size, for embedding inside a larger container (e.g. an
/// XZ block) that carries its own framing.
pub fn compress_raw(data: &[u8], props: LzmaProperties, dict_size: u32) -> Result<Vec<u8>> {
    LzmaEncoder::new(props, dict_size).compress_all(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{DecodeOutcome, LzmaDecoder};

    fn roundtrip(data: &[u8]) {
        let props = LzmaProperties::default();
        let mut enc = LzmaEncoder::new(props, 1 << 16);
        let compressed = enc.compress_all(data).unwrap();

        let mut dec = LzmaDecoder::new(props, 1 << 16);
        let mut output = Vec::new();
        let mut pos = 0usize;
        loop {
            let remaining = &compressed[pos..];
            if remaining.is_empty() {
                break;
            }
            match dec.decode_symbol(remaining, &mut output).unwrap() {
                DecodeOutcome::Symbol(n) => pos += n,
                DecodeOutcome::EndMarker(n) => {
                    pos += n;
                    break;
                }
            }
        }
        assert_eq!(output, data);
    }

    #[test]
    fn test_roundtrip_repetitive() {
        roundtrip(b"the quick brown fox jumps over the lazy dog. the quick brown fox jumps again.");
    }

    #[test]
    fn test_roundtrip_empty() {
        roundtrip(b"");
    }

    #[test]
    fn test_roundtrip_single_byte() {
        roundtrip(b"x");
    }

    #[test]
    fn test_roundtrip_binary() {
        let data: Vec<u8> = (0..=255u8).cycle().take(2000).collect();
        roundtrip(&data);
    }

    #[test]
    fn test_tuning_presets_distinct() {
        let fastest = EncoderTuning::fastest();
        let strongest = EncoderTuning::strongest();
        assert!(strongest.depth > fastest.depth);
        assert!(strongest.nice_length > fastest.nice_length);
    }
}
