//! Price-based optimal parsing: a forward dynamic program over a bounded
//! window that chooses, for every position, the literal/rep/match step
//! that minimizes total encoded bits, rather than a greedy "take the
//! first good match" heuristic.
//!
//! The price table (`PROB_PRICES`, `get_price`, `get_bit_tree_price`, the
//! length/distance pricing helpers) feeds the actual forward DP
//! (`OptimalParser::parse_window`), which wires those prices into a real
//! shortest-path computation over [`OPTS`] positions, tracking per-position
//! state/rep evolution.

use crate::match_finder::{MATCH_LEN_MAX, MATCH_LEN_MIN, MatchFinder};
use crate::model::{
    DIST_ALIGN_BITS, END_POS_MODEL_INDEX, LEN_HIGH_BITS, LEN_LOW_BITS, LEN_MID_BITS, LzmaModel,
    NUM_STATES, POS_STATES_MAX, State,
};
use crate::range_coder::{MOVE_BITS, PROB_BITS, PROB_INIT, PROB_MAX};

/// Size of the optimal-parsing lookahead window.
pub const OPTS: usize = 4096;

/// Price scale (prices are carried in 1/16th-bit units).
const PRICE_SCALE: u32 = 1 << 4;

/// Default "fast bytes" parameter (match length above which the parser
/// stops looking for anything better).
pub const FAST_BYTES_DEFAULT: u32 = 32;
/// Minimum accepted fast-bytes value.
pub const FAST_BYTES_MIN: u32 = 5;
/// Maximum accepted fast-bytes value.
pub const FAST_BYTES_MAX: u32 = 273;

/// Default "nice length": a match at least this long is taken immediately.
pub const NICE_LENGTH_DEFAULT: u32 = 64;
/// Minimum accepted nice-length value.
pub const NICE_LENGTH_MIN: u32 = 8;
/// Maximum accepted nice-length value.
pub const NICE_LENGTH_MAX: u32 = 273;

static PROB_PRICES: [u32; PROB_MAX as usize >> MOVE_BITS] = {
    let mut prices = [0u32; PROB_MAX as usize >> MOVE_BITS];
    let mut i = 0;
    while i < prices.len() {
        let w = (i << MOVE_BITS) + (1 << (MOVE_BITS - 1));
        let prob = w as u32;

        let mut val = prob;
        let mut result = 0u32;
        let mut bit = 0;
        while bit < 32 {
            val >>= 1;
            if val == 0 {
                break;
            }
            result += 1;
            bit += 1;
        }

        let base_price = if result < PROB_BITS {
            (PROB_BITS - result) * PRICE_SCALE
        } else {
            0
        };

        let frac = (prob >> (result.saturating_sub(1))) & ((1 << MOVE_BITS) - 1);
        prices[i] = base_price + (frac * PRICE_SCALE) / (1 << MOVE_BITS);

        i += 1;
    }
    prices
};

/// Price, in 1/16th-bit units, of encoding one adaptively-modeled bit.
#[inline]
pub fn get_price(prob: u16, bit: u32) -> u32 {
    let p = if bit == 0 { prob } else { PROB_MAX - prob };
    PROB_PRICES[(p >> MOVE_BITS) as usize]
}

/// Price of `count` fixed (50/50) bits.
#[inline]
pub fn get_direct_bits_price(count: u32) -> u32 {
    count * PRICE_SCALE
}

/// Price of encoding `symbol` through a forward bit tree.
pub fn get_bit_tree_price(probs: &[u16], num_bits: u32, symbol: u32) -> u32 {
    let mut price = 0u32;
    let mut m = 1usize;
    for i in (0..num_bits).rev() {
        let bit = (symbol >> i) & 1;
        price += get_price(probs[m], bit);
        m = (m << 1) | bit as usize;
    }
    price
}

/// Price of encoding `symbol` through a reverse bit tree.
pub fn get_bit_tree_reverse_price(probs: &[u16], num_bits: u32, symbol: u32) -> u32 {
    let mut price = 0u32;
    let mut m = 1usize;
    for i in 0..num_bits {
        let bit = (symbol >> i) & 1;
        price += get_price(probs[m], bit);
        m = (m << 1) | bit as usize;
    }
    price
}

/// Map a distance to its 6-bit slot, matching the decoder/encoder's
/// `get_dist_slot`.
#[inline]
pub fn get_dist_slot(dist: u32) -> u32 {
    if dist < 4 {
        return dist;
    }
    let bits = 32 - dist.leading_zeros();
    ((bits - 1) << 1) | ((dist >> (bits - 2)) & 1)
}

fn get_length_price(
    choice: u16,
    choice2: u16,
    low: &[[u16; 1 << LEN_LOW_BITS]],
    mid: &[[u16; 1 << LEN_MID_BITS]],
    high: &[u16; 1 << LEN_HIGH_BITS],
    len: u32,
    pos_state: usize,
) -> u32 {
    let len = len - MATCH_LEN_MIN as u32;
    let mut price = 0u32;
    if len < (1 << LEN_LOW_BITS) {
        price += get_price(choice, 0);
        price += get_bit_tree_price(&low[pos_state], LEN_LOW_BITS, len);
    } else if len < (1 << LEN_LOW_BITS) + (1 << LEN_MID_BITS) {
        price += get_price(choice, 1);
        price += get_price(choice2, 0);
        price += get_bit_tree_price(&mid[pos_state], LEN_MID_BITS, len - (1 << LEN_LOW_BITS));
    } else {
        price += get_price(choice, 1);
        price += get_price(choice2, 1);
        price += get_bit_tree_price(
            high,
            LEN_HIGH_BITS,
            len - (1 << LEN_LOW_BITS) - (1 << LEN_MID_BITS),
        );
    }
    price
}

fn get_distance_price(
    slot: &[[u16; 64]; 4],
    special: &[u16],
    align: &[u16; 1 << DIST_ALIGN_BITS],
    dist: u32,
    len: u32,
) -> u32 {
    let len_state = (len - MATCH_LEN_MIN as u32).min(3) as usize;
    let dist_slot = get_dist_slot(dist);
    let mut price = get_bit_tree_price(&slot[len_state], 6, dist_slot);

    if dist_slot >= 4 {
        let num_direct_bits = (dist_slot >> 1) - 1;
        let base = (2 | (dist_slot & 1)) << num_direct_bits;
        let dist_reduced = dist - base;

        if dist_slot < END_POS_MODEL_INDEX as u32 {
            let base_idx = (dist_slot as usize) - (dist_slot as usize >> 1) - 1;
            price += get_bit_tree_reverse_price(&special[base_idx..], num_direct_bits, dist_reduced);
        } else {
            let num_align_bits = DIST_ALIGN_BITS;
            let num_direct = num_direct_bits - num_align_bits;
            price += get_direct_bits_price(num_direct);
            price += get_bit_tree_reverse_price(
                align,
                num_align_bits,
                dist_reduced & ((1 << num_align_bits) - 1),
            );
        }
    }
    price
}

fn literal_price(model: &LzmaModel, lit_state: usize, state: State, rep0: u32, pos: usize, data: &[u8]) -> u32 {
    let byte = data[pos] as usize | 0x100;
    let mut price = 0u32;

    if state.is_literal() {
        let mut context = 1usize;
        let mut symbol = byte;
        loop {
            let bit = (symbol >> 7) & 1;
            symbol <<= 1;
            price += get_price(model.literal.probs[lit_state][context], bit as u32);
            context = (context << 1) | bit;
            if context >= 0x100 {
                break;
            }
        }
    } else {
        let match_byte = data[pos - rep0 as usize - 1] as usize;
        let mut match_symbol = match_byte << 1;
        let mut context = 1usize;
        let mut symbol = byte;
        loop {
            let match_bit = (match_symbol >> 8) & 1;
            match_symbol <<= 1;
            let bit = (symbol >> 7) & 1;
            symbol <<= 1;
            let prob_idx = 0x100 + (match_bit << 8) + context;
            price += get_price(model.literal.probs[lit_state][prob_idx], bit as u32);
            context = (context << 1) | bit;
            if context >= 0x100 {
                break;
            }
            if bit != match_bit {
                while context < 0x100 {
                    let bit = (symbol >> 7) & 1;
                    symbol <<= 1;
                    price += get_price(model.literal.probs[lit_state][context], bit as u32);
                    context = (context << 1) | bit;
                }
                break;
            }
        }
    }
    price
}

/// One decision the optimal parser made for a span of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Emit one literal byte.
    Literal,
    /// Emit a length-1 rep0 match (the "short rep" symbol).
    ShortRep,
    /// Emit a rep match using `rep_idx` (0-3) at `len`.
    Rep {
        /// Which of the four rep distances to reuse.
        rep_idx: u8,
        /// Match length.
        len: u32,
    },
    /// Emit a normal match at zero-based distance `dist`, length `len`.
    Match {
        /// Zero-based distance.
        dist: u32,
        /// Match length.
        len: u32,
    },
}

impl Decision {
    /// Bytes of input this decision consumes.
    pub fn len(&self) -> usize {
        match self {
            Decision::Literal | Decision::ShortRep => 1,
            Decision::Rep { len, .. } | Decision::Match { len, .. } => *len as usize,
        }
    }
}

#[derive(Clone, Copy)]
struct OptEntry {
    price: u32,
    pos_prev: usize,
    decision: Decision,
    state: State,
    reps: [u32; 4],
}

impl Default for OptEntry {
    fn default() -> Self {
        Self {
            price: u32::MAX,
            pos_prev: 0,
            decision: Decision::Literal,
            state: State::new(),
            reps: [0; 4],
        }
    }
}

/// Forward dynamic-program optimal parser.
pub struct OptimalParser {
    fast_bytes: u32,
    nice_length: u32,
    opts: Vec<OptEntry>,
}

impl OptimalParser {
    /// Create a parser with the given fast-bytes / nice-length tuning.
    pub fn new(fast_bytes: u32, nice_length: u32) -> Self {
        Self {
            fast_bytes: fast_bytes.clamp(FAST_BYTES_MIN, FAST_BYTES_MAX),
            nice_length: nice_length.clamp(NICE_LENGTH_MIN, NICE_LENGTH_MAX),
            opts: vec![OptEntry::default(); OPTS + MATCH_LEN_MAX + 1],
        }
    }

    /// `fast_bytes` tuning in effect.
    pub fn fast_bytes(&self) -> u32 {
        self.fast_bytes
    }

    /// `nice_length` tuning in effect.
    pub fn nice_length(&self) -> u32 {
        self.nice_length
    }

    /// Run the forward DP over up to [`OPTS`] positions starting at
    /// `start` in `data`, and return the chosen decision sequence covering
    /// the window actually solved (always non-empty when `start <
    /// data.len()`). `state`/`reps` are the encoder's state entering the
    /// window; `finder` supplies match candidates and is advanced to cover
    /// every position scanned.
    pub fn parse_window(
        &mut self,
        data: &[u8],
        start: usize,
        state: State,
        reps: [u32; 4],
        model: &LzmaModel,
        finder: &mut MatchFinder,
    ) -> Vec<Decision> {
        let remaining = data.len() - start;
        let window_len = remaining.min(OPTS);
        if window_len == 0 {
            return Vec::new();
        }

        for entry in self.opts[..=window_len].iter_mut() {
            *entry = OptEntry::default();
        }
        self.opts[0] = OptEntry {
            price: 0,
            pos_prev: 0,
            decision: Decision::Literal,
            state,
            reps,
        };

        let num_pos_states = model.props.num_pos_states();
        let pos_mask = num_pos_states - 1;

        for i in 0..window_len {
            if self.opts[i].price == u32::MAX {
                continue;
            }
            let cur = self.opts[i];
            let pos = start + i;
            let pos_state = pos & pos_mask;
            let state_idx = cur.state.value();
            let max_len = (data.len() - pos).min(MATCH_LEN_MAX);

            // Literal.
            {
                let lit_state = model.literal.get_state(
                    pos as u64,
                    if pos == 0 { 0 } else { data[pos - 1] },
                    model.props.lc,
                    model.props.lp,
                );
                let price = cur.price
                    + get_price(model.is_match[state_idx][pos_state], 0)
                    + literal_price(model, lit_state, cur.state, cur.reps[0], pos, data);
                let mut next_state = cur.state;
                next_state.update_literal();
                self.relax(i + 1, price, i, Decision::Literal, next_state, cur.reps);
            }

            // Rep matches (including short rep).
            for rep_idx in 0u8..4 {
                let dist = cur.reps[rep_idx as usize] as usize;
                if dist >= pos {
                    continue;
                }
                let src = pos - dist - 1;
                let mut len = 0usize;
                while len < max_len && data[pos + len] == data[src + len] {
                    len += 1;
                }
                if len == 0 {
                    continue;
                }

                if rep_idx == 0 && len == 1 {
                    let price = cur.price
                        + get_price(model.is_match[state_idx][pos_state], 1)
                        + get_price(model.is_rep[state_idx], 1)
                        + get_price(model.is_rep0[state_idx], 0)
                        + get_price(model.is_rep0_long[state_idx][pos_state], 0);
                    let mut next_state = cur.state;
                    next_state.update_short_rep();
                    self.relax(i + 1, price, i, Decision::ShortRep, next_state, cur.reps);
                    continue;
                }

                if len < MATCH_LEN_MIN {
                    continue;
                }

                let mut rep_select_price = get_price(model.is_match[state_idx][pos_state], 1)
                    + get_price(model.is_rep[state_idx], 1);
                rep_select_price += match rep_idx {
                    0 => get_price(model.is_rep0[state_idx], 0) + get_price(model.is_rep0_long[state_idx][pos_state], 1),
                    1 => get_price(model.is_rep0[state_idx], 1) + get_price(model.is_rep1[state_idx], 0),
                    2 => {
                        get_price(model.is_rep0[state_idx], 1)
                            + get_price(model.is_rep1[state_idx], 1)
                            + get_price(model.is_rep2[state_idx], 0)
                    }
                    _ => {
                        get_price(model.is_rep0[state_idx], 1)
                            + get_price(model.is_rep1[state_idx], 1)
                            + get_price(model.is_rep2[state_idx], 1)
                    }
                };

                let mut new_reps = cur.reps;
                let d = new_reps[rep_idx as usize];
                for j in (1..=rep_idx as usize).rev() {
                    new_reps[j] = new_reps[j - 1];
                }
                new_reps[0] = d;

                for l in MATCH_LEN_MIN..=len {
                    let len_price = get_length_price(
                        model.rep_len.choice,
                        model.rep_len.choice2,
                        &model.rep_len.low,
                        &model.rep_len.mid,
                        &model.rep_len.high,
                        l as u32,
                        pos_state,
                    );
                    let price = cur.price + rep_select_price + len_price;
                    let mut next_state = cur.state;
                    next_state.update_long_rep();
                    self.relax(
                        i + l,
                        price,
                        i,
                        Decision::Rep { rep_idx, len: l as u32 },
                        next_state,
                        new_reps,
                    );
                }
            }

            // Normal matches.
            let matches = finder.get_matches(data, pos);
            let match_select_price =
                get_price(model.is_match[state_idx][pos_state], 1) + get_price(model.is_rep[state_idx], 0);
            for m in &matches {
                let top_len = (m.len as usize).min(max_len);
                for l in MATCH_LEN_MIN..=top_len {
                    let len_price = get_length_price(
                        model.match_len.choice,
                        model.match_len.choice2,
                        &model.match_len.low,
                        &model.match_len.mid,
                        &model.match_len.high,
                        l as u32,
                        pos_state,
                    );
                    let dist_price = get_distance_price(
                        &model.distance.slot,
                        &model.distance.special,
                        &model.distance.align,
                        m.dist,
                        l as u32,
                    );
                    let price = cur.price + match_select_price + len_price + dist_price;
                    let mut next_state = cur.state;
                    next_state.update_match();
                    let new_reps = [m.dist, cur.reps[0], cur.reps[1], cur.reps[2]];
                    self.relax(
                        i + l,
                        price,
                        i,
                        Decision::Match { dist: m.dist, len: l as u32 },
                        next_state,
                        new_reps,
                    );
                }
                if m.len as usize >= self.nice_length as usize {
                    break;
                }
            }
        }

        // Backtrack from window_len to 0.
        let mut decisions = Vec::new();
        let mut i = window_len;
        while i > 0 {
            let entry = self.opts[i];
            decisions.push(entry.decision);
            i = entry.pos_prev;
        }
        decisions.reverse();
        decisions
    }

    fn relax(
        &mut self,
        to: usize,
        price: u32,
        from: usize,
        decision: Decision,
        state: State,
        reps: [u32; 4],
    ) {
        if to >= self.opts.len() {
            return;
        }
        if price < self.opts[to].price {
            self.opts[to] = OptEntry {
                price,
                pos_prev: from,
                decision,
                state,
                reps,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LzmaProperties;
    use xzcodec_core::mem::MatchFinderKind;

    #[test]
    fn test_price_calculation() {
        let price = get_price(PROB_INIT, 0);
        assert!((14..=18).contains(&price));
    }

    #[test]
    fn test_direct_bits_price() {
        assert_eq!(get_direct_bits_price(8), 8 * PRICE_SCALE);
    }

    #[test]
    fn test_dist_slot() {
        assert_eq!(get_dist_slot(0), 0);
        assert_eq!(get_dist_slot(4), 4);
        assert_eq!(get_dist_slot(5), 4);
        assert_eq!(get_dist_slot(6), 5);
    }

    #[test]
    fn test_parser_clamping() {
        let parser = OptimalParser::new(1, 1);
        assert_eq!(parser.fast_bytes(), FAST_BYTES_MIN);
        assert_eq!(parser.nice_length(), NICE_LENGTH_MIN);
    }

    #[test]
    fn test_parse_window_covers_whole_small_input() {
        let data = b"abcabcabcabcabc";
        let model = LzmaModel::new(LzmaProperties::default());
        let mut finder = MatchFinder::new(MatchFinderKind::Hc4, 1 << 16, 32, 128);
        let mut parser = OptimalParser::new(32, 64);
        let decisions = parser.parse_window(data, 0, State::new(), [0; 4], &model, &mut finder);
        let total: usize = decisions.iter().map(|d| d.len()).sum();
        assert_eq!(total, data.len());
    }
}
