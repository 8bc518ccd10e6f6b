//! LZ77 match finding: hash-chain variants (HC3/HC4) over an in-memory
//! input window, with a nice-length early-out and bounded search depth.

use xzcodec_core::mem::MatchFinderKind;

/// Minimum match length LZMA ever encodes.
pub const MATCH_LEN_MIN: usize = 2;
/// Maximum match length LZMA can encode in one symbol.
pub const MATCH_LEN_MAX: usize = 273;

const HASH3_BITS: u32 = 16;
const HASH4_BITS: u32 = 20;

#[inline]
fn hash3(data: &[u8]) -> usize {
    let mut h = 2166136261u32;
    h ^= data[0] as u32;
    h = h.wrapping_mul(16777619);
    h ^= data[1] as u32;
    h = h.wrapping_mul(16777619);
    h ^= data[2] as u32;
    h = h.wrapping_mul(16777619);
    (h as usize) & ((1 << HASH3_BITS) - 1)
}

#[inline]
fn hash4(data: &[u8]) -> usize {
    let mut h = 2166136261u32;
    for &b in &data[..4] {
        h ^= b as u32;
        h = h.wrapping_mul(16777619);
    }
    (h as usize) & ((1 << HASH4_BITS) - 1)
}

/// A candidate match returned by the finder: `dist` is zero-based (LZMA's
/// wire encoding is `dist - 1`), `len` is the full matched run length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    /// Zero-based match distance (bytes back from the current position).
    pub dist: u32,
    /// Matched run length.
    pub len: u32,
}

/// Hash-chain match finder over a window held entirely in memory (the
/// encoder always has the whole input slice available, unlike the
/// decoder's streaming dictionary).
pub struct MatchFinder {
    depth: usize,
    nice_len: usize,
    dict_size: usize,
    head3: Vec<u32>,
    head4: Vec<u32>,
    chain: Vec<u32>,
}

const NIL: u32 = u32::MAX;

impl MatchFinder {
    /// Create a finder. `depth` bounds the number of chain links walked
    /// per lookup; `nice_len` is the length at which the search stops
    /// early because the match is "good enough".
    pub fn new(kind: MatchFinderKind, dict_size: usize, depth: usize, nice_len: usize) -> Self {
        let has3 = matches!(kind, MatchFinderKind::Hc3);
        Self {
            depth: depth.max(1),
            nice_len: nice_len.clamp(MATCH_LEN_MIN, MATCH_LEN_MAX),
            dict_size,
            head3: if has3 { vec![NIL; 1 << HASH3_BITS] } else { Vec::new() },
            head4: vec![NIL; 1 << HASH4_BITS],
            chain: Vec::new(),
        }
    }

    fn ensure_chain(&mut self, pos: usize) {
        if pos >= self.chain.len() {
            self.chain.resize(pos + 1, NIL);
        }
    }

    /// Insert position `pos` into the hash structures without searching
    /// for matches (used to fast-forward over bytes chosen as part of a
    /// match that was already committed to the output).
    pub fn insert(&mut self, data: &[u8], pos: usize) {
        self.ensure_chain(pos);
        if pos + 4 <= data.len() {
            let h4 = hash4(&data[pos..]);
            self.chain[pos] = self.head4[h4];
            self.head4[h4] = pos as u32;
        }
        if !self.head3.is_empty() && pos + 3 <= data.len() {
            let h3 = hash3(&data[pos..]);
            self.head3[h3] = pos as u32;
        }
    }

    fn match_len(data: &[u8], a: usize, b: usize, max_len: usize) -> usize {
        let mut len = 0;
        while len < max_len && data[a + len] == data[b + len] {
            len += 1;
        }
        len
    }

    /// Find candidate matches at `pos`, longest-so-far only (each returned
    /// entry strictly improves on the previous one's length), insert `pos`
    /// into the finder, and return the list ordered by increasing length.
    pub fn get_matches(&mut self, data: &[u8], pos: usize) -> Vec<Match> {
        let mut out = Vec::new();
        if pos + MATCH_LEN_MIN > data.len() {
            self.insert(data, pos);
            return out;
        }

        let max_len = (data.len() - pos).min(MATCH_LEN_MAX);
        let mut best_len = MATCH_LEN_MIN - 1;

        let start_chain_key = if !self.head4.is_empty() && pos + 4 <= data.len() {
            Some(hash4(&data[pos..]))
        } else if !self.head3.is_empty() && pos + 3 <= data.len() {
            Some(hash3(&data[pos..]))
        } else {
            None
        };

        if let Some(_) = start_chain_key {
            let mut cand = if !self.head4.is_empty() && pos + 4 <= data.len() {
                self.head4[hash4(&data[pos..])] as usize
            } else {
                self.head3[hash3(&data[pos..])] as usize
            };

            let mut depth = 0usize;
            while cand != NIL as usize && cand < pos && depth < self.depth {
                let dist = pos - cand;
                if dist > self.dict_size {
                    break;
                }
                let len = Self::match_len(data, pos, cand, max_len);
                if len > best_len {
                    best_len = len;
                    out.push(Match { dist: (dist - 1) as u32, len: len as u32 });
                    if len >= self.nice_len || len >= max_len {
                        break;
                    }
                }
                cand = if cand < self.chain.len() {
                    self.chain[cand] as usize
                } else {
                    NIL as usize
                };
                depth += 1;
            }
        }

        self.insert(data, pos);
        out
    }

    /// Advance past `n` bytes starting at `pos` without collecting matches
    /// (used once the parser commits to a match of that length), still
    /// inserting each position into the hash structures so later lookups
    /// can find them.
    pub fn skip(&mut self, data: &[u8], pos: usize, n: usize) {
        for i in 0..n {
            if pos + i < data.len() {
                self.insert(data, pos + i);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_repeated_pattern() {
        let data = b"abcdefabcdefabcdef";
        let mut mf = MatchFinder::new(MatchFinderKind::Hc4, 1 << 16, 32, 128);
        for i in 0..6 {
            mf.get_matches(data, i);
        }
        let matches = mf.get_matches(data, 6);
        assert!(matches.iter().any(|m| m.dist == 5 && m.len >= 6));
    }

    #[test]
    fn test_no_match_on_unique_data() {
        let data = b"abcdefghij";
        let mut mf = MatchFinder::new(MatchFinderKind::Hc4, 1 << 16, 32, 128);
        for i in 0..data.len() {
            let matches = mf.get_matches(data, i);
            assert!(matches.is_empty());
        }
    }

    #[test]
    fn test_skip_still_populates_chains() {
        let data = b"xyzxyzxyzxyz";
        let mut mf = MatchFinder::new(MatchFinderKind::Hc4, 1 << 16, 32, 128);
        mf.get_matches(data, 0);
        mf.skip(data, 1, 5);
        let matches = mf.get_matches(data, 6);
        assert!(!matches.is_empty());
    }
}
