//! Delta filter: byte-wise differencing against a fixed distance back,
//! with a 256-byte ring history.
//!
//! The ring-index arithmetic (`pos` counts down, wrapping via `u8`) mirrors
//! `delta_coder.c`'s `encode_buffer`/`decode_buffer` exactly, rather than the
//! simpler `i % distance`-indexed history some Rust ports use — both give
//! the same stream of outputs, but this one matches the bit-for-bit state
//! layout of the original.

use crate::filter::Filter;
use crate::ids::FILTER_ID_DELTA;
use xzcodec_core::action::{Action, Input, Output, Status};
use xzcodec_core::error::{Result, XzError};

/// Minimum delta distance.
pub const DISTANCE_MIN: usize = 1;
/// Maximum delta distance.
pub const DISTANCE_MAX: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Encode,
    Decode,
}

/// Byte-wise delta filter, usable as either the encoder or the decoder side
/// depending on construction.
#[derive(Debug)]
pub struct DeltaFilter {
    distance: usize,
    history: [u8; 256],
    pos: u8,
    direction: Direction,
}

impl DeltaFilter {
    fn new(distance: usize, direction: Direction) -> Result<Self> {
        if !(DISTANCE_MIN..=DISTANCE_MAX).contains(&distance) {
            return Err(XzError::options(format!(
                "delta distance {distance} out of range [1, 256]"
            )));
        }
        Ok(Self {
            distance,
            history: [0u8; 256],
            pos: 0,
            direction,
        })
    }

    /// Create the encoding side for the given distance (1..=256).
    pub fn encoder(distance: usize) -> Result<Self> {
        Self::new(distance, Direction::Encode)
    }

    /// Create the decoding side for the given distance (1..=256).
    pub fn decoder(distance: usize) -> Result<Self> {
        Self::new(distance, Direction::Decode)
    }

    #[inline]
    fn step(&mut self, byte: u8) -> u8 {
        let idx = (self.pos as usize + self.distance) & 0xFF;
        let out = match self.direction {
            Direction::Encode => {
                let tmp = self.history[idx];
                self.history[self.pos as usize] = byte;
                byte.wrapping_sub(tmp)
            }
            Direction::Decode => {
                let tmp = self.history[idx];
                let out = byte.wrapping_add(tmp);
                self.history[self.pos as usize] = out;
                out
            }
        };
        self.pos = self.pos.wrapping_sub(1);
        out
    }
}

impl Filter for DeltaFilter {
    fn filter_id(&self) -> u64 {
        FILTER_ID_DELTA
    }

    fn code(&mut self, input: &mut Input, output: &mut Output, action: Action) -> Result<Status> {
        let n = input.remaining_len();
        for i in 0..n {
            let byte = input.remaining()[i];
            output.push(self.step(byte));
        }
        input.advance(n);
        match action {
            Action::Finish if input.is_empty() => Ok(Status::StreamEnd),
            _ => Ok(Status::Ok),
        }
    }

    fn memory_usage(&self) -> u64 {
        256 + std::mem::size_of::<Self>() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(filter: &mut DeltaFilter, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut input = Input::new(data);
        let mut output = Output::new(&mut out);
        filter.code(&mut input, &mut output, Action::Finish).unwrap();
        out
    }

    #[test]
    fn test_distance_rejected_out_of_range() {
        assert!(DeltaFilter::encoder(0).is_err());
        assert!(DeltaFilter::encoder(257).is_err());
        assert!(DeltaFilter::encoder(1).is_ok());
        assert!(DeltaFilter::encoder(256).is_ok());
    }

    #[test]
    fn test_roundtrip_preserves_length_and_data() {
        let original: Vec<u8> = (0..200).map(|i| (i * 7 % 251) as u8).collect();
        for distance in [1usize, 2, 4, 17, 256] {
            let mut enc = DeltaFilter::encoder(distance).unwrap();
            let encoded = run(&mut enc, &original);
            assert_eq!(encoded.len(), original.len());

            let mut dec = DeltaFilter::decoder(distance).unwrap();
            let decoded = run(&mut dec, &encoded);
            assert_eq!(decoded, original, "distance {distance} roundtrip mismatch");
        }
    }

    #[test]
    fn test_constant_stride_data_becomes_near_zero() {
        // With distance == stride, a linear ramp becomes a constant delta.
        let original: Vec<u8> = (0..40u8).collect();
        let mut enc = DeltaFilter::encoder(1).unwrap();
        let encoded = run(&mut enc, &original);
        assert_eq!(encoded[0], 0);
        assert!(encoded[1..].iter().all(|&b| b == 1));
    }
}
