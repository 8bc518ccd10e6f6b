//! Sliding dictionary (history buffer) shared by the match finder and the
//! LZMA decoder's output history.
//!
//! Supports capacities that need not be a power of two: LZMA2's
//! dictionary-size encoding (`(2 | (b & 1)) << ((b >> 1) + 11)`) produces
//! values like `3 * 2^20` that a power-of-2 mask cannot index. Position
//! arithmetic here uses `%` against `capacity` instead of `& mask`.

use xzcodec_core::error::{Result, XzError};

/// A circular history buffer of up to `capacity` recently-emitted bytes.
#[derive(Debug, Clone)]
pub struct Dictionary {
    buffer: Vec<u8>,
    capacity: usize,
    /// Next write position (wraps modulo `capacity`).
    pos: usize,
    /// Number of valid bytes currently held (saturates at `capacity`).
    len: usize,
    /// Total bytes ever written (used for distance validation: a match may
    /// not reach before the start of the stream).
    total_written: u64,
}

impl Dictionary {
    /// Create a dictionary with the given capacity (bytes).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: vec![0u8; capacity],
            capacity,
            pos: 0,
            len: 0,
            total_written: 0,
        }
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes of valid history currently held.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether any bytes have been written yet.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total bytes ever written since construction/last full reset.
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Reset to empty (LZMA2 full dictionary reset).
    pub fn reset(&mut self) {
        self.pos = 0;
        self.len = 0;
        self.total_written = 0;
    }

    /// Preload a preset dictionary (raw mode only). Only the last
    /// `capacity` bytes are retained if `preset` is larger.
    pub fn preload(&mut self, preset: &[u8]) {
        let data = if preset.len() > self.capacity {
            &preset[preset.len() - self.capacity..]
        } else {
            preset
        };
        for &byte in data {
            self.write_byte(byte);
        }
        // Preset bytes are history, not stream output: don't count them
        // against total_written so the first real match must still stay
        // within the true stream start for distance validation purposes
        // relative to emitted output. (They ARE valid match targets,
        // tracked via `len`.)
        self.total_written = 0;
    }

    /// Append one byte to the history.
    #[inline]
    pub fn write_byte(&mut self, byte: u8) {
        self.buffer[self.pos] = byte;
        self.pos += 1;
        if self.pos == self.capacity {
            self.pos = 0;
        }
        if self.len < self.capacity {
            self.len += 1;
        }
        self.total_written += 1;
    }

    /// Read the byte at `distance` (1 = most recently written byte).
    pub fn byte_at_distance(&self, distance: usize) -> Result<u8> {
        if distance == 0 || distance > self.len {
            return Err(XzError::data(0, "match distance exceeds available history"));
        }
        let index = (self.pos + self.capacity - distance) % self.capacity;
        Ok(self.buffer[index])
    }

    /// Copy `length` bytes starting `distance` back into `output`,
    /// simultaneously appending them to the dictionary (so overlapping
    /// copies where `length > distance` correctly repeat, as LZ77 requires).
    pub fn copy_match(&mut self, distance: usize, length: usize, output: &mut Vec<u8>) -> Result<()> {
        if distance == 0 || distance > self.len {
            return Err(XzError::data(0, "match distance exceeds available history"));
        }
        output.reserve(length);
        let mut src = (self.pos + self.capacity - distance) % self.capacity;
        for _ in 0..length {
            let byte = self.buffer[src];
            output.push(byte);
            self.write_byte(byte);
            src += 1;
            if src == self.capacity {
                src = 0;
            }
        }
        Ok(())
    }

    /// Borrow the most recent byte (the "previous byte" used to select a
    /// literal-coder context bank), or `0` if the dictionary is empty
    /// (matching LZMA's convention at the very start of a stream).
    pub fn prev_byte(&self) -> u8 {
        if self.len == 0 {
            0
        } else {
            self.byte_at_distance(1).unwrap_or(0)
        }
    }
}
