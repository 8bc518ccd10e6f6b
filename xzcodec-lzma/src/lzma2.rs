//! LZMA2 chunked framing atop LZMA1.
//!
//! Control-byte handling and the per-chunk decode loop live in one module
//! built on the resumable [`LzmaDecoder`]/[`LzmaEncoder`]. Chunk boundaries
//! are the unit of resumability here: a caller decoding a stream
//! incrementally stages one chunk's compressed bytes (at most 64 KiB, per
//! [`control::LZMA_CHUNK_MAX_COMPRESSED`]) before calling
//! [`Lzma2Decoder::decode_chunk`], which then runs the byte-cursor-based
//! LZMA1 decoder to completion for that chunk.

use crate::decoder::{DecodeOutcome, LzmaDecoder};
use crate::encoder::{EncoderTuning, LzmaEncoder};
use crate::model::LzmaProperties;
use xzcodec_core::error::{Result, XzError};

/// Control-byte constants and bit layout for the LZMA2 chunk header.
pub mod control {
    /// End of stream.
    pub const EOS: u8 = 0x00;
    /// Uncompressed chunk, dictionary reset.
    pub const UNCOMPRESSED_RESET: u8 = 0x01;
    /// Uncompressed chunk, no reset.
    pub const UNCOMPRESSED: u8 = 0x02;
    /// Bit 7: this is an LZMA-compressed chunk.
    pub const LZMA_MASK: u8 = 0x80;
    /// Bits 5-6: the 2-bit reset-type field (0-3) — see [`ResetMode`].
    pub const RESET_SHIFT: u32 = 5;
    pub(crate) const RESET_FIELD_MASK: u8 = 0x3;
    /// Bits 0-4: high 5 bits of `uncompressed_size - 1`.
    pub const SIZE_HIGH_MASK: u8 = 0x1F;

    /// Maximum uncompressed bytes a single LZMA chunk may represent.
    pub const LZMA_CHUNK_MAX_UNCOMPRESSED: usize = 1 << 21;
    /// Maximum compressed bytes a single LZMA chunk may occupy.
    pub const LZMA_CHUNK_MAX_COMPRESSED: usize = 1 << 16;
    /// Maximum bytes a single uncompressed chunk may hold.
    pub const UNCOMPRESSED_CHUNK_MAX: usize = 1 << 16;

    #[inline]
    pub(crate) const fn is_lzma(ctrl: u8) -> bool {
        ctrl & LZMA_MASK != 0
    }
}

/// The four LZMA2 compressed-chunk reset modes, encoded in control-byte
/// bits 5-6 (liblzma's `lzma_lzma2_control` values 0-3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetMode {
    /// No reset: continue the previous chunk's state, reps, and dictionary.
    None,
    /// Reset the probability model and state/reps; keep the dictionary.
    State,
    /// Reset state and read a new properties byte; keep the dictionary.
    StateAndProps,
    /// Reset state, read new properties, and reset the dictionary.
    StatePropsAndDict,
}

impl ResetMode {
    fn from_control(ctrl: u8) -> Self {
        let field = (ctrl >> control::RESET_SHIFT) & control::RESET_FIELD_MASK;
        match field {
            0 => ResetMode::None,
            1 => ResetMode::State,
            2 => ResetMode::StateAndProps,
            _ => ResetMode::StatePropsAndDict,
        }
    }

    fn control_bits(self) -> u8 {
        let field: u8 = match self {
            ResetMode::None => 0,
            ResetMode::State => 1,
            ResetMode::StateAndProps => 2,
            ResetMode::StatePropsAndDict => 3,
        };
        field << control::RESET_SHIFT
    }

    fn reads_new_props(self) -> bool {
        matches!(self, ResetMode::StateAndProps | ResetMode::StatePropsAndDict)
    }
}

/// Derive the LZMA2 dictionary size from its one-byte properties encoding:
/// `(2 | (b & 1)) << ((b >> 1) + 11)`, saturating to `u32::MAX` at `b = 40`.
pub fn dict_size_from_props(props: u8) -> u32 {
    if props >= 40 {
        return 0xFFFF_FFFF;
    }
    let base = 2 | (props as u32 & 1);
    let shift = (props as u32 / 2) + 11;
    base << shift
}

/// Find the smallest LZMA2 properties byte whose decoded dictionary size is
/// at least `dict_size`.
pub fn props_from_dict_size(dict_size: u32) -> u8 {
    for props in 0..=40u8 {
        if dict_size_from_props(props) >= dict_size {
            return props;
        }
    }
    40
}

/// Resumable LZMA2 decoder: decodes one chunk at a time, carrying
/// dictionary and model state across chunk boundaries per each chunk's
/// reset flags.
pub struct Lzma2Decoder {
    dict_size: u32,
    inner: Option<LzmaDecoder>,
    props: LzmaProperties,
    finished: bool,
}

impl Lzma2Decoder {
    /// Create a decoder for a stream using the given LZMA2 dictionary size.
    pub fn new(dict_size: u32) -> Self {
        Self {
            dict_size,
            inner: None,
            props: LzmaProperties::default(),
            finished: false,
        }
    }

    /// Whether the end-of-stream control byte has been seen.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn ensure_inner(&mut self) -> &mut LzmaDecoder {
        if self.inner.is_none() {
            self.inner = Some(LzmaDecoder::new(self.props, self.dict_size));
        }
        self.inner.as_mut().unwrap()
    }

    /// Decode one chunk (its control byte plus body) from the front of
    /// `input`, appending decompressed bytes to `output`. Returns the
    /// number of bytes of `input` consumed. `input` must hold the chunk's
    /// entire header + body (uncompressed chunks: up to 3 + 65536 bytes;
    /// compressed chunks: up to 6 + 65536 bytes).
    pub fn decode_chunk(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<usize> {
        if self.finished {
            return Ok(0);
        }
        let ctrl = *input
            .first()
            .ok_or_else(|| XzError::data(0, "empty LZMA2 chunk"))?;

        if ctrl == control::EOS {
            self.finished = true;
            return Ok(1);
        }

        if !control::is_lzma(ctrl) {
            let reset_dict = ctrl == control::UNCOMPRESSED_RESET;
            if ctrl != control::UNCOMPRESSED_RESET && ctrl != control::UNCOMPRESSED {
                return Err(XzError::data(0, "invalid LZMA2 control byte"));
            }
            let size_bytes = input
                .get(1..3)
                .ok_or_else(|| XzError::data(0, "truncated LZMA2 uncompressed chunk header"))?;
            let size = ((size_bytes[0] as usize) << 8 | size_bytes[1] as usize) + 1;
            let body = input
                .get(3..3 + size)
                .ok_or_else(|| XzError::data(0, "truncated LZMA2 uncompressed chunk body"))?;

            let props = self.props;
            let decoder = self.ensure_inner();
            if reset_dict {
                decoder.reset_dictionary();
            }
            let mut dict = decoder.dictionary().clone();
            for &b in body {
                dict.write_byte(b);
            }
            decoder.set_dictionary(dict);
            // An uncompressed chunk carries no probability state; the next
            // compressed chunk is required to declare a state reset.
            decoder.reset_state(props);
            output.extend_from_slice(body);

            return Ok(3 + size);
        }

        // Compressed chunk.
        let header = input
            .get(0..5)
            .ok_or_else(|| XzError::data(0, "truncated LZMA2 chunk header"))?;
        let unc_size = (((ctrl & control::SIZE_HIGH_MASK) as usize) << 16
            | (header[1] as usize) << 8
            | header[2] as usize)
            + 1;
        let comp_size = ((header[3] as usize) << 8 | header[4] as usize) + 1;

        let reset = ResetMode::from_control(ctrl);
        let mut header_len = 5;
        if reset.reads_new_props() {
            let byte = *input
                .get(5)
                .ok_or_else(|| XzError::data(0, "truncated LZMA2 properties byte"))?;
            header_len += 1;
            self.props = LzmaProperties::from_byte(byte)
                .ok_or_else(|| XzError::data(0, "invalid LZMA2 properties byte"))?;
        }

        let body = input
            .get(header_len..header_len + comp_size)
            .ok_or_else(|| XzError::data(0, "truncated LZMA2 chunk body"))?;

        let props = self.props;
        let decoder = self.ensure_inner();
        if reset == ResetMode::StatePropsAndDict {
            decoder.reset_dictionary();
        }
        if reset != ResetMode::None {
            decoder.reset_state(props);
        }

        let before = output.len();
        let mut pos = 0usize;
        loop {
            if output.len() - before >= unc_size {
                break;
            }
            let remaining = &body[pos..];
            if remaining.is_empty() {
                return Err(XzError::data(0, "LZMA2 chunk ended before declared size"));
            }
            match decoder.decode_symbol(remaining, output)? {
                DecodeOutcome::Symbol(n) => pos += n,
                DecodeOutcome::EndMarker(_) => {
                    return Err(XzError::data(0, "unexpected LZMA1 end marker inside LZMA2 chunk"));
                }
            }
        }

        Ok(header_len + comp_size)
    }

    /// Decode a complete LZMA2 stream in one call.
    pub fn decode_all(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut pos = 0;
        while !self.finished {
            let consumed = self.decode_chunk(&input[pos..], &mut output)?;
            if consumed == 0 {
                break;
            }
            pos += consumed;
        }
        Ok(output)
    }
}

/// LZMA2 encoder: splits input into chunks and writes the chunk framing.
pub struct Lzma2Encoder {
    dict_size: u32,
    tuning: EncoderTuning,
    props: LzmaProperties,
}

impl Lzma2Encoder {
    /// Create an encoder with the given dictionary size and tuning.
    pub fn new(dict_size: u32, tuning: EncoderTuning) -> Self {
        Self {
            dict_size,
            tuning,
            props: LzmaProperties::default(),
        }
    }

    fn write_uncompressed_chunk(output: &mut Vec<u8>, data: &[u8], reset_dict: bool) {
        output.push(if reset_dict {
            control::UNCOMPRESSED_RESET
        } else {
            control::UNCOMPRESSED
        });
        let size = data.len() - 1;
        output.push((size >> 8) as u8);
        output.push(size as u8);
        output.extend_from_slice(data);
    }

    fn write_lzma_chunk(
        &self,
        output: &mut Vec<u8>,
        uncompressed: &[u8],
        compressed: &[u8],
        reset: ResetMode,
    ) {
        let unc_size = uncompressed.len() - 1;
        let ctrl = control::LZMA_MASK | reset.control_bits() | ((unc_size >> 16) as u8 & control::SIZE_HIGH_MASK);
        output.push(ctrl);
        output.push((unc_size >> 8) as u8);
        output.push(unc_size as u8);
        let comp_size = compressed.len() - 1;
        output.push((comp_size >> 8) as u8);
        output.push(comp_size as u8);
        if reset.reads_new_props() {
            output.push(self.props.to_byte());
        }
        output.extend_from_slice(compressed);
    }

    /// Compress one candidate chunk as a standalone LZMA1 stream with no
    /// end-of-stream marker, for the caller to check against the 16-bit
    /// compressed-size field.
    fn try_compress_chunk(&self, chunk: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = LzmaEncoder::with_tuning(self.props, self.dict_size, self.tuning);
        encoder.compress_all_without_marker(chunk)
    }

    /// Encode `data` in full as one LZMA2 stream.
    ///
    /// Chunks start at up to [`control::LZMA_CHUNK_MAX_UNCOMPRESSED`] (2
    /// MiB) of input, but both wire size fields are 16-bit: a compressed
    /// chunk's body is capped at [`control::LZMA_CHUNK_MAX_COMPRESSED`] (64
    /// KiB) regardless of how much it represents uncompressed, and an
    /// uncompressed chunk's payload is capped at
    /// [`control::UNCOMPRESSED_CHUNK_MAX`] (64 KiB) outright. When a
    /// candidate chunk's compressed body would overflow the 64 KiB field
    /// (incompressible data, or data that simply doesn't compress well
    /// enough within the first 64 KiB), the chunk is halved and retried
    /// until it either compresses within budget or shrinks to a size the
    /// uncompressed fallback can hold.
    pub fn encode_all(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        if data.is_empty() {
            output.push(control::EOS);
            return Ok(output);
        }

        let mut pos = 0usize;
        let mut first_chunk = true;

        while pos < data.len() {
            let remaining = data.len() - pos;
            let mut chunk_len = remaining.min(control::LZMA_CHUNK_MAX_UNCOMPRESSED);

            let (final_len, body) = loop {
                let chunk = &data[pos..pos + chunk_len];
                let body = self.try_compress_chunk(chunk)?;
                let compressed_fits = body.len() <= control::LZMA_CHUNK_MAX_COMPRESSED;
                let worth_compressing = body.len() + 2 < chunk.len();

                if compressed_fits && worth_compressing {
                    break (chunk_len, Some(body));
                }
                if chunk_len <= control::UNCOMPRESSED_CHUNK_MAX {
                    break (chunk_len, None);
                }
                chunk_len = (chunk_len / 2).max(control::UNCOMPRESSED_CHUNK_MAX);
            };

            let chunk = &data[pos..pos + final_len];
            match body {
                Some(body) => {
                    let reset = if first_chunk {
                        ResetMode::StatePropsAndDict
                    } else {
                        ResetMode::StateAndProps
                    };
                    self.write_lzma_chunk(&mut output, chunk, &body, reset);
                }
                None => {
                    Self::write_uncompressed_chunk(&mut output, chunk, first_chunk);
                }
            }

            first_chunk = false;
            pos += final_len;
        }

        output.push(control::EOS);
        Ok(output)
    }
}

/// Decode a complete LZMA2 stream.
pub fn decode_lzma2(data: &[u8], dict_size: u32) -> Result<Vec<u8>> {
    Lzma2Decoder::new(dict_size).decode_all(data)
}

/// Encode a complete buffer as an LZMA2 stream.
pub fn encode_lzma2(data: &[u8], dict_size: u32, tuning: EncoderTuning) -> Result<Vec<u8>> {
    Lzma2Encoder::new(dict_size, tuning).encode_all(data)
}
