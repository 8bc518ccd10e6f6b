//! Stream engine: whole-stream compress/decompress, index cross-
//! verification, and the `Action`/`Status`-driven public handles.

use crate::xz::block::{decode_block, encode_block};
use crate::xz::filters::FilterSpec;
use crate::xz::format::{
    IndexRecord, StreamFlags, decode_index, decode_stream_footer, decode_stream_header, encode_index,
    encode_stream_footer, encode_stream_header,
};
use xzcodec_core::action::{Action, Input, Output, Status};
use xzcodec_core::checksum::CheckType;
use xzcodec_core::error::{Result, XzError};
use xzcodec_lzma::EncoderTuning;

/// Encoder/decoder configuration shared by the one-shot functions and the
/// streaming handles.
#[derive(Debug, Clone)]
pub struct XzOptions {
    /// Integrity check written into every block.
    pub check_type: CheckType,
    /// LZMA2 dictionary size in bytes.
    pub dict_size: u32,
    /// LZMA1/LZMA2 encoder search-effort tuning.
    pub tuning: EncoderTuning,
    /// Non-tail filters (Delta/BCJ) applied ahead of LZMA2, in head-to-
    /// tail order.
    pub filters: Vec<FilterSpec>,
    /// Split the input into blocks of at most this many bytes; `None`
    /// emits the whole input as a single block.
    pub block_size: Option<u64>,
}

impl Default for XzOptions {
    fn default() -> Self {
        Self {
            check_type: CheckType::Crc32,
            dict_size: 1 << 23,
            tuning: EncoderTuning::default_preset(),
            filters: Vec::new(),
            block_size: None,
        }
    }
}

/// Compress `data` into a complete XZ stream in one call.
pub fn compress(data: &[u8], options: &XzOptions) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let flags = StreamFlags::new(options.check_type);
    encode_stream_header(&mut out, flags);

    let block_size = options.block_size.map(|s| s.max(1) as usize).unwrap_or(data.len().max(1));
    let mut records = Vec::new();
    for chunk in data.chunks(block_size) {
        let block = encode_block(
            chunk,
            &options.filters,
            options.dict_size,
            options.tuning.clone(),
            options.check_type,
        )?;
        out.extend_from_slice(&block.bytes);
        records.push(IndexRecord {
            unpadded_size: block.unpadded_size,
            uncompressed_size: block.uncompressed_size,
        });
    }

    let index_start = out.len();
    encode_index(&mut out, &records)?;
    let index_size = out.len() - index_start;
    encode_stream_footer(&mut out, flags, index_size)?;
    Ok(out)
}

/// Decompress one complete XZ stream, verifying every block against the
/// trailing index; any disagreement in record count or size is a data
/// error.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let (flags, mut offset) = decode_stream_header(data)?;

    let mut output = Vec::new();
    let mut observed = Vec::new();
    loop {
        if offset >= data.len() {
            return Err(XzError::data(offset as u64, "truncated stream: expected a block or the index"));
        }
        if data[offset] == 0x00 {
            break;
        }
        let block = decode_block(&data[offset..], flags.check_type)?;
        output.extend_from_slice(&block.data);
        observed.push(IndexRecord {
            unpadded_size: block.unpadded_size,
            uncompressed_size: block.data.len() as u64,
        });
        offset += block.consumed;
    }

    let (declared, index_len) = decode_index(&data[offset..])?;
    if declared.len() != observed.len() {
        return Err(XzError::data(offset as u64, "index record count disagrees with block count"));
    }
    for (want, got) in declared.iter().zip(observed.iter()) {
        if want != got {
            return Err(XzError::data(offset as u64, "index disagrees with observed block sizes"));
        }
    }
    offset += index_len;

    if offset + 12 > data.len() {
        return Err(XzError::data(offset as u64, "truncated stream footer"));
    }
    offset += decode_stream_footer(&data[offset..offset + 12], flags, index_len)?;

    Ok(output)
}

/// The `Action`/`Status`-driven streaming encoder handle.
///
/// Input is accepted incrementally across any number of `code()` calls;
/// the stream is only actually assembled once `Action::Finish` arrives,
/// since the underlying LZMA2 tail filter (see
/// [`crate::xz::filters`]) only exposes whole-buffer encoding. `Action::Run`
/// therefore just stages bytes — this still honors the suspend/resume
/// contract (any segmentation of the input into `code()` calls yields the
/// same final output) and the "no progress" rule: a `Run` call that stages
/// zero bytes and produces zero output is tolerated once, so a caller can
/// e.g. grow its buffers, but returns `BufError` if the very next call also
/// makes no progress.
pub struct XzEncoder {
    options: XzOptions,
    staged: Vec<u8>,
    finished: bool,
    no_progress: bool,
}

impl XzEncoder {
    /// Create a new encoder handle with the given options.
    pub fn new(options: XzOptions) -> Self {
        Self {
            options,
            staged: Vec::new(),
            finished: false,
            no_progress: false,
        }
    }

    /// Advance the encoder. See the type-level docs for the staging
    /// behavior of `Action::Run`/`SyncFlush`/`FullFlush` versus `Finish`.
    pub fn code(&mut self, input: &mut Input, output: &mut Output, action: Action) -> Result<Status> {
        if self.finished {
            return Err(XzError::prog("XzEncoder::code called after Finish"));
        }

        let staged_now = input.remaining_len();
        self.staged.extend_from_slice(input.remaining());
        input.advance(staged_now);

        if action != Action::Finish {
            if staged_now == 0 {
                if self.no_progress {
                    return Err(XzError::BufError);
                }
                self.no_progress = true;
                return Ok(Status::Ok);
            }
            self.no_progress = false;
            return Ok(Status::Ok);
        }

        let bytes = compress(&self.staged, &self.options)?;
        output.extend(&bytes);
        self.finished = true;
        Ok(Status::StreamEnd)
    }
}

/// The `Action`/`Status`-driven streaming decoder handle. Mirrors
/// [`XzEncoder`]'s whole-buffer-on-`Finish` staging strategy.
pub struct XzDecoder {
    staged: Vec<u8>,
    finished: bool,
    no_progress: bool,
}

impl XzDecoder {
    /// Create a new decoder handle.
    pub fn new() -> Self {
        Self {
            staged: Vec::new(),
            finished: false,
            no_progress: false,
        }
    }

    /// Advance the decoder.
    pub fn code(&mut self, input: &mut Input, output: &mut Output, action: Action) -> Result<Status> {
        if self.finished {
            return Err(XzError::prog("XzDecoder::code called after StreamEnd"));
        }

        let staged_now = input.remaining_len();
        self.staged.extend_from_slice(input.remaining());
        input.advance(staged_now);

        if action != Action::Finish {
            if staged_now == 0 {
                if self.no_progress {
                    return Err(XzError::BufError);
                }
                self.no_progress = true;
                return Ok(Status::Ok);
            }
            self.no_progress = false;
            return Ok(Status::Ok);
        }

        let bytes = decompress(&self.staged)?;
        output.extend(&bytes);
        self.finished = true;
        Ok(Status::StreamEnd)
    }
}

impl Default for XzDecoder {
    fn default() -> Self {
        Self::new()
    }
}
