//! Stream-level wire format: magic, stream header/footer, and the index.

use xzcodec_core::checksum::{CheckType, Crc32};
use xzcodec_core::error::{Result, XzError};
use xzcodec_core::vli;

/// XZ stream magic: `FD 37 7A 58 5A 00`.
pub const XZ_MAGIC: [u8; 6] = [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00];

/// XZ stream footer magic: `59 5A`.
pub const XZ_FOOTER_MAGIC: [u8; 2] = [0x59, 0x5A];

/// Smallest legal block header size in bytes (size byte encodes `b=0`).
pub const BLOCK_HEADER_SIZE_MIN: usize = 8;
/// Largest legal block header size in bytes (size byte encodes `b=255`).
pub const BLOCK_HEADER_SIZE_MAX: usize = 1024;

/// The two-byte stream-flags field carried in both the stream header and
/// footer: a reserved zero byte and the integrity check id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFlags {
    /// Which integrity check this stream uses.
    pub check_type: CheckType,
}

impl StreamFlags {
    /// Construct stream flags for the given check type.
    pub fn new(check_type: CheckType) -> Self {
        Self { check_type }
    }

    /// Encode to the 2-byte wire representation.
    pub fn encode(self) -> [u8; 2] {
        [0x00, self.check_type.to_id()]
    }

    /// Decode from the 2-byte wire representation, rejecting any set
    /// reserved bit.
    pub fn decode(bytes: [u8; 2]) -> Result<Self> {
        if bytes[0] != 0x00 {
            return Err(XzError::options("stream flags: reserved byte is not zero"));
        }
        if bytes[1] & 0xF0 != 0 {
            return Err(XzError::options("stream flags: reserved bits are set"));
        }
        Ok(Self {
            check_type: CheckType::from_id(bytes[1] & 0x0F)?,
        })
    }
}

/// Encode the 12-byte stream header: magic, flags, CRC32 of the flags.
pub fn encode_stream_header(out: &mut Vec<u8>, flags: StreamFlags) {
    out.extend_from_slice(&XZ_MAGIC);
    let flag_bytes = flags.encode();
    out.extend_from_slice(&flag_bytes);
    out.extend_from_slice(&Crc32::compute(&flag_bytes).to_le_bytes());
}

/// Decode and verify the 12-byte stream header. Returns the flags and the
/// number of bytes consumed (always 12).
pub fn decode_stream_header(data: &[u8]) -> Result<(StreamFlags, usize)> {
    if data.len() < 12 {
        return Err(XzError::data(0, "truncated stream header"));
    }
    if data[..6] != XZ_MAGIC {
        return Err(XzError::format("not an XZ stream: bad magic"));
    }
    let flags = StreamFlags::decode([data[6], data[7]])?;
    let expected = u32::from_le_bytes(data[8..12].try_into().unwrap());
    let computed = Crc32::compute(&data[6..8]);
    if expected != computed {
        return Err(XzError::data(6, "stream header CRC32 mismatch"));
    }
    Ok((flags, 12))
}

/// Encode the 12-byte stream footer given the index size in bytes.
pub fn encode_stream_footer(out: &mut Vec<u8>, flags: StreamFlags, index_size: usize) -> Result<()> {
    if index_size == 0 || index_size % 4 != 0 {
        return Err(XzError::prog("index size must be a nonzero multiple of 4"));
    }
    let backward_size = (index_size / 4 - 1) as u32;
    let mut body = Vec::with_capacity(6);
    body.extend_from_slice(&backward_size.to_le_bytes());
    body.extend_from_slice(&flags.encode());
    out.extend_from_slice(&Crc32::compute(&body).to_le_bytes());
    out.extend_from_slice(&body);
    out.extend_from_slice(&XZ_FOOTER_MAGIC);
    Ok(())
}

/// Decode and verify the 12-byte stream footer; `index_size` is the size
/// in bytes the decoder already observed while reading the index, checked
/// against the footer's `backward_size`.
pub fn decode_stream_footer(data: &[u8], header_flags: StreamFlags, index_size: usize) -> Result<usize> {
    if data.len() < 12 {
        return Err(XzError::data(0, "truncated stream footer"));
    }
    let expected_crc = u32::from_le_bytes(data[0..4].try_into().unwrap());
    let computed_crc = Crc32::compute(&data[4..10]);
    if expected_crc != computed_crc {
        return Err(XzError::data(0, "stream footer CRC32 mismatch"));
    }
    let backward_size = u32::from_le_bytes(data[4..8].try_into().unwrap());
    let declared_index_size = (backward_size as usize + 1) * 4;
    if declared_index_size != index_size {
        return Err(XzError::data(4, "stream footer backward_size disagrees with index size"));
    }
    let footer_flags = StreamFlags::decode([data[8], data[9]])?;
    if footer_flags != header_flags {
        return Err(XzError::data(8, "stream footer flags disagree with stream header"));
    }
    if data[10..12] != XZ_FOOTER_MAGIC {
        return Err(XzError::format("stream footer: bad magic"));
    }
    Ok(12)
}

/// One index record: a block's unpadded size and uncompressed size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRecord {
    /// `header_size + compressed_size + check_size` for the block.
    pub unpadded_size: u64,
    /// The block's decompressed payload length.
    pub uncompressed_size: u64,
}

/// Encode the index: indicator, record count, records, zero padding to a
/// 4-byte multiple, CRC32 over everything before the CRC field.
pub fn encode_index(out: &mut Vec<u8>, records: &[IndexRecord]) -> Result<()> {
    let start = out.len();
    out.push(0x00);
    vli::encode(records.len() as u64, out)?;
    for record in records {
        vli::encode(record.unpadded_size, out)?;
        vli::encode(record.uncompressed_size, out)?;
    }
    while (out.len() - start) % 4 != 0 {
        out.push(0x00);
    }
    let crc = Crc32::compute(&out[start..]);
    out.extend_from_slice(&crc.to_le_bytes());
    Ok(())
}

/// Decode the index starting at `data[0]` (the indicator byte). Returns
/// the records and the total number of bytes consumed, including the
/// trailing CRC32.
pub fn decode_index(data: &[u8]) -> Result<(Vec<IndexRecord>, usize)> {
    if data.is_empty() || data[0] != 0x00 {
        return Err(XzError::header("missing index indicator byte"));
    }
    let mut pos = 1usize;
    let (count, n) = vli::decode(&data[pos..])?;
    pos += n;

    let mut records = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let (unpadded_size, n) = vli::decode(&data[pos..])?;
        pos += n;
        let (uncompressed_size, n) = vli::decode(&data[pos..])?;
        pos += n;
        records.push(IndexRecord {
            unpadded_size,
            uncompressed_size,
        });
    }

    let body_len_before_pad = pos;
    while pos % 4 != 0 {
        if pos >= data.len() {
            return Err(XzError::data(pos as u64, "truncated index padding"));
        }
        if data[pos] != 0x00 {
            return Err(XzError::data(pos as u64, "non-zero index padding"));
        }
        pos += 1;
    }
    let _ = body_len_before_pad;

    if data.len() < pos + 4 {
        return Err(XzError::data(pos as u64, "truncated index CRC32"));
    }
    let expected = u32::from_le_bytes(data[pos..pos + 4].try_into().unwrap());
    let computed = Crc32::compute(&data[..pos]);
    if expected != computed {
        return Err(XzError::data(pos as u64, "index CRC32 mismatch"));
    }
    pos += 4;

    Ok((records, pos))
}
