//! Block header, and the block engine that drives a filter chain over one
//! block's payload.

use crate::xz::filters::{FilterSpec, build_chain_decode, build_chain_encode};
use crate::xz::format::{BLOCK_HEADER_SIZE_MAX, BLOCK_HEADER_SIZE_MIN};
use xzcodec_core::checksum::{Check, CheckType, Crc32};
use xzcodec_core::error::{Result, XzError};
use xzcodec_core::vli;
use xzcodec_filters::ids::FILTER_ID_LZMA2;
use xzcodec_lzma::{EncoderTuning, dict_size_from_props, props_from_dict_size};

/// A parsed block header.
#[derive(Debug, Clone)]
pub struct BlockHeader {
    /// Non-tail filters, in head-to-tail (declared) order.
    pub filters: Vec<FilterSpec>,
    /// LZMA2 dictionary size, decoded from the tail filter's properties.
    pub dict_size: u32,
    /// Compressed payload size, if present in the header.
    pub compressed_size: Option<u64>,
    /// Uncompressed payload size, if present in the header.
    pub uncompressed_size: Option<u64>,
}

impl BlockHeader {
    /// Encode the full header: size byte, flags, sizes, filter-flags,
    /// zero padding, and a CRC32 covering everything before it, including
    /// the size byte.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let num_filters = self.filters.len() + 1;
        if num_filters > 4 {
            return Err(XzError::options("at most 4 filters including the LZMA2 tail"));
        }

        let mut content = Vec::new();
        let mut flags = (num_filters - 1) as u8;
        if self.compressed_size.is_some() {
            flags |= 0x40;
        }
        if self.uncompressed_size.is_some() {
            flags |= 0x80;
        }
        content.push(flags);

        if let Some(size) = self.compressed_size {
            vli::encode(size, &mut content)?;
        }
        if let Some(size) = self.uncompressed_size {
            vli::encode(size, &mut content)?;
        }

        for filter in &self.filters {
            vli::encode(filter.filter_id(), &mut content)?;
            let props = filter.encode_properties();
            vli::encode(props.len() as u64, &mut content)?;
            content.extend_from_slice(&props);
        }
        vli::encode(FILTER_ID_LZMA2, &mut content)?;
        vli::encode(1, &mut content)?;
        content.push(props_from_dict_size(self.dict_size));

        let unpadded_total = 1 + content.len() + 4;
        let padded_total = unpadded_total.div_ceil(4) * 4;
        content.resize(content.len() + (padded_total - unpadded_total), 0x00);

        if padded_total > BLOCK_HEADER_SIZE_MAX {
            return Err(XzError::header("block header exceeds 1024 bytes"));
        }
        let header_size_byte = (padded_total / 4 - 1) as u8;

        let mut out = Vec::with_capacity(padded_total);
        out.push(header_size_byte);
        out.extend_from_slice(&content);
        let crc = Crc32::compute(&out);
        out.extend_from_slice(&crc.to_le_bytes());
        Ok(out)
    }

    /// Decode a header starting at `data[0]`. Returns the header and the
    /// number of bytes it occupies (the true header size, a multiple of 4
    /// in `[8, 1024]`).
    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        if data.is_empty() {
            return Err(XzError::data(0, "truncated block header"));
        }
        let size_byte = data[0];
        if size_byte == 0x00 {
            return Err(XzError::header("zero header-size byte: that's the index indicator"));
        }
        let header_size = (size_byte as usize + 1) * 4;
        if !(BLOCK_HEADER_SIZE_MIN..=BLOCK_HEADER_SIZE_MAX).contains(&header_size) {
            return Err(XzError::header("block header size out of [8, 1024] range"));
        }
        if data.len() < header_size {
            return Err(XzError::data(0, "truncated block header"));
        }

        let header_bytes = &data[..header_size];
        let expected_crc = u32::from_le_bytes(header_bytes[header_size - 4..].try_into().unwrap());
        let computed_crc = Crc32::compute(&header_bytes[..header_size - 4]);
        if expected_crc != computed_crc {
            return Err(XzError::data(0, "block header CRC32 mismatch"));
        }

        let body = &header_bytes[1..header_size - 4];
        if body.is_empty() {
            return Err(XzError::header("block header missing flags byte"));
        }
        let flags = body[0];
        if flags & 0x3C != 0 {
            return Err(XzError::options("block header: reserved flag bits are set"));
        }
        let num_filters = (flags & 0x03) + 1;
        let has_compressed_size = flags & 0x40 != 0;
        let has_uncompressed_size = flags & 0x80 != 0;

        let mut offset = 1usize;
        let compressed_size = if has_compressed_size {
            let (v, n) = vli::decode(&body[offset..])?;
            offset += n;
            Some(v)
        } else {
            None
        };
        let uncompressed_size = if has_uncompressed_size {
            let (v, n) = vli::decode(&body[offset..])?;
            offset += n;
            Some(v)
        } else {
            None
        };

        let mut filters = Vec::new();
        let mut dict_size = None;
        for i in 0..num_filters {
            let (id, n) = vli::decode(&body[offset..])?;
            offset += n;
            let (props_len, n) = vli::decode(&body[offset..])?;
            offset += n;
            let props_len = props_len as usize;
            if offset + props_len > body.len() {
                return Err(XzError::data(offset as u64, "truncated filter properties"));
            }
            let props = &body[offset..offset + props_len];
            offset += props_len;

            if id == FILTER_ID_LZMA2 {
                if i != num_filters - 1 {
                    return Err(XzError::header("LZMA2 filter must be the chain's last entry"));
                }
                if props.len() != 1 {
                    return Err(XzError::header("LZMA2 filter requires a 1-byte properties field"));
                }
                dict_size = Some(dict_size_from_props(props[0]));
            } else {
                filters.push(FilterSpec::decode(id, props)?);
            }
        }
        let dict_size =
            dict_size.ok_or_else(|| XzError::header("block has no LZMA2 tail filter"))?;

        if body[offset..].iter().any(|&b| b != 0x00) {
            return Err(XzError::header("non-zero block header padding"));
        }

        Ok((
            Self {
                filters,
                dict_size,
                compressed_size,
                uncompressed_size,
            },
            header_size,
        ))
    }
}

/// The result of encoding one block: its fully-assembled bytes (header,
/// filtered payload, padding, check) plus the sizes the stream index
/// needs to record.
pub struct EncodedBlock {
    /// Header + compressed payload + padding + check, ready to append to
    /// the stream.
    pub bytes: Vec<u8>,
    /// `header_size + compressed_size + check_size`.
    pub unpadded_size: u64,
    /// The original plaintext length.
    pub uncompressed_size: u64,
}

/// Run `data` through the given filter chain and assemble a complete
/// block: the header is sized from the filter list first, then the real
/// compressed/uncompressed sizes are back-patched in before it is emitted.
pub fn encode_block(
    data: &[u8],
    filters: &[FilterSpec],
    dict_size: u32,
    tuning: EncoderTuning,
    check_type: CheckType,
) -> Result<EncodedBlock> {
    let mut chain = build_chain_encode(filters, dict_size, tuning)?;
    let compressed = chain.code_all(data)?;

    let header = BlockHeader {
        filters: filters.to_vec(),
        dict_size,
        compressed_size: Some(compressed.len() as u64),
        uncompressed_size: Some(data.len() as u64),
    };
    let header_bytes = header.encode()?;

    let mut check = Check::new(check_type);
    check.update(data);
    let check_bytes = check.finalize_bytes();

    let pad_len = (4 - compressed.len() % 4) % 4;

    let mut bytes = Vec::with_capacity(header_bytes.len() + compressed.len() + pad_len + check_bytes.len());
    bytes.extend_from_slice(&header_bytes);
    bytes.extend_from_slice(&compressed);
    bytes.resize(bytes.len() + pad_len, 0x00);
    bytes.extend_from_slice(&check_bytes);

    let unpadded_size = (header_bytes.len() + compressed.len() + check_bytes.len()) as u64;
    Ok(EncodedBlock {
        bytes,
        unpadded_size,
        uncompressed_size: data.len() as u64,
    })
}

/// A decoded block, along with the sizes needed to cross-check it against
/// the stream index.
pub struct DecodedBlock {
    /// The recovered plaintext.
    pub data: Vec<u8>,
    /// Bytes of `data` (starting at the block header) this block occupied,
    /// not including any trailing 4-byte alignment padding before the
    /// next block or the index.
    pub consumed: usize,
    /// `header_size + compressed_size + check_size`, for index verification.
    pub unpadded_size: u64,
}

/// Parse and decode one block starting at `data[0]`: parse the header,
/// run the payload through the filter chain, absorb and verify the
/// integrity check, and confirm the header's declared uncompressed size
/// (if present) matches what came out.
pub fn decode_block(data: &[u8], check_type: CheckType) -> Result<DecodedBlock> {
    let (header, header_size) = BlockHeader::decode(data)?;
    let mut offset = header_size;

    let compressed_size = header
        .compressed_size
        .ok_or_else(|| XzError::header("block header missing compressed size"))? as usize;
    if offset + compressed_size > data.len() {
        return Err(XzError::data(offset as u64, "truncated block payload"));
    }
    let compressed = &data[offset..offset + compressed_size];
    offset += compressed_size;

    let pad_len = (4 - compressed_size % 4) % 4;
    if offset + pad_len > data.len() {
        return Err(XzError::data(offset as u64, "truncated block padding"));
    }
    if data[offset..offset + pad_len].iter().any(|&b| b != 0x00) {
        return Err(XzError::data(offset as u64, "non-zero block padding"));
    }
    offset += pad_len;

    let check_size = check_type.size();
    if offset + check_size > data.len() {
        return Err(XzError::data(offset as u64, "truncated block integrity check"));
    }
    let check_bytes = &data[offset..offset + check_size];
    offset += check_size;

    let mut chain = build_chain_decode(&header.filters, header.dict_size)?;
    let plaintext = chain.code_all(compressed)?;

    if let Some(expected_len) = header.uncompressed_size {
        if expected_len != plaintext.len() as u64 {
            return Err(XzError::data(
                header_size as u64,
                "block header uncompressed size disagrees with decoded output",
            ));
        }
    }

    if check_type.is_supported() {
        let mut check = Check::new(check_type);
        check.update(&plaintext);
        if check.finalize_bytes() != check_bytes {
            return Err(XzError::data(
                (offset - check_size) as u64,
                "block integrity check mismatch",
            ));
        }
    }

    let unpadded_size = (header_size + compressed_size + check_size) as u64;
    Ok(DecodedBlock {
        data: plaintext,
        consumed: offset,
        unpadded_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_header_roundtrip_no_filters_no_sizes() {
        let header = BlockHeader {
            filters: vec![],
            dict_size: 1 << 20,
            compressed_size: None,
            uncompressed_size: None,
        };
        let bytes = header.encode().unwrap();
        assert_eq!(bytes.len() % 4, 0);
        let (decoded, consumed) = BlockHeader::decode(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        assert!(decoded.filters.is_empty());
        assert_eq!(decoded.dict_size, 1 << 20);
        assert_eq!(decoded.compressed_size, None);
    }

    #[test]
    fn test_block_header_roundtrip_with_sizes_and_delta() {
        let header = BlockHeader {
            filters: vec![FilterSpec::Delta { distance: 4 }],
            dict_size: 1 << 16,
            compressed_size: Some(123),
            uncompressed_size: Some(456),
        };
        let bytes = header.encode().unwrap();
        let (decoded, consumed) = BlockHeader::decode(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded.compressed_size, Some(123));
        assert_eq!(decoded.uncompressed_size, Some(456));
        assert_eq!(decoded.filters, header.filters);
    }

    #[test]
    fn test_block_header_rejects_corrupted_crc() {
        let header = BlockHeader {
            filters: vec![],
            dict_size: 1 << 16,
            compressed_size: None,
            uncompressed_size: None,
        };
        let mut bytes = header.encode().unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(BlockHeader::decode(&bytes).is_err());
    }

    #[test]
    fn test_block_roundtrip_small_data() {
        let data = b"HELLO\n";
        let encoded = encode_block(data, &[], 1 << 16, EncoderTuning::fastest(), CheckType::Crc32).unwrap();
        let decoded = decode_block(&encoded.bytes, CheckType::Crc32).unwrap();
        assert_eq!(decoded.data, data);
        assert_eq!(decoded.unpadded_size, encoded.unpadded_size);
        assert_eq!(decoded.consumed, encoded.bytes.len());
    }

    #[test]
    fn test_block_roundtrip_with_delta_filter() {
        let data: Vec<u8> = (0..300u32).map(|i| (i % 200) as u8).collect();
        let filters = vec![FilterSpec::Delta { distance: 2 }];
        let encoded = encode_block(&data, &filters, 1 << 16, EncoderTuning::fastest(), CheckType::Crc64).unwrap();
        let decoded = decode_block(&encoded.bytes, CheckType::Crc64).unwrap();
        assert_eq!(decoded.data, data);
    }

    #[test]
    fn test_block_rejects_corrupted_check() {
        let data = b"some payload data to compress and check";
        let mut encoded = encode_block(data, &[], 1 << 16, EncoderTuning::fastest(), CheckType::Crc32).unwrap();
        let last = encoded.bytes.len() - 1;
        encoded.bytes[last] ^= 0xFF;
        assert!(decode_block(&encoded.bytes, CheckType::Crc32).is_err());
    }
}
