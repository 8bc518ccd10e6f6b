//! Filter entries a block header can carry ahead of the LZMA2 tail, and the
//! glue that turns them into an [`xzcodec_filters::FilterChain`].
//!
//! The LZMA2 tail itself is not a [`FilterSpec`] variant — it is always
//! present, always last, and its filter-flags entry is written/parsed by
//! [`crate::xz::block::BlockHeader`] directly, keeping LZMA2-specific
//! handling separate from the generic filter loop.

use xzcodec_core::error::{Result, XzError};
use xzcodec_filters::{
    BcjArm, BcjArmThumb, BcjIa64, BcjPowerPc, BcjSparc, BcjX86, DeltaFilter, Filter, FilterChain,
};
use xzcodec_lzma::{EncoderTuning, Lzma2Decoder, Lzma2Encoder};

use xzcodec_filters::ids::{
    FILTER_ID_BCJ_ARM, FILTER_ID_BCJ_ARM_THUMB, FILTER_ID_BCJ_IA64, FILTER_ID_BCJ_POWERPC,
    FILTER_ID_BCJ_SPARC, FILTER_ID_BCJ_X86, FILTER_ID_DELTA, FILTER_ID_LZMA2,
};

/// A BCJ branch-converter architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BcjArch {
    /// x86 (32/64-bit), byte-aligned.
    X86,
    /// ARM, 4-byte aligned.
    Arm,
    /// ARM-Thumb, 2-byte aligned, processed in 4-byte pairs.
    ArmThumb,
    /// PowerPC, 4-byte aligned.
    PowerPc,
    /// SPARC, 4-byte aligned.
    Sparc,
    /// IA-64 (Itanium), 16-byte bundles.
    Ia64,
}

/// A non-tail filter-chain entry: Delta or one of the six BCJ converters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterSpec {
    /// Byte-wise delta filter with the given distance (1..=256).
    Delta {
        /// Distance back into the history ring.
        distance: usize,
    },
    /// A BCJ branch-converter filter, with a start offset used when
    /// multiple independently-filtered sections are concatenated.
    Bcj {
        /// Which architecture's branch instructions to convert.
        arch: BcjArch,
        /// Stream offset the filter's internal position counter starts at.
        start_offset: u32,
    },
}

impl FilterSpec {
    /// The wire filter id for this entry.
    pub fn filter_id(&self) -> u64 {
        match self {
            FilterSpec::Delta { .. } => FILTER_ID_DELTA,
            FilterSpec::Bcj { arch, .. } => match arch {
                BcjArch::X86 => FILTER_ID_BCJ_X86,
                BcjArch::Arm => FILTER_ID_BCJ_ARM,
                BcjArch::ArmThumb => FILTER_ID_BCJ_ARM_THUMB,
                BcjArch::PowerPc => FILTER_ID_BCJ_POWERPC,
                BcjArch::Sparc => FILTER_ID_BCJ_SPARC,
                BcjArch::Ia64 => FILTER_ID_BCJ_IA64,
            },
        }
    }

    /// Encode this entry's filter-flags properties bytes.
    pub fn encode_properties(&self) -> Vec<u8> {
        match self {
            FilterSpec::Delta { distance } => vec![(*distance - 1) as u8],
            FilterSpec::Bcj { start_offset, .. } if *start_offset != 0 => {
                start_offset.to_le_bytes().to_vec()
            }
            FilterSpec::Bcj { .. } => Vec::new(),
        }
    }

    /// Parse a filter-flags entry (other than the LZMA2 tail) back into a
    /// [`FilterSpec`].
    pub fn decode(id: u64, props: &[u8]) -> Result<Self> {
        if id == FILTER_ID_DELTA {
            if props.len() != 1 {
                return Err(XzError::header("delta filter requires a 1-byte properties field"));
            }
            return Ok(FilterSpec::Delta {
                distance: props[0] as usize + 1,
            });
        }

        let arch = match id {
            FILTER_ID_BCJ_X86 => BcjArch::X86,
            FILTER_ID_BCJ_ARM => BcjArch::Arm,
            FILTER_ID_BCJ_ARM_THUMB => BcjArch::ArmThumb,
            FILTER_ID_BCJ_POWERPC => BcjArch::PowerPc,
            FILTER_ID_BCJ_SPARC => BcjArch::Sparc,
            FILTER_ID_BCJ_IA64 => BcjArch::Ia64,
            _ => return Err(XzError::options(format!("unknown filter id {id:#x}"))),
        };
        let start_offset = match props.len() {
            0 => 0,
            4 => u32::from_le_bytes(props.try_into().unwrap()),
            _ => return Err(XzError::header("BCJ filter properties must be 0 or 4 bytes")),
        };
        Ok(FilterSpec::Bcj { arch, start_offset })
    }

    fn build(&self, encode: bool) -> Result<Box<dyn Filter>> {
        Ok(match self {
            FilterSpec::Delta { distance } => {
                if encode {
                    Box::new(DeltaFilter::encoder(*distance)?)
                } else {
                    Box::new(DeltaFilter::decoder(*distance)?)
                }
            }
            FilterSpec::Bcj { arch, start_offset } => match arch {
                BcjArch::X86 => box_bcj(encode, BcjX86::encoder(*start_offset), BcjX86::decoder(*start_offset)),
                BcjArch::Arm => box_bcj(encode, BcjArm::encoder(*start_offset), BcjArm::decoder(*start_offset)),
                BcjArch::ArmThumb => box_bcj(
                    encode,
                    BcjArmThumb::encoder(*start_offset),
                    BcjArmThumb::decoder(*start_offset),
                ),
                BcjArch::PowerPc => box_bcj(
                    encode,
                    BcjPowerPc::encoder(*start_offset),
                    BcjPowerPc::decoder(*start_offset),
                ),
                BcjArch::Sparc => {
                    box_bcj(encode, BcjSparc::encoder(*start_offset), BcjSparc::decoder(*start_offset))
                }
                BcjArch::Ia64 => {
                    box_bcj(encode, BcjIa64::encoder(*start_offset), BcjIa64::decoder(*start_offset))
                }
            },
        })
    }
}

fn box_bcj<E: Filter + 'static, D: Filter + 'static>(encode: bool, enc: E, dec: D) -> Box<dyn Filter> {
    if encode { Box::new(enc) } else { Box::new(dec) }
}

/// The LZMA2 tail adapter: implements [`Filter`] over [`Lzma2Encoder`]/
/// [`Lzma2Decoder`], which only expose whole-buffer `encode_all`/
/// `decode_all` methods. This filter therefore buffers everything it sees
/// and only produces output once `Action::Finish` arrives — the same
/// whole-buffer contract the rest of this workspace already uses for LZMA2
/// (see [`xzcodec_lzma::lzma2`]), generalized to the `Filter` trait's
/// signature so it can sit at the tail of an [`xzcodec_filters::FilterChain`].
struct Lzma2Filter {
    dict_size: u32,
    tuning: Option<EncoderTuning>,
    pending: Vec<u8>,
}

impl Lzma2Filter {
    fn encoder(dict_size: u32, tuning: EncoderTuning) -> Self {
        Self {
            dict_size,
            tuning: Some(tuning),
            pending: Vec::new(),
        }
    }

    fn decoder(dict_size: u32) -> Self {
        Self {
            dict_size,
            tuning: None,
            pending: Vec::new(),
        }
    }
}

impl Filter for Lzma2Filter {
    fn filter_id(&self) -> u64 {
        FILTER_ID_LZMA2
    }

    fn code(
        &mut self,
        input: &mut xzcodec_core::action::Input,
        output: &mut xzcodec_core::action::Output,
        action: xzcodec_core::action::Action,
    ) -> Result<xzcodec_core::action::Status> {
        use xzcodec_core::action::{Action, Status};

        self.pending.extend_from_slice(input.remaining());
        input.advance(input.remaining_len());

        if action != Action::Finish {
            return Ok(Status::Ok);
        }

        let produced = match &self.tuning {
            Some(tuning) => {
                let mut encoder = Lzma2Encoder::new(self.dict_size, tuning.clone());
                encoder.encode_all(&self.pending)?
            }
            None => {
                let mut decoder = Lzma2Decoder::new(self.dict_size);
                decoder.decode_all(&self.pending)?
            }
        };
        output.extend(&produced);
        Ok(Status::StreamEnd)
    }

    fn memory_usage(&self) -> u64 {
        // Dominated by the LZMA dictionary and match-finder tables; the
        // exact estimate lives in xzcodec_core::mem::estimate_usage, which
        // the caller consults before ever constructing this filter.
        u64::from(self.dict_size) * 2
    }
}

/// Build an encoding filter chain: the given non-tail filters, in order,
/// followed by the LZMA2 tail.
pub fn build_chain_encode(
    filters: &[FilterSpec],
    dict_size: u32,
    tuning: EncoderTuning,
) -> Result<FilterChain> {
    let mut stages: Vec<Box<dyn Filter>> = Vec::with_capacity(filters.len() + 1);
    for spec in filters {
        stages.push(spec.build(true)?);
    }
    stages.push(Box::new(Lzma2Filter::encoder(dict_size, tuning)));
    FilterChain::new(stages, None)
}

/// Build a decoding filter chain. `filters` is given in the block
/// header's declared (encode head-to-tail) order; decoding runs the tail
/// (LZMA2) first and then undoes the non-tail filters back toward the
/// head, so the runtime order here is the declared order reversed, with
/// the LZMA2 tail moved to the front.
pub fn build_chain_decode(filters: &[FilterSpec], dict_size: u32) -> Result<FilterChain> {
    let mut stages: Vec<Box<dyn Filter>> = Vec::with_capacity(filters.len() + 1);
    stages.push(Box::new(Lzma2Filter::decoder(dict_size)));
    for spec in filters.iter().rev() {
        stages.push(spec.build(false)?);
    }
    FilterChain::new_decode_order(stages, None)
}
