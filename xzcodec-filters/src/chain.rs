//! Filter-chain runtime: a linked list of filters with a head
//! (caller-facing) and a tail (the one that touches the range-coded
//! stream).

use crate::filter::Filter;
use crate::ids::is_tail_only;
use std::collections::HashSet;
use xzcodec_core::action::{Action, Input, Output, Status};
use xzcodec_core::error::{Result, XzError};

/// An ordered, validated list of filters, head to tail.
pub struct FilterChain {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterChain {
    /// Build a chain, validating its construction rules: exactly one
    /// tail-only filter (LZMA/LZMA2), only at the tail; no duplicate
    /// filter ids; total memory usage under `mem_limit` if given.
    ///
    /// Use this constructor for the declaration order a block header
    /// carries (and for encoding, which runs that same order head to
    /// tail). A decoder processes the tail first instead — build that
    /// chain with [`FilterChain::new_decode_order`].
    pub fn new(filters: Vec<Box<dyn Filter>>, mem_limit: Option<u64>) -> Result<Self> {
        Self::build(filters, mem_limit, true)
    }

    /// Build a chain whose `Vec` order is already tail-first (LZMA2
    /// decoded before the outer BCJ/Delta filters are undone), the order
    /// [`FilterChain::code_all`] needs to reverse a block's declared
    /// filter list back into plaintext. Everything [`FilterChain::new`]
    /// validates still applies except the tail-only filter's position.
    pub fn new_decode_order(filters: Vec<Box<dyn Filter>>, mem_limit: Option<u64>) -> Result<Self> {
        Self::build(filters, mem_limit, false)
    }

    fn build(filters: Vec<Box<dyn Filter>>, mem_limit: Option<u64>, tail_at_end: bool) -> Result<Self> {
        if filters.is_empty() {
            return Err(XzError::options("filter chain must have at least one filter"));
        }
        if filters.len() > 4 {
            return Err(XzError::options("filter chain supports at most 4 filters"));
        }

        let mut seen = HashSet::new();
        for filter in &filters {
            if !seen.insert(filter.filter_id()) {
                return Err(XzError::options(format!(
                    "filter id {:#x} appears twice in the chain",
                    filter.filter_id()
                )));
            }
        }

        let tail_index = if tail_at_end { filters.len() - 1 } else { 0 };
        for (i, filter) in filters.iter().enumerate() {
            let tail_only = is_tail_only(filter.filter_id());
            if tail_only && i != tail_index {
                return Err(XzError::options(
                    "a tail-only filter (LZMA/LZMA2) may only appear at the chain's tail",
                ));
            }
        }

        if let Some(limit) = mem_limit {
            let total: u64 = filters.iter().map(|f| f.memory_usage()).sum();
            if total > limit {
                return Err(XzError::mem_limit(total, limit));
            }
        }

        Ok(Self { filters })
    }

    /// Number of filters in the chain.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Whether the chain is empty (never true for a constructed chain).
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Drive `data` through every filter head to tail and return the fully
    /// converted result. Convenience wrapper for whole-buffer callers; the
    /// block engine drives filters individually across suspend points.
    pub fn code_all(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        let mut stage: Vec<u8> = data.to_vec();
        for filter in &mut self.filters {
            let mut next = Vec::new();
            let mut input = Input::new(&stage);
            let mut output = Output::new(&mut next);
            loop {
                let status = filter.code(&mut input, &mut output, Action::Finish)?;
                if status == Status::StreamEnd || input.is_empty() {
                    break;
                }
            }
            stage = next;
        }
        Ok(stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bcj::BcjArm;
    use crate::delta::DeltaFilter;
    use crate::ids::FILTER_ID_LZMA2;

    struct StubTail(u64);
    impl Filter for StubTail {
        fn filter_id(&self) -> u64 {
            self.0
        }
        fn code(&mut self, input: &mut Input, output: &mut Output, _action: Action) -> Result<Status> {
            output.extend(input.remaining());
            input.advance(input.remaining_len());
            Ok(Status::StreamEnd)
        }
    }

    #[test]
    fn test_rejects_empty_chain() {
        assert!(FilterChain::new(vec![], None).is_err());
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let filters: Vec<Box<dyn Filter>> = vec![
            Box::new(DeltaFilter::encoder(1).unwrap()),
            Box::new(DeltaFilter::encoder(2).unwrap()),
        ];
        assert!(FilterChain::new(filters, None).is_err());
    }

    #[test]
    fn test_rejects_tail_only_filter_not_at_tail() {
        let filters: Vec<Box<dyn Filter>> = vec![
            Box::new(StubTail(FILTER_ID_LZMA2)),
            Box::new(BcjArm::encoder(0)),
        ];
        assert!(FilterChain::new(filters, None).is_err());
    }

    #[test]
    fn test_accepts_tail_only_filter_at_tail() {
        let filters: Vec<Box<dyn Filter>> = vec![
            Box::new(BcjArm::encoder(0)),
            Box::new(StubTail(FILTER_ID_LZMA2)),
        ];
        assert!(FilterChain::new(filters, None).is_ok());
    }

    #[test]
    fn test_rejects_over_memory_limit() {
        let filters: Vec<Box<dyn Filter>> = vec![Box::new(DeltaFilter::encoder(4).unwrap())];
        assert!(FilterChain::new(filters, Some(1)).is_err());
    }

    #[test]
    fn test_code_all_through_delta_and_stub_tail() {
        let filters: Vec<Box<dyn Filter>> = vec![
            Box::new(DeltaFilter::encoder(1).unwrap()),
            Box::new(StubTail(FILTER_ID_LZMA2)),
        ];
        let mut chain = FilterChain::new(filters, None).unwrap();
        let data = vec![1u8, 2, 3, 4, 5];
        let out = chain.code_all(&data).unwrap();
        assert_eq!(out.len(), data.len());
    }
}
