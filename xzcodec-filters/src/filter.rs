//! The `Filter` trait every chain link implements.

use xzcodec_core::action::{Action, Input, Output, Status};
use xzcodec_core::error::Result;

/// One link in a filter chain: converts bytes on the way in (encoder head to
/// tail) or on the way out (decoder tail to head), symmetric in both
/// directions.
pub trait Filter {
    /// The wire filter id (see [`crate::ids`]).
    fn filter_id(&self) -> u64;

    /// Process as much of `input` as `action` calls for, appending converted
    /// bytes to `output`.
    fn code(&mut self, input: &mut Input, output: &mut Output, action: Action) -> Result<Status>;

    /// Estimated bytes of internal state this filter holds, for the
    /// chain-construction memory-limit check. Zero for filters with only
    /// a small fixed-size history buffer.
    fn memory_usage(&self) -> u64 {
        0
    }
}
