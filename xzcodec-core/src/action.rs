//! Streaming action/status vocabulary shared by filters, the block engine,
//! the stream engine, and the public API.
//!
//! One symmetric `Action`/`Status` pair serves every layer in this crate,
//! since each one codes in both directions (LZMA2 and the BCJ/Delta filters
//! are used on encode *and* decode).

/// What the caller is asking a `code()` call to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Process as much of the available input/output as possible.
    Run,
    /// Make all input provided so far decodable starting from the current
    /// output position. Encoder-only; not every filter supports it.
    SyncFlush,
    /// End the current container block. Stream encoder only.
    FullFlush,
    /// No more input will be provided; flush to completion.
    Finish,
}

/// What happened during a `code()` call.
///
/// `NoCheck`, `UnsupportedCheck`, and `GetCheck` are informational: coding
/// continues normally after they are observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Progress was made; more work remains.
    Ok,
    /// The action's terminal condition was reached.
    StreamEnd,
    /// The stream declares no integrity check.
    NoCheck,
    /// The stream's integrity check id is recognized as reserved but not
    /// implemented; check bytes are skipped without verification.
    UnsupportedCheck,
    /// The integrity check type has just become known to the caller
    /// (emitted once, immediately after a block header is parsed).
    GetCheck,
}

/// A cursor over a caller-supplied input buffer, tracking how much of it a
/// `code()` call has consumed so far.
#[derive(Debug)]
pub struct Input<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Input<'a> {
    /// Wrap a buffer for a single `code()` call.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> &[u8] {
        &self.buf[self.pos..]
    }

    /// Count of bytes not yet consumed.
    pub fn remaining_len(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Whether every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Mark `n` bytes as consumed.
    pub fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.buf.len());
    }

    /// Total bytes consumed so far this call.
    pub fn consumed(&self) -> usize {
        self.pos
    }
}

/// A growable output sink a `code()` call appends to; unlike the fixed-size
/// slice the C original fills, this grows with the data the way a `Vec`
/// accumulator does everywhere else in this crate.
#[derive(Debug)]
pub struct Output<'a> {
    buf: &'a mut Vec<u8>,
    start_len: usize,
}

impl<'a> Output<'a> {
    /// Wrap a buffer for a single `code()` call.
    pub fn new(buf: &'a mut Vec<u8>) -> Self {
        let start_len = buf.len();
        Self { buf, start_len }
    }

    /// Append one byte.
    pub fn push(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    /// Append a slice.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Bytes appended so far this call.
    pub fn produced(&self) -> usize {
        self.buf.len() - self.start_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_status_equality() {
        assert_eq!(Action::Run, Action::Run);
        assert_ne!(Action::Run, Action::Finish);
        assert_eq!(Status::Ok, Status::Ok);
        assert_ne!(Status::Ok, Status::StreamEnd);
    }

    #[test]
    fn test_input_advance() {
        let data = [1u8, 2, 3, 4];
        let mut input = Input::new(&data);
        assert_eq!(input.remaining_len(), 4);
        input.advance(2);
        assert_eq!(input.remaining(), &[3, 4]);
        assert_eq!(input.consumed(), 2);
        assert!(!input.is_empty());
        input.advance(2);
        assert!(input.is_empty());
    }

    #[test]
    fn test_output_produced() {
        let mut buf = vec![0u8, 1];
        let mut output = Output::new(&mut buf);
        output.push(2);
        output.extend(&[3, 4]);
        assert_eq!(output.produced(), 3);
        assert_eq!(buf, vec![0, 1, 2, 3, 4]);
    }
}
