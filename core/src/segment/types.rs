// ## 📂 File: `src/segment/types.rs`

//! segment/types.rs
//! Bounded, cursor-tracked views over byte buffers.
//!
//! Invariants:
//! - `Segment`: `avail_len() == size() - usage()`; the write cursor sits `usage` bytes past the base.
//! - `ConstSegment`: `remaining() == size() - consumed()`; reads never move past the end.
//!
//! Both views are created right before a cipher call and dropped in the same call stack.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SegmentError {
    /// Commit or write larger than the space left in the segment.
    #[error("segment overflow: requested {requested}, available {available}")]
    Overflow { requested: usize, available: usize },

    /// Two-segment copy with less combined space than the source.
    #[error("split copy overflow: requested {requested}, available {available}")]
    SplitOverflow { requested: usize, available: usize },

    /// Read past the end of a const segment pair.
    #[error("segment underflow: requested {requested}, remaining {remaining}")]
    Underflow { requested: usize, remaining: usize },

    /// `assert_min_len` precondition failed.
    #[error("segment too short: required {required}, available {available}")]
    TooShort { required: usize, available: usize },

    /// Rewind mark past the current usage.
    #[error("invalid rewind mark {mark} (usage {usage})")]
    InvalidMark { mark: usize, usage: usize },
}

/// Writable segment: `[0..usage)` is written, `[usage..size)` is available.
#[derive(Debug)]
pub struct Segment<'a> {
    buf: &'a mut [u8],
    usage: usize,
}

impl<'a> Segment<'a> {
    /// Summary: Wrap `buf` with zero usage and the whole capacity available.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, usage: 0 }
    }

    /// A segment with no capacity, used for the absent half of a split destination.
    pub fn empty() -> Segment<'static> {
        Segment { buf: &mut [], usage: 0 }
    }

    pub fn size(&self) -> usize {
        self.buf.len()
    }

    pub fn usage(&self) -> usize {
        self.usage
    }

    pub fn avail_len(&self) -> usize {
        self.buf.len() - self.usage
    }

    pub fn is_full(&self) -> bool {
        self.avail_len() == 0
    }

    /// Bytes already committed.
    pub fn written(&self) -> &[u8] {
        &self.buf[..self.usage]
    }

    /// Uncommitted tail; write here, then `commit`.
    pub fn avail_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.usage..]
    }

    /// Advance the write cursor by `n` bytes. `n == 0` is a no-op.
    pub fn commit(&mut self, n: usize) -> Result<(), SegmentError> {
        if n > self.avail_len() {
            return Err(SegmentError::Overflow { requested: n, available: self.avail_len() });
        }
        self.usage += n;
        Ok(())
    }

    /// Copy `src` into the available space and commit it.
    pub fn write(&mut self, src: &[u8]) -> Result<(), SegmentError> {
        if src.len() > self.avail_len() {
            return Err(SegmentError::Overflow { requested: src.len(), available: self.avail_len() });
        }
        let start = self.usage;
        self.buf[start..start + src.len()].copy_from_slice(src);
        self.usage += src.len();
        Ok(())
    }

    /// Reset usage to zero so the region can be reused as scratch.
    pub fn clear(&mut self) {
        self.usage = 0;
    }

    /// Roll usage back to an earlier mark, zeroing the discarded bytes.
    pub fn rewind(&mut self, mark: usize) -> Result<(), SegmentError> {
        if mark > self.usage {
            return Err(SegmentError::InvalidMark { mark, usage: self.usage });
        }
        self.buf[mark..self.usage].fill(0);
        self.usage = mark;
        Ok(())
    }
}

/// Read-only segment: `[0..consumed)` has been read, `[consumed..size)` remains.
#[derive(Debug, Clone, Copy)]
pub struct ConstSegment<'a> {
    buf: &'a [u8],
    consumed: usize,
}

impl<'a> ConstSegment<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, consumed: 0 }
    }

    pub fn empty() -> ConstSegment<'static> {
        ConstSegment { buf: &[], consumed: 0 }
    }

    pub fn size(&self) -> usize {
        self.buf.len()
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.consumed
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Unread bytes, without consuming them.
    pub fn remaining_slice(&self) -> &'a [u8] {
        &self.buf[self.consumed..]
    }

    /// Mark `n` bytes as consumed.
    pub fn commit(&mut self, n: usize) -> Result<(), SegmentError> {
        if n > self.remaining() {
            return Err(SegmentError::Underflow { requested: n, remaining: self.remaining() });
        }
        self.consumed += n;
        Ok(())
    }

    /// Consume and return the next `n` bytes.
    pub fn read(&mut self, n: usize) -> Result<&'a [u8], SegmentError> {
        if n > self.remaining() {
            return Err(SegmentError::Underflow { requested: n, remaining: self.remaining() });
        }
        let start = self.consumed;
        self.consumed += n;
        Ok(&self.buf[start..start + n])
    }

    /// Consume everything left.
    pub fn read_rest(&mut self) -> &'a [u8] {
        let rest = &self.buf[self.consumed..];
        self.consumed = self.buf.len();
        rest
    }
}

/// Uniform "space left" accessor so precondition checks work on both views.
pub trait SegmentSpace {
    fn space(&self) -> usize;
}

impl SegmentSpace for Segment<'_> {
    fn space(&self) -> usize {
        self.avail_len()
    }
}

impl SegmentSpace for ConstSegment<'_> {
    fn space(&self) -> usize {
        self.remaining()
    }
}
