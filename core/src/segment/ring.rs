// ## 📂 File: `src/segment/ring.rs`

//! segment/ring.rs
//! Circular byte buffer exposed as `(before_wrap, after_wrap)` segment pairs.
//!
//! Used for both sides of the two-ring-buffer model: the TLS logical buffer (plaintext
//! staging) and the transport buffer the record pipeline writes ciphertext into.
//! Consumed bytes are zeroed, and the storage is zeroized on drop.

use zeroize::Zeroizing;

use super::copy::multi_target_copy;
use super::types::{ConstSegment, Segment, SegmentError};

#[derive(Debug)]
pub struct RingBuffer {
    storage: Zeroizing<Vec<u8>>,
    head: usize,
    len: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self::with_head(capacity, 0)
    }

    /// Empty buffer whose read/write position starts at `head`.
    ///
    /// Lets callers reproduce a specific wrap geometry (the next write wraps once it
    /// passes `capacity - head` bytes).
    pub fn with_head(capacity: usize, head: usize) -> Self {
        let head = if capacity == 0 { 0 } else { head % capacity };
        Self {
            storage: Zeroizing::new(vec![0u8; capacity]),
            head,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn free(&self) -> usize {
        self.capacity() - self.len
    }

    pub fn head(&self) -> usize {
        self.head
    }

    fn wrap_index(&self, idx: usize) -> usize {
        if self.capacity() == 0 {
            0
        } else {
            idx % self.capacity()
        }
    }

    fn tail(&self) -> usize {
        self.wrap_index(self.head + self.len)
    }

    /// True when the first `n` stored bytes cross the end of the storage.
    pub fn wraps(&self, n: usize) -> bool {
        self.head + n.min(self.len) > self.capacity()
    }

    /// Free space as two writable segments: up to the end of storage, then from index 0.
    ///
    /// Bytes written through the segments become visible after `commit_write`.
    pub fn free_segments(&mut self) -> (Segment<'_>, Segment<'_>) {
        let free = self.free();
        if free == 0 {
            return (Segment::empty(), Segment::empty());
        }
        let tail = self.tail();
        let first_len = free.min(self.capacity() - tail);
        let second_len = free - first_len;

        let (lo, hi) = self.storage.split_at_mut(tail);
        (Segment::new(&mut hi[..first_len]), Segment::new(&mut lo[..second_len]))
    }

    /// Publish `n` bytes written through `free_segments`.
    pub fn commit_write(&mut self, n: usize) -> Result<(), SegmentError> {
        if n > self.free() {
            return Err(SegmentError::Overflow { requested: n, available: self.free() });
        }
        self.len += n;
        Ok(())
    }

    /// Append `data`, wrapping as needed. Nothing is written when it does not fit.
    pub fn push(&mut self, data: &[u8]) -> Result<(), SegmentError> {
        {
            let (mut first, mut second) = self.free_segments();
            multi_target_copy(&mut first, &mut second, data)?;
        }
        self.len += data.len();
        Ok(())
    }

    /// The first `n` stored bytes as `(before_wrap, after_wrap)`; the second slice may be empty.
    pub fn regions(&self, n: usize) -> Result<(&[u8], &[u8]), SegmentError> {
        if n > self.len {
            return Err(SegmentError::Underflow { requested: n, remaining: self.len });
        }
        let first_len = n.min(self.capacity() - self.head);
        Ok((
            &self.storage[self.head..self.head + first_len],
            &self.storage[..n - first_len],
        ))
    }

    /// All stored bytes as a const segment pair.
    pub fn data_segments(&self) -> (ConstSegment<'_>, ConstSegment<'_>) {
        match self.regions(self.len) {
            Ok((first, second)) => (ConstSegment::new(first), ConstSegment::new(second)),
            Err(_) => (ConstSegment::empty(), ConstSegment::empty()),
        }
    }

    /// Drop the first `n` stored bytes, zeroing them.
    pub fn consume(&mut self, n: usize) -> Result<(), SegmentError> {
        if n > self.len {
            return Err(SegmentError::Underflow { requested: n, remaining: self.len });
        }
        let first_len = n.min(self.capacity() - self.head);
        let head = self.head;
        self.storage[head..head + first_len].fill(0);
        self.storage[..n - first_len].fill(0);
        self.head = self.wrap_index(self.head + n);
        self.len -= n;
        Ok(())
    }

    /// Copy out the whole content in logical order.
    pub fn to_vec(&self) -> Vec<u8> {
        let (first, second) = self.data_segments();
        let mut out = Vec::with_capacity(self.len);
        out.extend_from_slice(first.remaining_slice());
        out.extend_from_slice(second.remaining_slice());
        out
    }
}
