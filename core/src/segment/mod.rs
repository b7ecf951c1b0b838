//! Segment views and ring buffers.
//!
//! Responsibilities:
//! - Bounded write/read cursors over borrowed bytes
//! - Copies that spread across (or gather from) two segments around a wrap point
//! - Circular buffers handing out segment pairs
//!
//! Non-responsibilities:
//! - Cryptography
//! - Record framing

pub mod types;
pub mod copy;
pub mod ring;

pub use types::{ConstSegment, Segment, SegmentError, SegmentSpace};
pub use copy::{assert_min_len, multi_source_copy, multi_target_copy};
pub use ring::RingBuffer;
