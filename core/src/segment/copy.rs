// ## 📂 File: `src/segment/copy.rs`

//! segment/copy.rs
//! Wraparound-safe copy primitives.
//!
//! Every place the record pipeline moves bytes across a ring-buffer wrap point goes
//! through one of these two functions, so each wrap geometry reduces to the same code.

use super::types::{ConstSegment, Segment, SegmentError, SegmentSpace};

/// Copy `src` into `seg1` first (up to its available length), then the rest into `seg2`.
///
/// Fails without writing anything when `seg1.avail_len() + seg2.avail_len() < src.len()`.
pub fn multi_target_copy(
    seg1: &mut Segment<'_>,
    seg2: &mut Segment<'_>,
    src: &[u8],
) -> Result<(), SegmentError> {
    let available = seg1.avail_len() + seg2.avail_len();
    if src.len() > available {
        return Err(SegmentError::SplitOverflow { requested: src.len(), available });
    }

    let first = src.len().min(seg1.avail_len());
    seg1.write(&src[..first])?;
    seg2.write(&src[first..])?;
    Ok(())
}

/// Fill `dst` from `src1` first, then `src2`, consuming what was read.
///
/// Mirror of `multi_target_copy` for the receive path; fails without consuming
/// when the pair holds fewer than `dst.len()` bytes.
pub fn multi_source_copy(
    src1: &mut ConstSegment<'_>,
    src2: &mut ConstSegment<'_>,
    dst: &mut [u8],
) -> Result<(), SegmentError> {
    let remaining = src1.remaining() + src2.remaining();
    if dst.len() > remaining {
        return Err(SegmentError::Underflow { requested: dst.len(), remaining });
    }

    let first = dst.len().min(src1.remaining());
    dst[..first].copy_from_slice(src1.read(first)?);
    let rest = dst.len() - first;
    dst[first..].copy_from_slice(src2.read(rest)?);
    Ok(())
}

/// Precondition check: `seg` must have at least `n` bytes of space.
///
/// A failure here is a caller bug, surfaced as an internal-consistency error.
#[inline]
pub fn assert_min_len<S: SegmentSpace + ?Sized>(seg: &S, n: usize) -> Result<(), SegmentError> {
    let available = seg.space();
    if available < n {
        return Err(SegmentError::TooShort { required: n, available });
    }
    Ok(())
}
