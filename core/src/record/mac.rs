// ## 📂 File: `src/record/mac.rs`

//! record/mac.rs
//! Record MAC (RFC 5246 §6.2.3.1) and the shared 13-byte pseudo-header.
//!
//! `MAC(seq_num || type || version || length || content)`, streamed so that content
//! wrapped around the TLS ring is fed as two regions without reassembly.

use byteorder::{BigEndian, ByteOrder};

use crate::constants::{MAC_HEADER_LEN, TLS12_VERSION};
use crate::engine::{CipherEngine, JobId, OperationMode};
use crate::types::{InternalError, StepFailure};
use super::types::ContentType;

/// `seq_num(8) || type(1) || version(2) || length(2)`; also the AEAD additional data.
pub fn record_header(seq: u64, content_type: ContentType, len: u16) -> [u8; MAC_HEADER_LEN] {
    let mut header = [0u8; MAC_HEADER_LEN];
    BigEndian::write_u64(&mut header[0..8], seq);
    header[8] = content_type.into();
    BigEndian::write_u16(&mut header[9..11], TLS12_VERSION);
    BigEndian::write_u16(&mut header[11..13], len);
    header
}

/// Length field of the pseudo-header; a length that does not fit is a caller bug.
pub(crate) fn header_len(len: usize) -> Result<u16, InternalError> {
    u16::try_from(len).map_err(|_| InternalError::RecordTooLarge { len, max: u16::MAX as usize })
}

/// HMAC over the pseudo-header and both content regions, written to `out[..mac_len]`.
pub(crate) fn compute_record_mac<E: CipherEngine>(
    engine: &mut E,
    job: JobId,
    seq: u64,
    content_type: ContentType,
    regions: (&[u8], &[u8]),
    out: &mut [u8],
) -> Result<usize, StepFailure> {
    let (first, second) = regions;
    let header = record_header(seq, content_type, header_len(first.len() + second.len())?);

    engine.mac_generate(job, OperationMode::STREAM_START, &header, &mut [])?;
    for region in [first, second] {
        if !region.is_empty() {
            engine.mac_generate(job, OperationMode::UPDATE, region, &mut [])?;
        }
    }
    Ok(engine.mac_generate(job, OperationMode::FINISH, &[], out)?)
}
