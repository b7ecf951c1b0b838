// ## 📂 File: `src/record/null.rs`

//! record/null.rs
//! NULL bulk cipher: records travel as `content || MAC`.

use std::time::Instant;

use log::debug;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

use crate::connection::{Activity, TlsConnection};
use crate::constants::{MAX_MAC_LEN, MAX_PLAINTEXT_LEN};
use crate::crypto::suites::BulkCipher;
use crate::engine::CipherEngine;
use crate::report::FunctionId;
use crate::segment::{multi_source_copy, multi_target_copy, ConstSegment, Segment};
use crate::telemetry::Stage;
use crate::types::{InternalError, StepFailure, TlsError};
use super::mac::compute_record_mac;
use super::types::{AlertDescription, BufferRequest, ContentType, OpenedRecord};

pub fn protect_record<E: CipherEngine>(
    conn: &mut TlsConnection,
    engine: &mut E,
    seg1: &mut Segment<'_>,
    seg2: &mut Segment<'_>,
) -> Result<BufferRequest, TlsError> {
    conn.ensure_usable(FunctionId::ProtectNull, Activity::Protect)?;
    protect_pending(conn, engine, seg1, seg2).map_err(|f| conn.escalate(FunctionId::ProtectNull, f))
}

fn protect_pending<E: CipherEngine>(
    conn: &mut TlsConnection,
    engine: &mut E,
    seg1: &mut Segment<'_>,
    seg2: &mut Segment<'_>,
) -> Result<BufferRequest, StepFailure> {
    let record = conn.tx_record.ok_or(InternalError::NoPendingRecord)?;
    if conn.params.cipher != BulkCipher::Null {
        return Err(InternalError::CipherMismatch { operation: "null protect" }.into());
    }

    let mac_len = conn.params.mac_len();
    let required = record.len + conn.params.record_overhead();
    let available = seg1.avail_len() + seg2.avail_len();
    if available < required {
        conn.telemetry.add_deferral();
        debug!("[conn {}] null record deferred: {} required, {} available", conn.id, required, available);
        return Ok(BufferRequest::NeedMoreSpace { required, available });
    }

    let seq = conn.next_tx_seq()?;
    let started = Instant::now();
    let mac_job = conn.worker.tx.mac_job;
    let mac_elapsed = {
        let regions = conn.content_regions(&record)?;
        let mut mac = Zeroizing::new([0u8; MAX_MAC_LEN]);
        let mac_started = Instant::now();
        compute_record_mac(engine, mac_job, seq, record.content_type, regions, &mut mac[..mac_len])?;
        let mac_elapsed = mac_started.elapsed();

        let (mark1, mark2) = (seg1.usage(), seg2.usage());
        let copied = multi_target_copy(seg1, seg2, regions.0)
            .and_then(|_| multi_target_copy(seg1, seg2, regions.1))
            .and_then(|_| multi_target_copy(seg1, seg2, &mac[..mac_len]));
        if let Err(e) = copied {
            seg1.rewind(mark1)?;
            seg2.rewind(mark2)?;
            return Err(e.into());
        }
        mac_elapsed
    };

    conn.stage_times.add(Stage::Mac, mac_elapsed);
    conn.complete_tx_record(&record, required, started)?;
    Ok(BufferRequest::Complete { written: required })
}

pub fn open_record<E: CipherEngine>(
    conn: &mut TlsConnection,
    engine: &mut E,
    content_type: ContentType,
    first: &mut ConstSegment<'_>,
    second: &mut ConstSegment<'_>,
    rx_offset: usize,
) -> Result<OpenedRecord, TlsError> {
    conn.ensure_usable(FunctionId::OpenNull, Activity::Open)?;
    let started = Instant::now();
    let ct_len = first.remaining() + second.remaining();
    match open_into_rx(conn, engine, content_type, first, second, rx_offset) {
        Ok(record) => {
            conn.complete_rx_record(record.len, ct_len, started);
            Ok(record)
        }
        Err(f) => Err(conn.escalate(FunctionId::OpenNull, f)),
    }
}

fn open_into_rx<E: CipherEngine>(
    conn: &mut TlsConnection,
    engine: &mut E,
    content_type: ContentType,
    first: &mut ConstSegment<'_>,
    second: &mut ConstSegment<'_>,
    rx_offset: usize,
) -> Result<OpenedRecord, StepFailure> {
    if conn.params.cipher != BulkCipher::Null {
        return Err(InternalError::CipherMismatch { operation: "null open" }.into());
    }

    let mac_len = conn.params.mac_len();
    let total = first.remaining() + second.remaining();
    if total < mac_len {
        return Err(StepFailure::Protocol(AlertDescription::DecodeError));
    }
    let pt_len = total - mac_len;
    if pt_len > MAX_PLAINTEXT_LEN {
        return Err(StepFailure::Protocol(AlertDescription::RecordOverflow));
    }

    let size = conn.rx_buffer.len();
    let end = rx_offset
        .checked_add(pt_len)
        .filter(|end| *end <= size)
        .ok_or(InternalError::RxBufferOverflow { offset: rx_offset, len: pt_len, size })?;

    let seq = conn.next_rx_seq()?;
    multi_source_copy(first, second, &mut conn.rx_buffer[rx_offset..end])?;
    let mut received = [0u8; MAX_MAC_LEN];
    multi_source_copy(first, second, &mut received[..mac_len])?;

    let mut computed = Zeroizing::new([0u8; MAX_MAC_LEN]);
    let content = &conn.rx_buffer[rx_offset..end];
    let mac_started = Instant::now();
    let mac = compute_record_mac(
        engine,
        conn.worker.rx.mac_job,
        seq,
        content_type,
        (content, &[][..]),
        &mut computed[..mac_len],
    );
    conn.stage_times.add_since(Stage::Mac, mac_started);

    let verified = mac.map(|_| bool::from(received[..mac_len].ct_eq(&computed[..mac_len])));
    if !matches!(verified, Ok(true)) {
        conn.rx_buffer[rx_offset..end].zeroize();
    }
    if !verified? {
        debug!("[conn {}] null record failed MAC verification", conn.id);
        return Err(StepFailure::Protocol(AlertDescription::BadRecordMac));
    }
    Ok(OpenedRecord { content_type, offset: rx_offset, len: pt_len })
}
