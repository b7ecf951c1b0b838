// ## 📂 File: `src/record/cbc_tx.rs`

//! record/cbc_tx.rs
//! AES-128-CBC record protection: `IV || E(content || MAC || padding)`.
//!
//! Flow:
//! - Space check first. When the destination pair cannot hold the whole record, nothing
//!   is written, no IV is drawn, and the staged record stays pending (`NeedMoreSpace`).
//! - The MAC is computed over the (possibly wrapped) content and combined with the
//!   padding into one bounded trailer.
//! - Contiguous destination: the IV is generated in place and ciphertext is streamed
//!   straight into the segment.
//! - Split destination: the IV and every ciphertext chunk (two blocks at a time) pass
//!   through bounded scratch and are spread with `multi_target_copy`.
//!
//! Content wrapped in the TLS ring is fed as two regions in either path; the engine's
//! partial-block carry makes the TLS wrap point independent of the block grid.

use std::time::Instant;

use log::debug;
use zeroize::Zeroizing;

use crate::config::{CipherWorkerConfig, DirectionBinding};
use crate::connection::{Activity, TlsConnection};
use crate::constants::{key_elements, AES_BLOCK_LEN, CBC_CHUNK_LEN, MAX_TRAILER_LEN};
use crate::crypto::suites::BulkCipher;
use crate::engine::{CipherEngine, KeyElementId, KeyRef, OperationMode};
use crate::report::FunctionId;
use crate::segment::{multi_target_copy, Segment};
use crate::telemetry::Stage;
use crate::types::{InternalError, StepFailure, TlsError};
use crate::utils::padding_len;
use super::mac::compute_record_mac;
use super::types::BufferRequest;

/// Encrypt the staged record into `seg1` then `seg2`.
///
/// `NeedMoreSpace` is returned (and nothing written) when the pair is too small;
/// calling again with more space yields the same record.
pub fn encrypt_record<E: CipherEngine>(
    conn: &mut TlsConnection,
    engine: &mut E,
    seg1: &mut Segment<'_>,
    seg2: &mut Segment<'_>,
) -> Result<BufferRequest, TlsError> {
    conn.ensure_usable(FunctionId::EncryptRecord, Activity::Protect)?;
    encrypt_pending(conn, engine, seg1, seg2).map_err(|f| conn.escalate(FunctionId::EncryptRecord, f))
}

fn encrypt_pending<E: CipherEngine>(
    conn: &mut TlsConnection,
    engine: &mut E,
    seg1: &mut Segment<'_>,
    seg2: &mut Segment<'_>,
) -> Result<BufferRequest, StepFailure> {
    let record = conn.tx_record.ok_or(InternalError::NoPendingRecord)?;
    if conn.params.cipher != BulkCipher::Aes128Cbc {
        return Err(InternalError::CipherMismatch { operation: "cbc encrypt" }.into());
    }

    let mac_len = conn.params.mac_len();
    let padding = padding_len(record.len, mac_len);
    let trailer_len = mac_len + padding + 1;
    if trailer_len > MAX_TRAILER_LEN {
        return Err(InternalError::TrailerOverflow { len: trailer_len, max: MAX_TRAILER_LEN }.into());
    }

    let required = AES_BLOCK_LEN + record.len + trailer_len;
    let available = seg1.avail_len() + seg2.avail_len();
    if available < required {
        conn.telemetry.add_deferral();
        debug!(
            "[conn {}] cbc record deferred: {} bytes required, {} available",
            conn.id, required, available
        );
        return Ok(BufferRequest::NeedMoreSpace { required, available });
    }

    let seq = conn.next_tx_seq()?;
    let worker = conn.worker;
    let started = Instant::now();
    let (mark1, mark2) = (seg1.usage(), seg2.usage());
    let mac_elapsed;

    let written = {
        let regions = conn.content_regions(&record)?;
        let mut trailer = Zeroizing::new([0u8; MAX_TRAILER_LEN]);
        let mac_started = Instant::now();
        compute_record_mac(engine, worker.tx.mac_job, seq, record.content_type, regions, &mut trailer[..mac_len])?;
        mac_elapsed = mac_started.elapsed();
        trailer[mac_len..trailer_len].fill(padding as u8);

        let result = if seg1.avail_len() >= required {
            debug!("[conn {}] cbc record: contiguous path (seg1), {} bytes", conn.id, required);
            encrypt_contiguous(engine, &worker, seg1, regions, &trailer[..trailer_len])
        } else if seg1.avail_len() == 0 {
            debug!("[conn {}] cbc record: contiguous path (seg2), {} bytes", conn.id, required);
            encrypt_contiguous(engine, &worker, seg2, regions, &trailer[..trailer_len])
        } else {
            debug!(
                "[conn {}] cbc record: split path, {} + {} bytes",
                conn.id,
                seg1.avail_len(),
                required - seg1.avail_len()
            );
            encrypt_split(engine, &worker, seg1, seg2, regions, &trailer[..trailer_len])
        };

        if result.is_err() {
            seg1.rewind(mark1)?;
            seg2.rewind(mark2)?;
        }
        result?;
        (seg1.usage() - mark1) + (seg2.usage() - mark2)
    };

    if written != required {
        return Err(InternalError::InvalidState("cbc output length differs from record length").into());
    }
    conn.stage_times.add(Stage::Mac, mac_elapsed);
    conn.complete_tx_record(&record, written, started)?;
    Ok(BufferRequest::Complete { written })
}

/// Install a fresh explicit IV as the Tx cipher's IV element.
fn install_iv<E: CipherEngine>(engine: &mut E, binding: &DirectionBinding, iv: &[u8]) -> Result<(), StepFailure> {
    let target = KeyRef { key: binding.cipher_key, element: KeyElementId(key_elements::CIPHER_IV) };
    engine.key_element_set(target, iv)?;
    engine.key_set_valid(binding.cipher_key)?;
    Ok(())
}

fn encrypt_contiguous<E: CipherEngine>(
    engine: &mut E,
    worker: &CipherWorkerConfig,
    dst: &mut Segment<'_>,
    regions: (&[u8], &[u8]),
    trailer: &[u8],
) -> Result<(), StepFailure> {
    let job = worker.tx.cipher_job;

    {
        let iv = &mut dst.avail_mut()[..AES_BLOCK_LEN];
        engine.random_generate(worker.random_job, iv)?;
        install_iv(engine, &worker.tx, iv)?;
    }
    dst.commit(AES_BLOCK_LEN)?;

    let mut mode = OperationMode::STREAM_START;
    for region in [regions.0, regions.1] {
        if region.is_empty() {
            continue;
        }
        let n = engine.encrypt(job, mode, region, dst.avail_mut())?;
        dst.commit(n)?;
        mode = OperationMode::UPDATE;
    }

    let n = engine.encrypt(job, mode | OperationMode::FINISH, trailer, dst.avail_mut())?;
    dst.commit(n)?;
    Ok(())
}

fn encrypt_split<E: CipherEngine>(
    engine: &mut E,
    worker: &CipherWorkerConfig,
    seg1: &mut Segment<'_>,
    seg2: &mut Segment<'_>,
    regions: (&[u8], &[u8]),
    trailer: &[u8],
) -> Result<(), StepFailure> {
    let job = worker.tx.cipher_job;

    let mut iv = Zeroizing::new([0u8; AES_BLOCK_LEN]);
    engine.random_generate(worker.random_job, &mut iv[..])?;
    install_iv(engine, &worker.tx, &iv[..])?;
    multi_target_copy(seg1, seg2, &iv[..])?;

    // A chunk plus the carried partial block never yields more than MAX_TRAILER_LEN bytes.
    let mut scratch = Zeroizing::new([0u8; MAX_TRAILER_LEN]);
    let mut mode = OperationMode::STREAM_START;
    for region in [regions.0, regions.1] {
        for chunk in region.chunks(CBC_CHUNK_LEN) {
            let n = engine.encrypt(job, mode, chunk, &mut scratch[..])?;
            multi_target_copy(seg1, seg2, &scratch[..n])?;
            mode = OperationMode::UPDATE;
        }
    }

    let n = engine.encrypt(job, mode | OperationMode::FINISH, trailer, &mut scratch[..])?;
    multi_target_copy(seg1, seg2, &scratch[..n])?;
    Ok(())
}
