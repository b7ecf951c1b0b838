// ## 📂 File: `src/record/cbc_rx.rs`

//! record/cbc_rx.rs
//! AES-128-CBC record decryption and verification.
//!
//! `decrypt_record` turns `IV || ciphertext`, delivered as up to two segments around the
//! transport wrap point, into raw plaintext (content, MAC, padding) in the Rx buffer.
//! `verify_fragment` then checks padding and MAC and reports a single `bad_record_mac`
//! for either failure. Plaintext of a record that fails either step is wiped from the
//! Rx buffer.

use std::time::Instant;

use log::debug;
use subtle::{Choice, ConstantTimeEq};
use zeroize::{Zeroize, Zeroizing};

use crate::connection::{Activity, TlsConnection};
use crate::constants::{key_elements, AES_BLOCK_LEN, MAX_CIPHERTEXT_LEN, MAX_MAC_LEN};
use crate::crypto::suites::BulkCipher;
use crate::engine::{CipherEngine, EngineFault, JobId, KeyElementId, KeyRef, OperationMode};
use crate::report::FunctionId;
use crate::segment::{multi_source_copy, ConstSegment};
use crate::telemetry::Stage;
use crate::types::{InternalError, StepFailure, TlsError};
use crate::utils::round_up_block;
use super::mac::compute_record_mac;
use super::types::{AlertDescription, ContentType, DecryptedFragment, OpenedRecord};

/// Largest span padding can occupy: 255 padding bytes plus the length byte.
const MAX_PADDING_WINDOW: usize = 256;

/// Decrypt one CBC record into `rx_buffer[rx_offset..]`.
///
/// - Longer than a TLSCiphertext fragment: `record_overflow`, nothing decrypted.
/// - Length not a multiple of the block size, or too short for IV + MAC + padding:
///   `decode_error`, nothing decrypted.
/// - Plaintext would run past the Rx buffer: internal error, nothing written.
///
/// Both segments are fully consumed on success.
pub fn decrypt_record<E: CipherEngine>(
    conn: &mut TlsConnection,
    engine: &mut E,
    content_type: ContentType,
    first: &mut ConstSegment<'_>,
    second: &mut ConstSegment<'_>,
    rx_offset: usize,
) -> Result<DecryptedFragment, TlsError> {
    conn.ensure_usable(FunctionId::DecryptRecord, Activity::Open)?;
    decrypt_into_rx(conn, engine, content_type, first, second, rx_offset)
        .map_err(|f| conn.escalate(FunctionId::DecryptRecord, f))
}

fn decrypt_into_rx<E: CipherEngine>(
    conn: &mut TlsConnection,
    engine: &mut E,
    content_type: ContentType,
    first: &mut ConstSegment<'_>,
    second: &mut ConstSegment<'_>,
    rx_offset: usize,
) -> Result<DecryptedFragment, StepFailure> {
    if conn.params.cipher != BulkCipher::Aes128Cbc {
        return Err(InternalError::CipherMismatch { operation: "cbc decrypt" }.into());
    }

    let total = first.remaining() + second.remaining();
    if total > MAX_CIPHERTEXT_LEN {
        debug!("[conn {}] cbc record of {} bytes exceeds the ciphertext limit", conn.id, total);
        return Err(StepFailure::Protocol(AlertDescription::RecordOverflow));
    }
    let min_len = AES_BLOCK_LEN + round_up_block(conn.params.mac_len() + 1);
    if total % AES_BLOCK_LEN != 0 || total < min_len {
        debug!("[conn {}] cbc record of {} bytes rejected before decryption", conn.id, total);
        return Err(StepFailure::Protocol(AlertDescription::DecodeError));
    }

    let body_len = total - AES_BLOCK_LEN;
    let size = conn.rx_buffer.len();
    let end = rx_offset
        .checked_add(body_len)
        .filter(|end| *end <= size)
        .ok_or(InternalError::RxBufferOverflow { offset: rx_offset, len: body_len, size })?;

    let cipher = conn.worker.rx.cipher_binding();
    {
        let mut iv = Zeroizing::new([0u8; AES_BLOCK_LEN]);
        if first.remaining() < AES_BLOCK_LEN {
            debug!("[conn {}] cbc IV straddles the transport wrap point", conn.id);
        }
        multi_source_copy(first, second, &mut iv[..])?;
        let target = KeyRef { key: cipher.key, element: KeyElementId(key_elements::CIPHER_IV) };
        engine.key_element_set(target, &iv[..])?;
        engine.key_set_valid(cipher.key)?;
    }

    let part1 = first.read_rest();
    let part2 = second.read_rest();
    let out = &mut conn.rx_buffer[rx_offset..end];
    let written = match decrypt_body(engine, cipher.job, part1, part2, out) {
        Ok(written) => written,
        Err(fault) => {
            out.zeroize();
            return Err(fault.into());
        }
    };
    if written != body_len {
        out.zeroize();
        return Err(InternalError::InvalidState("cbc plaintext length differs from ciphertext body").into());
    }
    Ok(DecryptedFragment { content_type, offset: rx_offset, len: body_len })
}

fn decrypt_body<E: CipherEngine>(
    engine: &mut E,
    job: JobId,
    part1: &[u8],
    part2: &[u8],
    out: &mut [u8],
) -> Result<usize, EngineFault> {
    if part1.is_empty() {
        return engine.decrypt(job, OperationMode::SINGLE_CALL, part2, out);
    }
    let head = engine.decrypt(job, OperationMode::STREAM_START, part1, out)?;
    Ok(head + engine.decrypt(job, OperationMode::UPDATE_FINISH, part2, &mut out[head..])?)
}

/// Check padding and MAC of a decrypted fragment; on success the Rx sequence number advances.
///
/// The padding scan touches the same window whatever the padding length. The MAC runs
/// over the content only, so its cost still follows the decrypted padding length.
pub fn verify_fragment<E: CipherEngine>(
    conn: &mut TlsConnection,
    engine: &mut E,
    fragment: &DecryptedFragment,
) -> Result<OpenedRecord, TlsError> {
    conn.ensure_usable(FunctionId::VerifyRecord, Activity::Open)?;
    let started = Instant::now();
    match verify_in_place(conn, engine, fragment) {
        Ok(record) => {
            conn.complete_rx_record(record.len, fragment.len + AES_BLOCK_LEN, started);
            Ok(record)
        }
        Err(f) => Err(conn.escalate(FunctionId::VerifyRecord, f)),
    }
}

fn verify_in_place<E: CipherEngine>(
    conn: &mut TlsConnection,
    engine: &mut E,
    fragment: &DecryptedFragment,
) -> Result<OpenedRecord, StepFailure> {
    let seq = conn.next_rx_seq()?;
    let mac_len = conn.params.mac_len();
    let end = fragment
        .offset
        .checked_add(fragment.len)
        .filter(|end| *end <= conn.rx_buffer.len())
        .ok_or(InternalError::RxBufferOverflow {
            offset: fragment.offset,
            len: fragment.len,
            size: conn.rx_buffer.len(),
        })?;
    if fragment.len < mac_len + 1 {
        conn.rx_buffer[fragment.offset..end].zeroize();
        return Err(StepFailure::Protocol(AlertDescription::DecodeError));
    }

    let plain = &conn.rx_buffer[fragment.offset..end];
    let pad = plain[plain.len() - 1] as usize;

    // Every position a padding byte could occupy is compared, so the work done does
    // not depend on the padding length.
    let fits = pad + 1 + mac_len <= plain.len();
    let mut good = Choice::from(fits as u8);
    let window = MAX_PADDING_WINDOW.min(plain.len());
    for (i, byte) in plain[plain.len() - window..].iter().rev().enumerate() {
        let in_padding = Choice::from((i <= pad) as u8);
        let matches = byte.ct_eq(&(pad as u8));
        good &= !in_padding | matches;
    }

    let content_len = if fits { plain.len() - mac_len - pad - 1 } else { plain.len() - mac_len - 1 };
    let received = &plain[content_len..content_len + mac_len];

    let mut computed = Zeroizing::new([0u8; MAX_MAC_LEN]);
    let mac_started = Instant::now();
    let mac = compute_record_mac(
        engine,
        conn.worker.rx.mac_job,
        seq,
        fragment.content_type,
        (&plain[..content_len], &[][..]),
        &mut computed[..mac_len],
    );
    conn.stage_times.add_since(Stage::Mac, mac_started);
    let verified = match mac {
        Ok(_) => bool::from(good & received.ct_eq(&computed[..mac_len])),
        Err(failure) => {
            conn.rx_buffer[fragment.offset..end].zeroize();
            return Err(failure);
        }
    };

    if !verified {
        conn.rx_buffer[fragment.offset..end].zeroize();
        debug!("[conn {}] cbc record failed padding/MAC verification", conn.id);
        return Err(StepFailure::Protocol(AlertDescription::BadRecordMac));
    }
    Ok(OpenedRecord { content_type: fragment.content_type, offset: fragment.offset, len: content_len })
}
