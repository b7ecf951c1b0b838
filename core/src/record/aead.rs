// ## 📂 File: `src/record/aead.rs`

//! record/aead.rs
//! AEAD nonce assembly and the AEAD record paths (RFC 5246 §6.2.3.3).
//!
//! Nonces:
//! - AES-GCM (RFC 5288): `implicit_iv(4) || explicit_nonce(8)`. The explicit part is the
//!   record sequence number on Tx and is read from the wire on Rx.
//! - ChaCha20-Poly1305 (RFC 7905): `iv(12) XOR (0^4 || seq(8))`; nothing travels on the wire.
//!
//! Additional data is the 13-byte MAC pseudo-header with the plaintext length.

use std::time::Instant;

use log::debug;
use zeroize::Zeroizing;

use crate::config::DirectionBinding;
use crate::connection::{Activity, TlsConnection};
use crate::constants::{
    key_elements, AEAD_TAG_LEN, CHACHA20_IV_LEN, GCM_EXPLICIT_NONCE_LEN, GCM_IMPLICIT_IV_LEN, MAX_PLAINTEXT_LEN,
};
use crate::crypto::suites::BulkCipher;
use crate::engine::{CipherEngine, EngineFault, KeyElementId, KeyId, KeyRef};
use crate::report::FunctionId;
use crate::segment::{multi_source_copy, multi_target_copy, ConstSegment, Segment};
use crate::types::{InternalError, StepFailure, TlsError};
use super::mac::{header_len, record_header};
use super::types::{AlertDescription, BufferRequest, ContentType, Direction, OpenedRecord};

fn element(key: KeyId, id: u32) -> KeyRef {
    KeyRef { key, element: KeyElementId(id) }
}

/// Assemble the nonce for the next record of `direction` inside the key store and mark
/// the cipher key valid. `explicit` is the 8-byte explicit nonce (GCM) or sequence number
/// (ChaCha20-Poly1305).
pub fn set_aead_iv<E: CipherEngine>(
    conn: &mut TlsConnection,
    engine: &mut E,
    direction: Direction,
    explicit: &[u8],
) -> Result<(), TlsError> {
    conn.ensure_usable(FunctionId::SetAeadIv, Activity::Keys)?;
    let binding = match direction {
        Direction::Tx => conn.worker.tx,
        Direction::Rx => conn.worker.rx,
    };
    let cipher = conn.params.cipher;
    assemble_nonce(engine, &binding, cipher, explicit).map_err(|f| conn.escalate(FunctionId::SetAeadIv, f))
}

pub(crate) fn assemble_nonce<E: CipherEngine>(
    engine: &mut E,
    binding: &DirectionBinding,
    cipher: BulkCipher,
    explicit: &[u8],
) -> Result<(), StepFailure> {
    if explicit.len() != GCM_EXPLICIT_NONCE_LEN {
        return Err(InternalError::InvalidState("explicit nonce must be 8 bytes").into());
    }
    let key = binding.cipher_key;
    match cipher {
        BulkCipher::Aes128Gcm | BulkCipher::Aes256Gcm => {
            let staged = element(key, key_elements::EXPLICIT_IV);
            engine.key_element_set(staged, explicit)?;
            let copied = copy_gcm_nonce(engine, key, staged);
            let cleared = engine.key_element_set(staged, &[]);
            copied?;
            cleared?;
        }
        BulkCipher::ChaCha20Poly1305 => {
            let mut nonce = Zeroizing::new([0u8; CHACHA20_IV_LEN]);
            let len = engine.key_element_get(element(key, key_elements::IMPLICIT_IV), &mut nonce[..])?;
            if len != CHACHA20_IV_LEN {
                return Err(InternalError::InvalidState("chacha20 fixed IV must be 12 bytes").into());
            }
            for (n, e) in nonce[CHACHA20_IV_LEN - GCM_EXPLICIT_NONCE_LEN..].iter_mut().zip(explicit) {
                *n ^= e;
            }
            engine.key_element_set(element(key, key_elements::CIPHER_IV), &nonce[..])?;
        }
        BulkCipher::Null | BulkCipher::Aes128Cbc => {
            return Err(InternalError::CipherMismatch { operation: "aead nonce" }.into());
        }
    }
    engine.key_set_valid(key)?;
    Ok(())
}

fn copy_gcm_nonce<E: CipherEngine>(engine: &mut E, key: KeyId, staged: KeyRef) -> Result<(), EngineFault> {
    let nonce = element(key, key_elements::CIPHER_IV);
    engine.key_element_copy_partial(element(key, key_elements::IMPLICIT_IV), 0, 0, GCM_IMPLICIT_IV_LEN, nonce)?;
    engine.key_element_copy_partial(staged, 0, GCM_IMPLICIT_IV_LEN, GCM_EXPLICIT_NONCE_LEN, nonce)
}

/// Seal the staged record as `explicit_nonce || ciphertext || tag` across `seg1`/`seg2`.
pub fn protect_record<E: CipherEngine>(
    conn: &mut TlsConnection,
    engine: &mut E,
    seg1: &mut Segment<'_>,
    seg2: &mut Segment<'_>,
) -> Result<BufferRequest, TlsError> {
    conn.ensure_usable(FunctionId::ProtectAead, Activity::Protect)?;
    protect_pending(conn, engine, seg1, seg2).map_err(|f| conn.escalate(FunctionId::ProtectAead, f))
}

fn protect_pending<E: CipherEngine>(
    conn: &mut TlsConnection,
    engine: &mut E,
    seg1: &mut Segment<'_>,
    seg2: &mut Segment<'_>,
) -> Result<BufferRequest, StepFailure> {
    let record = conn.tx_record.ok_or(InternalError::NoPendingRecord)?;
    let cipher = conn.params.cipher;
    if !cipher.is_aead() {
        return Err(InternalError::CipherMismatch { operation: "aead protect" }.into());
    }

    let explicit_len = cipher.record_iv_len();
    let required = record.len + conn.params.record_overhead();
    let available = seg1.avail_len() + seg2.avail_len();
    if available < required {
        conn.telemetry.add_deferral();
        debug!("[conn {}] aead record deferred: {} required, {} available", conn.id, required, available);
        return Ok(BufferRequest::NeedMoreSpace { required, available });
    }

    let seq = conn.next_tx_seq()?;
    let started = Instant::now();
    let explicit = seq.to_be_bytes();
    let tx = conn.worker.tx;
    assemble_nonce(engine, &tx, cipher, &explicit)?;
    let aad = record_header(seq, record.content_type, header_len(record.len)?);

    let written = {
        let (first, second) = conn.content_regions(&record)?;
        let mut plain = Zeroizing::new(Vec::with_capacity(record.len));
        plain.extend_from_slice(first);
        plain.extend_from_slice(second);

        let mut sealed = Zeroizing::new(vec![0u8; record.len + AEAD_TAG_LEN]);
        let n = engine.aead_encrypt(tx.cipher_job, &aad, &plain, &mut sealed)?;

        let (mark1, mark2) = (seg1.usage(), seg2.usage());
        let copied = multi_target_copy(seg1, seg2, &explicit[..explicit_len])
            .and_then(|_| multi_target_copy(seg1, seg2, &sealed[..n]));
        if let Err(e) = copied {
            seg1.rewind(mark1)?;
            seg2.rewind(mark2)?;
            return Err(e.into());
        }
        explicit_len + n
    };

    conn.complete_tx_record(&record, written, started)?;
    Ok(BufferRequest::Complete { written })
}

/// Open one AEAD record into `rx_buffer[rx_offset..]`. A failed tag raises `bad_record_mac`.
pub fn open_record<E: CipherEngine>(
    conn: &mut TlsConnection,
    engine: &mut E,
    content_type: ContentType,
    first: &mut ConstSegment<'_>,
    second: &mut ConstSegment<'_>,
    rx_offset: usize,
) -> Result<OpenedRecord, TlsError> {
    conn.ensure_usable(FunctionId::OpenAead, Activity::Open)?;
    let started = Instant::now();
    let ct_len = first.remaining() + second.remaining();
    match open_into_rx(conn, engine, content_type, first, second, rx_offset) {
        Ok(record) => {
            conn.complete_rx_record(record.len, ct_len, started);
            Ok(record)
        }
        Err(f) => Err(conn.escalate(FunctionId::OpenAead, f)),
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
    let cipher = conn.params.cipher;
    if !cipher.is_aead() {
        return Err(InternalError::CipherMismatch { operation: "aead open" }.into());
    }

    let total = first.remaining() + second.remaining();
    let explicit_len = cipher.record_iv_len();
    if total < explicit_len + AEAD_TAG_LEN {
        return Err(StepFailure::Protocol(AlertDescription::DecodeError));
    }
    let pt_len = total - explicit_len - AEAD_TAG_LEN;
    if pt_len > MAX_PLAINTEXT_LEN {
        return Err(StepFailure::Protocol(AlertDescription::RecordOverflow));
    }

    let size = conn.rx_buffer.len();
    let end = rx_offset
        .checked_add(pt_len)
        .filter(|end| *end <= size)
        .ok_or(InternalError::RxBufferOverflow { offset: rx_offset, len: pt_len, size })?;

    let seq = conn.next_rx_seq()?;
    let mut explicit = seq.to_be_bytes();
    if explicit_len > 0 {
        multi_source_copy(first, second, &mut explicit[..])?;
    }
    let rx = conn.worker.rx;
    assemble_nonce(engine, &rx, cipher, &explicit)?;

    let aad = record_header(seq, content_type, header_len(pt_len)?);
    let mut sealed = Zeroizing::new(vec![0u8; total - explicit_len]);
    multi_source_copy(first, second, &mut sealed)?;

    let out = &mut conn.rx_buffer[rx_offset..end];
    match engine.aead_decrypt(rx.cipher_job, &aad, &sealed, out) {
        Ok(n) if n == pt_len => Ok(OpenedRecord { content_type, offset: rx_offset, len: pt_len }),
        Ok(_) => Err(InternalError::InvalidState("aead plaintext length mismatch").into()),
        Err(EngineFault::AuthenticationFailed) => {
            debug!("[conn {}] aead tag verification failed", conn.id);
            Err(StepFailure::Protocol(AlertDescription::BadRecordMac))
        }
        Err(fault) => Err(fault.into()),
    }
}
