//! Record protection and opening.
//!
//! Responsibilities:
//! - CBC, AEAD and NULL record formats over wrapped transport segments
//! - Record MAC and the 13-byte pseudo-header
//! - Dispatch by the negotiated bulk cipher
//!
//! Non-responsibilities:
//! - Record header framing on the wire (type/version/length prefix)
//! - Fragmentation and reassembly

pub mod types;
pub mod mac;
pub mod cbc_tx;
pub mod cbc_rx;
pub mod aead;
pub mod null;

pub use types::{
    AlertDescription, AlertLevel, BufferRequest, ContentType, DecryptedFragment, Direction, OpenedRecord,
};

use crate::connection::TlsConnection;
use crate::crypto::suites::BulkCipher;
use crate::engine::CipherEngine;
use crate::segment::{ConstSegment, Segment};
use crate::types::TlsError;

/// Protect the staged record with the negotiated cipher.
pub fn protect_record<E: CipherEngine>(
    conn: &mut TlsConnection,
    engine: &mut E,
    seg1: &mut Segment<'_>,
    seg2: &mut Segment<'_>,
) -> Result<BufferRequest, TlsError> {
    match conn.params().cipher {
        BulkCipher::Null => null::protect_record(conn, engine, seg1, seg2),
        BulkCipher::Aes128Cbc => cbc_tx::encrypt_record(conn, engine, seg1, seg2),
        BulkCipher::Aes128Gcm | BulkCipher::Aes256Gcm | BulkCipher::ChaCha20Poly1305 => {
            aead::protect_record(conn, engine, seg1, seg2)
        }
    }
}

/// Open and authenticate one record body; content lands at `rx_buffer[rx_offset..]`.
pub fn open_record<E: CipherEngine>(
    conn: &mut TlsConnection,
    engine: &mut E,
    content_type: ContentType,
    first: &mut ConstSegment<'_>,
    second: &mut ConstSegment<'_>,
    rx_offset: usize,
) -> Result<OpenedRecord, TlsError> {
    match conn.params().cipher {
        BulkCipher::Null => null::open_record(conn, engine, content_type, first, second, rx_offset),
        BulkCipher::Aes128Cbc => {
            let fragment = cbc_rx::decrypt_record(conn, engine, content_type, first, second, rx_offset)?;
            cbc_rx::verify_fragment(conn, engine, &fragment)
        }
        BulkCipher::Aes128Gcm | BulkCipher::Aes256Gcm | BulkCipher::ChaCha20Poly1305 => {
            aead::open_record(conn, engine, content_type, first, second, rx_offset)
        }
    }
}
