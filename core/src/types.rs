//! types.rs
//! Unified error type of the record-layer core.
//!
//! - `Protocol`: the peer misbehaved; a fatal alert has been queued.
//! - `Crypto`: the cipher engine failed; the connection is aborted.
//! - `Internal`: an internal-consistency check failed before any unsafe write.
//! - `Config`: configuration could not be loaded or validated.
//!
//! Flow control is not an error; see `record::BufferRequest`.

use thiserror::Error;

use crate::crypto::key_block::KeyBlockError;
use crate::engine::types::EngineFault;
use crate::record::types::AlertDescription;
use crate::report::FunctionId;
use crate::segment::SegmentError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternalError {
    #[error("segment error: {0}")]
    Segment(#[from] SegmentError),

    #[error("key block error: {0}")]
    KeyBlock(#[from] KeyBlockError),

    #[error("rx buffer overflow: offset {offset} + len {len} > size {size}")]
    RxBufferOverflow { offset: usize, len: usize, size: usize },

    #[error("MAC+padding trailer of {len} bytes exceeds {max}")]
    TrailerOverflow { len: usize, max: usize },

    #[error("record of {len} bytes exceeds the plaintext limit {max}")]
    RecordTooLarge { len: usize, max: usize },

    #[error("no record staged for transmission")]
    NoPendingRecord,

    #[error("a record is already staged for transmission")]
    RecordPending,

    #[error("sequence number exhausted")]
    SequenceExhausted,

    #[error("shared value of {len} bytes is not usable")]
    InvalidSharedValue { len: usize },

    #[error("invalid pre-shared key length {len}")]
    InvalidPskLength { len: usize },

    #[error("operation {operation} does not apply to the negotiated cipher")]
    CipherMismatch { operation: &'static str },

    #[error("invalid state: {0}")]
    InvalidState(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TlsError {
    #[error("protocol alert {0:?}")]
    Protocol(AlertDescription),

    #[error("cryptographic failure in {function} on connection {connection}: {fault}")]
    Crypto { function: FunctionId, connection: u16, fault: EngineFault },

    #[error("internal error in {function}: {detail}")]
    Internal { function: FunctionId, detail: InternalError },

    #[error("configuration error: {0}")]
    Config(String),
}

impl TlsError {
    /// Alert to send to the peer, if the failure defines one.
    pub fn alert(&self) -> Option<AlertDescription> {
        match self {
            TlsError::Protocol(description) => Some(*description),
            TlsError::Crypto { .. } | TlsError::Internal { .. } => Some(AlertDescription::InternalError),
            TlsError::Config(_) => None,
        }
    }
}

/// Failure of one pipeline step, before the connection has escalated it.
///
/// Steps borrow parts of the connection; escalation (reporting, alert staging,
/// status change) needs the whole connection, so it happens after the step returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StepFailure {
    Crypto(EngineFault),
    Internal(InternalError),
    Protocol(AlertDescription),
}

impl From<EngineFault> for StepFailure {
    fn from(fault: EngineFault) -> Self {
        StepFailure::Crypto(fault)
    }
}

impl From<InternalError> for StepFailure {
    fn from(detail: InternalError) -> Self {
        StepFailure::Internal(detail)
    }
}

impl From<SegmentError> for StepFailure {
    fn from(e: SegmentError) -> Self {
        StepFailure::Internal(InternalError::Segment(e))
    }
}

impl From<KeyBlockError> for StepFailure {
    fn from(e: KeyBlockError) -> Self {
        StepFailure::Internal(InternalError::KeyBlock(e))
    }
}
