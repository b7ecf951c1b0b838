// ## 📂 File: `src/record/types.rs`

//! record/types.rs
//! Wire registries and result types of the record pipeline.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive, Serialize, Deserialize)]
pub enum ContentType {
    ChangeCipherSpec = 20,
    Alert            = 21,
    Handshake        = 22,
    ApplicationData  = 23,
}

impl ContentType {
    /// Content staged in the TLS Tx ring (as opposed to the fixed alert / CCS buffers).
    pub fn uses_tls_buffer(self) -> bool {
        matches!(self, ContentType::Handshake | ContentType::ApplicationData)
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive, Serialize, Deserialize)]
pub enum AlertLevel {
    Warning = 1,
    Fatal   = 2,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive, Serialize, Deserialize)]
pub enum AlertDescription {
    CloseNotify          = 0,
    UnexpectedMessage    = 10,
    BadRecordMac         = 20,
    RecordOverflow       = 22,
    HandshakeFailure     = 40,
    DecodeError          = 50,
    DecryptError         = 51,
    InternalError        = 80,
}

/// Outcome of a Tx call that writes into transport segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferRequest {
    /// The whole record was written.
    Complete { written: usize },
    /// Nothing was written; retry with at least `required` bytes of space.
    NeedMoreSpace { required: usize, available: usize },
}

impl BufferRequest {
    pub fn is_complete(&self) -> bool {
        matches!(self, BufferRequest::Complete { .. })
    }
}

/// Raw CBC output in the Rx buffer: content, MAC and padding, not yet verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecryptedFragment {
    pub content_type: ContentType,
    pub offset: usize,
    pub len: usize,
}

/// Authenticated record content at `rx_buffer[offset..offset + len]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenedRecord {
    pub content_type: ContentType,
    pub offset: usize,
    pub len: usize,
}

/// Traffic direction, used to pick the tx or rx bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Tx,
    Rx,
}
