//! tls12-record-core
//!
//! TLS 1.2 record-layer cryptography over wrapped ring buffers.
//! Key material stays behind the `CipherEngine` key-element interface.

#![forbid(unsafe_code)]

// Shared and top level
pub mod constants;
pub mod types;
pub mod utils;
pub mod config;
pub mod report;

// Buffers and the engine contract
pub mod segment;
pub mod engine;

// Protocol layers
pub mod crypto;
pub mod record;
pub mod keys;
pub mod connection;

pub mod telemetry;

// -----------------------------------------------------------------------------
// Prelude (Rust users)
// -----------------------------------------------------------------------------
pub mod prelude {
    pub use crate::config::{CipherWorkerConfig, ConnectionConfig, DirectionBinding, JobBinding};
    pub use crate::connection::{ConnectionStatus, PendingRecord, TlsConnection};
    pub use crate::crypto::{compute_verify_data, CipherSuite, PrfRequest, Role, SuiteParams};
    pub use crate::engine::{CipherEngine, EngineFault, KeyElementId, KeyId, KeyRef, SoftwareCipherEngine};
    pub use crate::keys::{
        assemble_psk_premaster, begin_key_derivation, run_key_derivation, DerivationProgress, DeriverState,
    };
    pub use crate::record::{
        open_record, protect_record, AlertDescription, AlertLevel, BufferRequest, ContentType, Direction,
        OpenedRecord,
    };
    pub use crate::report::{ErrorReporter, MemoryReporter};
    pub use crate::segment::{ConstSegment, RingBuffer, Segment};
    pub use crate::types::TlsError;
}
