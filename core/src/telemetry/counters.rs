// ### `src/telemetry/counters.rs`

//! telemetry/counters.rs
//! Mutable per-connection counters.
//!
//! Summary: Collects record counts, byte counts and failure counts as the record
//! pipeline runs. Converted into an immutable `TelemetrySnapshot` on demand.
use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Deterministic counters collected by one connection.
#[derive(Default, Clone, Debug, Encode, Decode, PartialEq, Serialize, Deserialize)]
pub struct TelemetryCounters {
    pub records_protected: u64,
    pub records_opened: u64,
    pub bytes_plaintext_tx: u64,
    pub bytes_ciphertext_tx: u64,
    pub bytes_plaintext_rx: u64,
    pub bytes_ciphertext_rx: u64,
    /// `NeedMoreSpace` returns.
    pub deferrals: u64,
    pub alerts_raised: u64,
    pub crypto_failures: u64,
    pub internal_errors: u64,
    pub key_derivations: u64,
}

impl TelemetryCounters {
    /// Record one outbound record.
    ///
    /// - `pt_len`: content length
    /// - `ct_len`: bytes written to the transport, including IV, MAC, padding or tag
    pub fn add_protected(&mut self, pt_len: usize, ct_len: usize) {
        self.records_protected += 1;
        self.bytes_plaintext_tx += pt_len as u64;
        self.bytes_ciphertext_tx += ct_len as u64;
    }

    /// Record one inbound record whose ciphertext has been processed.
    pub fn add_opened(&mut self, pt_len: usize, ct_len: usize) {
        self.records_opened += 1;
        self.bytes_plaintext_rx += pt_len as u64;
        self.bytes_ciphertext_rx += ct_len as u64;
    }

    pub fn add_deferral(&mut self) {
        self.deferrals += 1;
    }

    pub fn add_alert(&mut self) {
        self.alerts_raised += 1;
    }

    pub fn add_crypto_failure(&mut self) {
        self.crypto_failures += 1;
    }

    pub fn add_internal_error(&mut self) {
        self.internal_errors += 1;
    }

    pub fn add_key_derivation(&mut self) {
        self.key_derivations += 1;
    }

    /// Record-layer expansion in the Tx direction.
    pub fn tx_overhead_bytes(&self) -> u64 {
        self.bytes_ciphertext_tx.saturating_sub(self.bytes_plaintext_tx)
    }

    /// Fold counters from another connection into this one.
    pub fn merge(&mut self, other: &TelemetryCounters) {
        *self += other.clone();
    }

    /// Compact binary form for shipping counters off-box.
    pub fn encode(&self) -> Result<Vec<u8>, bincode::error::EncodeError> {
        bincode::encode_to_vec(self, bincode::config::standard())
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, bincode::error::DecodeError> {
        let (counters, _) = bincode::decode_from_slice(bytes, bincode::config::standard())?;
        Ok(counters)
    }
}

impl AddAssign for TelemetryCounters {
    fn add_assign(&mut self, rhs: Self) {
        self.records_protected   += rhs.records_protected;
        self.records_opened      += rhs.records_opened;
        self.bytes_plaintext_tx  += rhs.bytes_plaintext_tx;
        self.bytes_ciphertext_tx += rhs.bytes_ciphertext_tx;
        self.bytes_plaintext_rx  += rhs.bytes_plaintext_rx;
        self.bytes_ciphertext_rx += rhs.bytes_ciphertext_rx;
        self.deferrals           += rhs.deferrals;
        self.alerts_raised       += rhs.alerts_raised;
        self.crypto_failures     += rhs.crypto_failures;
        self.internal_errors     += rhs.internal_errors;
        self.key_derivations     += rhs.key_derivations;
    }
}
