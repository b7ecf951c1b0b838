// ## src/telemetry/snapshot.rs

//! telemetry/snapshot.rs
//! Immutable view of a connection's counters and stage timings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::telemetry::counters::TelemetryCounters;
use crate::telemetry::timers::{Stage, StageTimes};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub connection_id: u16,
    pub counters: TelemetryCounters,
    /// `bytes_ciphertext_tx / bytes_plaintext_tx`; 0 when nothing was sent.
    pub tx_expansion_ratio: f64,
    pub stage_times: StageTimes,
}

impl TelemetrySnapshot {
    pub fn from(connection_id: u16, counters: &TelemetryCounters, stage_times: &StageTimes) -> Self {
        let tx_expansion_ratio = if counters.bytes_plaintext_tx > 0 {
            counters.bytes_ciphertext_tx as f64 / counters.bytes_plaintext_tx as f64
        } else {
            0.0
        };

        Self {
            connection_id,
            counters: counters.clone(),
            tx_expansion_ratio,
            stage_times: stage_times.clone(),
        }
    }

    pub fn total_stage_time(&self) -> Duration {
        self.stage_times.total()
    }

    pub fn has_all_stages(&self, expected: &[Stage]) -> bool {
        self.stage_times.has_all(expected)
    }

    /// Ciphertext byte counts never fall below their plaintext counts.
    pub fn sanity_check(&self) -> bool {
        let c = &self.counters;
        c.bytes_ciphertext_tx >= c.bytes_plaintext_tx && c.bytes_ciphertext_rx >= c.bytes_plaintext_rx
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
