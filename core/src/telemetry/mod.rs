//! telemetry/mod.rs
//! Per-connection telemetry: counters, stage timers, and immutable snapshots.
//!
//! Industry notes:
//! - Stage timers mirror the per-record timings TLS libraries keep for performance analysis.
//! - Counters never include key material or record contents.

pub mod counters;
pub mod timers;
pub mod snapshot;

pub use counters::*;
pub use timers::*;
pub use snapshot::*;
