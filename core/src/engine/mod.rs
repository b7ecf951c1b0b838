//! Cipher engine contract and the in-process software engine.
//!
//! Responsibilities:
//! - Job/key identifiers and the fault taxonomy of engine calls
//! - The `CipherEngine` capability interface the record layer and PRF are written against
//! - A RustCrypto implementation with an opaque key store
//!
//! Non-responsibilities:
//! - Record framing, sequence numbers, alerts

pub mod types;
pub mod traits;
pub mod software;
mod aead;
mod stream;

pub use types::{EngineFault, JobAlgorithm, JobConfig, JobId, KeyElementId, KeyId, KeyRef, OperationMode};
pub use traits::CipherEngine;
pub use software::SoftwareCipherEngine;
