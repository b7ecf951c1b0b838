// ## 📂 File: `src/engine/types.rs`

//! engine/types.rs
//! Identifiers, operation modes and fault codes of the cipher engine contract.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque key handle inside the engine's key store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyId(pub u32);

/// Element slot within one key (MAC key, cipher key, IV, scratch, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyElementId(pub u32);

/// Pre-configured job: binds an algorithm to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u32);

/// A single key element, addressed as `(key, element)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyRef {
    pub key: KeyId,
    pub element: KeyElementId,
}

impl KeyRef {
    pub const fn new(key: u32, element: u32) -> Self {
        Self { key: KeyId(key), element: KeyElementId(element) }
    }

    /// Another element of the same key.
    pub const fn sibling(self, element: u32) -> Self {
        Self { key: self.key, element: KeyElementId(element) }
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for KeyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key {}/element {}", self.key.0, self.element.0)
    }
}

bitflags::bitflags! {
    /// Streaming operation mode.
    ///
    /// START binds a fresh context to the job's key, UPDATE feeds input,
    /// FINISH flushes and releases the context.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OperationMode: u8 {
        const START  = 0b0000_0001;
        const UPDATE = 0b0000_0010;
        const FINISH = 0b0000_0100;

        const STREAM_START = Self::START.bits() | Self::UPDATE.bits();
        const UPDATE_FINISH = Self::UPDATE.bits() | Self::FINISH.bits();
        const SINGLE_CALL = Self::START.bits() | Self::UPDATE.bits() | Self::FINISH.bits();
    }
}

/// Algorithm a job is configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobAlgorithm {
    /// AES-128-CBC without padding (the record layer pads itself).
    Aes128CbcEncrypt,
    Aes128CbcDecrypt,
    Aes128GcmEncrypt,
    Aes128GcmDecrypt,
    Aes256GcmEncrypt,
    Aes256GcmDecrypt,
    ChaCha20Poly1305Encrypt,
    ChaCha20Poly1305Decrypt,
    HmacSha1,
    HmacSha256,
    Random,
}

impl JobAlgorithm {
    pub fn is_aead(self) -> bool {
        matches!(
            self,
            JobAlgorithm::Aes128GcmEncrypt
                | JobAlgorithm::Aes128GcmDecrypt
                | JobAlgorithm::Aes256GcmEncrypt
                | JobAlgorithm::Aes256GcmDecrypt
                | JobAlgorithm::ChaCha20Poly1305Encrypt
                | JobAlgorithm::ChaCha20Poly1305Decrypt
        )
    }

    pub fn mac_len(self) -> Option<usize> {
        match self {
            JobAlgorithm::HmacSha1 => Some(crate::constants::SHA1_MAC_LEN),
            JobAlgorithm::HmacSha256 => Some(crate::constants::SHA256_MAC_LEN),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfig {
    pub algorithm: JobAlgorithm,
    pub key: KeyId,
}

/// Non-success return of any engine call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineFault {
    #[error("unknown job {0}")]
    UnknownJob(JobId),

    #[error("unknown key {0}")]
    UnknownKey(KeyId),

    #[error("missing key element ({0})")]
    MissingElement(KeyRef),

    #[error("key {0} used before being marked valid")]
    KeyNotValid(KeyId),

    #[error("job {job} does not support {operation}")]
    WrongAlgorithm { job: JobId, operation: &'static str },

    #[error("invalid operation mode {mode:?} for job {job}")]
    InvalidMode { job: JobId, mode: OperationMode },

    #[error("output buffer too small: needed {needed}, available {available}")]
    BufferTooSmall { needed: usize, available: usize },

    #[error("key element too large: {len} > {max}")]
    ElementTooLarge { len: usize, max: usize },

    #[error("invalid key element offset/length (offset {offset}, len {len}, element len {element_len})")]
    InvalidRange { offset: usize, len: usize, element_len: usize },

    #[error("redirected input and output alias the same element ({0})")]
    AliasedRedirect(KeyRef),

    #[error("invalid key length {len} for {algorithm:?}")]
    InvalidKeyLength { algorithm: JobAlgorithm, len: usize },

    #[error("invalid nonce/IV length {0}")]
    InvalidNonceLength(usize),

    #[error("streamed input not block aligned ({pending} bytes pending at finish)")]
    Unaligned { pending: usize },

    #[error("AEAD authentication failed")]
    AuthenticationFailed,

    #[error("entropy source failure: {0}")]
    Entropy(String),

    /// Asynchronous backend step still in progress; retry on a later poll.
    #[error("engine busy")]
    Busy,
}

impl EngineFault {
    pub fn is_busy(&self) -> bool {
        matches!(self, EngineFault::Busy)
    }

    /// Stable numeric code carried in user error reports.
    pub fn code(&self) -> u16 {
        match self {
            EngineFault::UnknownJob(_) => 0x0101,
            EngineFault::UnknownKey(_) => 0x0102,
            EngineFault::MissingElement(_) => 0x0103,
            EngineFault::KeyNotValid(_) => 0x0104,
            EngineFault::WrongAlgorithm { .. } => 0x0105,
            EngineFault::InvalidMode { .. } => 0x0106,
            EngineFault::BufferTooSmall { .. } => 0x0107,
            EngineFault::ElementTooLarge { .. } => 0x0108,
            EngineFault::InvalidRange { .. } => 0x0109,
            EngineFault::AliasedRedirect(_) => 0x010a,
            EngineFault::InvalidKeyLength { .. } => 0x010b,
            EngineFault::InvalidNonceLength(_) => 0x010c,
            EngineFault::Unaligned { .. } => 0x010d,
            EngineFault::AuthenticationFailed => 0x010e,
            EngineFault::Entropy(_) => 0x010f,
            EngineFault::Busy => 0x0110,
        }
    }
}
