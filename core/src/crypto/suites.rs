// ## 📂 File: `src/crypto/suites.rs`

//! crypto/suites.rs
//! Cipher suite registry and the per-suite parameters the record layer needs.
//!
//! Industry notes:
//! - Every supported suite uses the SHA-256 TLS 1.2 PRF. The SHA384 suffix of
//!   ECDHE_ECDSA_WITH_AES_256_GCM_SHA384 is accepted for interop testing, but
//!   key derivation still runs P_SHA256.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

use crate::constants::{
    suite_ids, AEAD_TAG_LEN, AES128_KEY_LEN, AES256_KEY_LEN, AES_BLOCK_LEN, CHACHA20_IV_LEN,
    CHACHA20_KEY_LEN, GCM_EXPLICIT_NONCE_LEN, GCM_IMPLICIT_IV_LEN, SHA1_MAC_LEN, SHA256_MAC_LEN,
};

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive, Serialize, Deserialize)]
pub enum CipherSuite {
    PskWithNullSha = suite_ids::PSK_WITH_NULL_SHA,
    PskWithAes128CbcSha = suite_ids::PSK_WITH_AES_128_CBC_SHA,
    PskWithAes128GcmSha256 = suite_ids::PSK_WITH_AES_128_GCM_SHA256,
    PskWithAes128CbcSha256 = suite_ids::PSK_WITH_AES_128_CBC_SHA256,
    PskWithNullSha256 = suite_ids::PSK_WITH_NULL_SHA256,
    EcdheEcdsaWithNullSha = suite_ids::ECDHE_ECDSA_WITH_NULL_SHA,
    EcdheEcdsaWithAes128CbcSha = suite_ids::ECDHE_ECDSA_WITH_AES_128_CBC_SHA,
    EcdheEcdsaWithAes128CbcSha256 = suite_ids::ECDHE_ECDSA_WITH_AES_128_CBC_SHA256,
    EcdheEcdsaWithAes128GcmSha256 = suite_ids::ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
    EcdheEcdsaWithAes256GcmSha384 = suite_ids::ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
    EcdheEcdsaWithChaCha20Poly1305Sha256 = suite_ids::ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyExchange {
    Psk,
    Ecdhe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BulkCipher {
    Null,
    Aes128Cbc,
    Aes128Gcm,
    Aes256Gcm,
    ChaCha20Poly1305,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MacAlgorithm {
    Sha1,
    Sha256,
    /// Integrity comes from the AEAD tag.
    Aead,
}

impl BulkCipher {
    pub fn key_len(self) -> usize {
        match self {
            BulkCipher::Null => 0,
            BulkCipher::Aes128Cbc | BulkCipher::Aes128Gcm => AES128_KEY_LEN,
            BulkCipher::Aes256Gcm => AES256_KEY_LEN,
            BulkCipher::ChaCha20Poly1305 => CHACHA20_KEY_LEN,
        }
    }

    /// Fixed IV bytes taken from the key block (the CBC IV travels with each record).
    pub fn fixed_iv_len(self) -> usize {
        match self {
            BulkCipher::Null | BulkCipher::Aes128Cbc => 0,
            BulkCipher::Aes128Gcm | BulkCipher::Aes256Gcm => GCM_IMPLICIT_IV_LEN,
            BulkCipher::ChaCha20Poly1305 => CHACHA20_IV_LEN,
        }
    }

    /// Per-record IV bytes carried on the wire.
    pub fn record_iv_len(self) -> usize {
        match self {
            BulkCipher::Aes128Cbc => AES_BLOCK_LEN,
            BulkCipher::Aes128Gcm | BulkCipher::Aes256Gcm => GCM_EXPLICIT_NONCE_LEN,
            BulkCipher::Null | BulkCipher::ChaCha20Poly1305 => 0,
        }
    }

    pub fn is_aead(self) -> bool {
        matches!(self, BulkCipher::Aes128Gcm | BulkCipher::Aes256Gcm | BulkCipher::ChaCha20Poly1305)
    }
}

impl MacAlgorithm {
    pub fn mac_len(self) -> usize {
        match self {
            MacAlgorithm::Sha1 => SHA1_MAC_LEN,
            MacAlgorithm::Sha256 => SHA256_MAC_LEN,
            MacAlgorithm::Aead => 0,
        }
    }
}

/// Everything the record layer and the deriver need to know about a suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteParams {
    pub key_exchange: KeyExchange,
    pub cipher: BulkCipher,
    pub mac: MacAlgorithm,
}

impl SuiteParams {
    pub fn mac_len(&self) -> usize {
        self.mac.mac_len()
    }

    pub fn key_len(&self) -> usize {
        self.cipher.key_len()
    }

    pub fn fixed_iv_len(&self) -> usize {
        self.cipher.fixed_iv_len()
    }

    /// Record expansion beyond the plaintext, excluding CBC padding.
    pub fn record_overhead(&self) -> usize {
        let tag = if self.cipher.is_aead() { AEAD_TAG_LEN } else { 0 };
        self.cipher.record_iv_len() + self.mac_len() + tag
    }
}

impl CipherSuite {
    /// Resolve an IANA identifier; `None` for suites this core does not implement.
    pub fn from_id(id: u16) -> Option<Self> {
        Self::try_from(id).ok()
    }

    pub fn id(self) -> u16 {
        self.into()
    }

    pub fn params(self) -> SuiteParams {
        use BulkCipher::*;
        use KeyExchange::*;
        use MacAlgorithm::*;

        let (key_exchange, cipher, mac) = match self {
            CipherSuite::PskWithNullSha => (Psk, Null, Sha1),
            CipherSuite::PskWithNullSha256 => (Psk, Null, Sha256),
            CipherSuite::PskWithAes128CbcSha => (Psk, Aes128Cbc, Sha1),
            CipherSuite::PskWithAes128CbcSha256 => (Psk, Aes128Cbc, Sha256),
            CipherSuite::PskWithAes128GcmSha256 => (Psk, Aes128Gcm, Aead),
            CipherSuite::EcdheEcdsaWithNullSha => (Ecdhe, Null, Sha1),
            CipherSuite::EcdheEcdsaWithAes128CbcSha => (Ecdhe, Aes128Cbc, Sha1),
            CipherSuite::EcdheEcdsaWithAes128CbcSha256 => (Ecdhe, Aes128Cbc, Sha256),
            CipherSuite::EcdheEcdsaWithAes128GcmSha256 => (Ecdhe, Aes128Gcm, Aead),
            CipherSuite::EcdheEcdsaWithAes256GcmSha384 => (Ecdhe, Aes256Gcm, Aead),
            CipherSuite::EcdheEcdsaWithChaCha20Poly1305Sha256 => (Ecdhe, ChaCha20Poly1305, Aead),
        };
        SuiteParams { key_exchange, cipher, mac }
    }
}
