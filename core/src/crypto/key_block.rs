// ## 📂 File: `src/crypto/key_block.rs`

//! crypto/key_block.rs
//! Key-block sizing and slicing (RFC 5246 §6.3).
//!
//! Layout, in key-block order:
//! `client_MAC | server_MAC | client_key | server_key | client_IV | server_IV`
//! with absent fields taking zero bytes. The client's TX half is the server's RX half.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::key_block_len;
use super::suites::{BulkCipher, MacAlgorithm, SuiteParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Client,
    Server,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyBlockError {
    #[error("cipher {cipher:?} cannot be combined with MAC {mac:?}")]
    InvalidCombination { cipher: BulkCipher, mac: MacAlgorithm },
}

/// Byte ranges of one direction's material inside the key block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectionKeys {
    pub mac: Range<usize>,
    pub key: Range<usize>,
    pub iv: Range<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBlockLayout {
    pub mac_len: usize,
    pub key_len: usize,
    pub iv_len: usize,
}

impl KeyBlockLayout {
    pub fn for_cipher(cipher: BulkCipher, mac: MacAlgorithm) -> Result<Self, KeyBlockError> {
        let valid = match cipher {
            BulkCipher::Null | BulkCipher::Aes128Cbc => matches!(mac, MacAlgorithm::Sha1 | MacAlgorithm::Sha256),
            _ => mac == MacAlgorithm::Aead,
        };
        if !valid {
            return Err(KeyBlockError::InvalidCombination { cipher, mac });
        }
        Ok(Self {
            mac_len: mac.mac_len(),
            key_len: cipher.key_len(),
            iv_len: cipher.fixed_iv_len(),
        })
    }

    pub fn for_suite(params: &SuiteParams) -> Result<Self, KeyBlockError> {
        Self::for_cipher(params.cipher, params.mac)
    }

    /// Total key-block length.
    pub fn total(&self) -> usize {
        2 * (self.mac_len + self.key_len + self.iv_len)
    }

    pub fn client(&self) -> DirectionKeys {
        let key_base = 2 * self.mac_len;
        let iv_base = key_base + 2 * self.key_len;
        DirectionKeys {
            mac: 0..self.mac_len,
            key: key_base..key_base + self.key_len,
            iv: iv_base..iv_base + self.iv_len,
        }
    }

    pub fn server(&self) -> DirectionKeys {
        let key_base = 2 * self.mac_len;
        let iv_base = key_base + 2 * self.key_len;
        DirectionKeys {
            mac: self.mac_len..2 * self.mac_len,
            key: key_base + self.key_len..key_base + 2 * self.key_len,
            iv: iv_base + self.iv_len..iv_base + 2 * self.iv_len,
        }
    }

    /// `(tx, rx)` ranges for the local role.
    pub fn directions(&self, role: Role) -> (DirectionKeys, DirectionKeys) {
        match role {
            Role::Client => (self.client(), self.server()),
            Role::Server => (self.server(), self.client()),
        }
    }
}

/// Documented key-block length for a {cipher, MAC} pair.
pub fn expected_len(cipher: BulkCipher, mac: MacAlgorithm) -> Option<usize> {
    match (cipher, mac) {
        (BulkCipher::Null, MacAlgorithm::Sha1) => Some(key_block_len::NULL_SHA1),
        (BulkCipher::Null, MacAlgorithm::Sha256) => Some(key_block_len::NULL_SHA256),
        (BulkCipher::Aes128Cbc, MacAlgorithm::Sha1) => Some(key_block_len::AES128_CBC_SHA1),
        (BulkCipher::Aes128Cbc, MacAlgorithm::Sha256) => Some(key_block_len::AES128_CBC_SHA256),
        (BulkCipher::Aes128Gcm, MacAlgorithm::Aead) => Some(key_block_len::AES128_GCM),
        (BulkCipher::Aes256Gcm, MacAlgorithm::Aead) => Some(key_block_len::AES256_GCM),
        (BulkCipher::ChaCha20Poly1305, MacAlgorithm::Aead) => Some(key_block_len::CHACHA20_POLY1305),
        _ => None,
    }
}
