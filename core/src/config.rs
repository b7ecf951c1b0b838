// ## 📂 File: `src/config.rs`

//! config.rs
//! Per-connection configuration: role, negotiated suite, buffer sizes and the
//! cipher-worker job/key bindings handed to the engine.
//!
//! Loaded from JSON (`serde_json`) or built in code; every field has a default.

use serde::{Deserialize, Serialize};

use crate::constants::{
    key_elements, DEFAULT_ECDH_FIELD_LEN, DEFAULT_RX_BUFFER_SIZE, DEFAULT_TLS_BUFFER_SIZE,
    MAX_PLAINTEXT_LEN, MAX_SHARED_VALUE_LEN,
};
use crate::crypto::key_block::Role;
use crate::crypto::suites::CipherSuite;
use crate::engine::types::{JobId, KeyId, KeyRef};
use crate::types::TlsError;

/// A job together with the key it is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobBinding {
    pub job: JobId,
    pub key: KeyId,
}

/// Jobs and keys used by one traffic direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionBinding {
    pub mac_job: JobId,
    pub mac_key: KeyId,
    pub cipher_job: JobId,
    pub cipher_key: KeyId,
}

impl DirectionBinding {
    pub fn cipher_binding(&self) -> JobBinding {
        JobBinding { job: self.cipher_job, key: self.cipher_key }
    }
}

/// Identifiers of every job and key element the core touches for one connection.
///
/// Values are opaque to the record layer; they are only passed through to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CipherWorkerConfig {
    pub random_job: JobId,
    /// HMAC-SHA256 job for master secret and key block.
    pub prf_private: JobBinding,
    /// HMAC-SHA256 job for Finished verify data.
    pub prf_public: JobBinding,
    /// Key holding the PRF's intermediate elements.
    pub prf_scratch: KeyId,
    /// Raw key-exchange output as delivered by the key-agreement primitive.
    pub shared_secret: KeyRef,
    pub pre_master: KeyRef,
    /// Dummy element used to shorten the shared value.
    pub reduction_scratch: KeyRef,
    pub master_secret: KeyRef,
    pub key_block: KeyRef,
    pub tx: DirectionBinding,
    pub rx: DirectionBinding,
}

impl Default for CipherWorkerConfig {
    fn default() -> Self {
        Self {
            random_job: JobId(1),
            prf_private: JobBinding { job: JobId(2), key: KeyId(10) },
            prf_public: JobBinding { job: JobId(3), key: KeyId(11) },
            prf_scratch: KeyId(12),
            shared_secret: KeyRef::new(20, key_elements::SHARED_VALUE),
            pre_master: KeyRef::new(21, key_elements::SECRET),
            reduction_scratch: KeyRef::new(22, key_elements::SECRET),
            master_secret: KeyRef::new(23, key_elements::SECRET),
            key_block: KeyRef::new(24, key_elements::SECRET),
            tx: DirectionBinding {
                mac_job: JobId(4),
                mac_key: KeyId(30),
                cipher_job: JobId(5),
                cipher_key: KeyId(31),
            },
            rx: DirectionBinding {
                mac_job: JobId(6),
                mac_key: KeyId(32),
                cipher_job: JobId(7),
                cipher_key: KeyId(33),
            },
        }
    }
}

impl CipherWorkerConfig {
    /// Every key this worker expects the engine to hold.
    pub fn keys(&self) -> Vec<KeyId> {
        let mut keys = vec![
            self.prf_private.key,
            self.prf_public.key,
            self.prf_scratch,
            self.shared_secret.key,
            self.pre_master.key,
            self.reduction_scratch.key,
            self.master_secret.key,
            self.key_block.key,
            self.tx.mac_key,
            self.tx.cipher_key,
            self.rx.mac_key,
            self.rx.cipher_key,
        ];
        keys.sort();
        keys.dedup();
        keys
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub connection_id: u16,
    pub role: Role,
    /// IANA cipher suite identifier.
    pub cipher_suite: u16,
    /// Plaintext staging (TLS Tx) ring size.
    pub tls_buffer_size: usize,
    pub rx_buffer_size: usize,
    /// Byte length of one field element of the negotiated curve.
    pub ecdh_field_len: usize,
    pub worker: CipherWorkerConfig,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connection_id: 0,
            role: Role::Client,
            cipher_suite: CipherSuite::EcdheEcdsaWithAes128CbcSha.id(),
            tls_buffer_size: DEFAULT_TLS_BUFFER_SIZE,
            rx_buffer_size: DEFAULT_RX_BUFFER_SIZE,
            ecdh_field_len: DEFAULT_ECDH_FIELD_LEN,
            worker: CipherWorkerConfig::default(),
        }
    }
}

impl ConnectionConfig {
    pub fn from_json(json: &str) -> Result<Self, TlsError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| TlsError::Config(format!("invalid JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, TlsError> {
        serde_json::to_string_pretty(self).map_err(|e| TlsError::Config(e.to_string()))
    }

    pub fn suite(&self) -> Result<CipherSuite, TlsError> {
        CipherSuite::from_id(self.cipher_suite)
            .ok_or_else(|| TlsError::Config(format!("unsupported cipher suite 0x{:04x}", self.cipher_suite)))
    }

    pub fn validate(&self) -> Result<(), TlsError> {
        self.suite()?;
        if self.tls_buffer_size == 0 {
            return Err(TlsError::Config("tls_buffer_size must be non-zero".into()));
        }
        if self.tls_buffer_size > MAX_PLAINTEXT_LEN {
            return Err(TlsError::Config(format!(
                "tls_buffer_size {} exceeds the record limit {}",
                self.tls_buffer_size, MAX_PLAINTEXT_LEN
            )));
        }
        if self.rx_buffer_size == 0 {
            return Err(TlsError::Config("rx_buffer_size must be non-zero".into()));
        }
        if self.ecdh_field_len == 0 || self.ecdh_field_len >= MAX_SHARED_VALUE_LEN {
            return Err(TlsError::Config(format!("ecdh_field_len {} out of range", self.ecdh_field_len)));
        }
        if self.worker.tx == self.worker.rx {
            return Err(TlsError::Config("tx and rx bindings must differ".into()));
        }
        Ok(())
    }
}
