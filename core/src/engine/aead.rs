// ## 📂 File: `src/engine/aead.rs`

//! engine/aead.rs
//! Single-call AEAD seal/open for AES-128-GCM, AES-256-GCM and ChaCha20-Poly1305.
//!
//! Design notes:
//! - All three ciphers take a 12-byte nonce and produce a 16-byte tag.
//! - Tag verification fails closed: nothing is copied to the caller on failure.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Aes256Gcm, Nonce as AesNonce};
use chacha20poly1305::{ChaCha20Poly1305, Nonce as ChaNonce};
use zeroize::Zeroizing;

use crate::constants::{AEAD_NONCE_LEN, AEAD_TAG_LEN};
use super::types::{EngineFault, JobAlgorithm};

enum AeadImpl {
    Aes128Gcm(Aes128Gcm),
    Aes256Gcm(Aes256Gcm),
    ChaCha(ChaCha20Poly1305),
}

impl AeadImpl {
    fn new(algorithm: JobAlgorithm, key: &[u8]) -> Result<Self, EngineFault> {
        let bad_key = |_| EngineFault::InvalidKeyLength { algorithm, len: key.len() };
        match algorithm {
            JobAlgorithm::Aes128GcmEncrypt | JobAlgorithm::Aes128GcmDecrypt => {
                Ok(Self::Aes128Gcm(Aes128Gcm::new_from_slice(key).map_err(bad_key)?))
            }
            JobAlgorithm::Aes256GcmEncrypt | JobAlgorithm::Aes256GcmDecrypt => {
                Ok(Self::Aes256Gcm(Aes256Gcm::new_from_slice(key).map_err(bad_key)?))
            }
            JobAlgorithm::ChaCha20Poly1305Encrypt | JobAlgorithm::ChaCha20Poly1305Decrypt => {
                Ok(Self::ChaCha(ChaCha20Poly1305::new_from_slice(key).map_err(bad_key)?))
            }
            _ => Err(EngineFault::InvalidKeyLength { algorithm, len: key.len() }),
        }
    }
}

fn check_nonce(nonce: &[u8]) -> Result<(), EngineFault> {
    if nonce.len() != AEAD_NONCE_LEN {
        return Err(EngineFault::InvalidNonceLength(nonce.len()));
    }
    Ok(())
}

/// Seal `input` into `output` as `ciphertext || tag`. Returns bytes written.
pub(crate) fn seal(
    algorithm: JobAlgorithm,
    key: &[u8],
    nonce: &[u8],
    aad: &[u8],
    input: &[u8],
    output: &mut [u8],
) -> Result<usize, EngineFault> {
    check_nonce(nonce)?;
    let needed = input.len() + AEAD_TAG_LEN;
    if output.len() < needed {
        return Err(EngineFault::BufferTooSmall { needed, available: output.len() });
    }

    let payload = Payload { msg: input, aad };
    let sealed = match AeadImpl::new(algorithm, key)? {
        AeadImpl::Aes128Gcm(c) => c.encrypt(AesNonce::from_slice(nonce), payload),
        AeadImpl::Aes256Gcm(c) => c.encrypt(AesNonce::from_slice(nonce), payload),
        AeadImpl::ChaCha(c) => c.encrypt(ChaNonce::from_slice(nonce), payload),
    }
    .map_err(|_| EngineFault::AuthenticationFailed)?;

    output[..sealed.len()].copy_from_slice(&sealed);
    Ok(sealed.len())
}

/// Open `ciphertext || tag` into `output`. Returns plaintext length.
pub(crate) fn open(
    algorithm: JobAlgorithm,
    key: &[u8],
    nonce: &[u8],
    aad: &[u8],
    input: &[u8],
    output: &mut [u8],
) -> Result<usize, EngineFault> {
    check_nonce(nonce)?;
    if input.len() < AEAD_TAG_LEN {
        return Err(EngineFault::AuthenticationFailed);
    }
    let needed = input.len() - AEAD_TAG_LEN;
    if output.len() < needed {
        return Err(EngineFault::BufferTooSmall { needed, available: output.len() });
    }

    let payload = Payload { msg: input, aad };
    let opened = match AeadImpl::new(algorithm, key)? {
        AeadImpl::Aes128Gcm(c) => c.decrypt(AesNonce::from_slice(nonce), payload),
        AeadImpl::Aes256Gcm(c) => c.decrypt(AesNonce::from_slice(nonce), payload),
        AeadImpl::ChaCha(c) => c.decrypt(ChaNonce::from_slice(nonce), payload),
    }
    .map_err(|_| EngineFault::AuthenticationFailed)?;
    let opened = Zeroizing::new(opened);

    output[..opened.len()].copy_from_slice(&opened);
    Ok(opened.len())
}
