// ## 📂 File: `src/engine/stream.rs`

//! engine/stream.rs
//! Streaming contexts held by the software engine between START and FINISH.
//!
//! - CBC contexts carry a partial block across calls and only ever emit whole blocks,
//!   so the bytes produced by one call can be fewer than the bytes fed in.
//! - HMAC contexts absorb input until FINISH writes the tag.

use aes::Aes128;
use cbc::cipher::generic_array::GenericArray;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::constants::AES_BLOCK_LEN;
use super::types::{EngineFault, JobAlgorithm};

pub(crate) enum StreamState {
    Cbc(CbcStream),
    Mac(MacStream),
}

enum CbcCipher {
    Encrypt(cbc::Encryptor<Aes128>),
    Decrypt(cbc::Decryptor<Aes128>),
}

pub(crate) struct CbcStream {
    cipher: CbcCipher,
    pending: [u8; AES_BLOCK_LEN],
    pending_len: usize,
}

impl CbcStream {
    pub(crate) fn new(algorithm: JobAlgorithm, key: &[u8], iv: &[u8]) -> Result<Self, EngineFault> {
        let bad_key = || EngineFault::InvalidKeyLength { algorithm, len: key.len() };
        if iv.len() != AES_BLOCK_LEN {
            return Err(EngineFault::InvalidNonceLength(iv.len()));
        }
        let cipher = match algorithm {
            JobAlgorithm::Aes128CbcEncrypt => {
                CbcCipher::Encrypt(cbc::Encryptor::<Aes128>::new_from_slices(key, iv).map_err(|_| bad_key())?)
            }
            JobAlgorithm::Aes128CbcDecrypt => {
                CbcCipher::Decrypt(cbc::Decryptor::<Aes128>::new_from_slices(key, iv).map_err(|_| bad_key())?)
            }
            _ => return Err(bad_key()),
        };
        Ok(Self { cipher, pending: [0u8; AES_BLOCK_LEN], pending_len: 0 })
    }

    fn apply(&mut self, block: &mut [u8]) {
        let block = GenericArray::from_mut_slice(block);
        match &mut self.cipher {
            CbcCipher::Encrypt(c) => c.encrypt_block_mut(block),
            CbcCipher::Decrypt(c) => c.decrypt_block_mut(block),
        }
    }

    /// Feed `input`, writing every block completed so far. Returns bytes written.
    ///
    /// Nothing is consumed when `output` cannot hold the completed blocks.
    pub(crate) fn update(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize, EngineFault> {
        let total = self.pending_len + input.len();
        let emit = total - total % AES_BLOCK_LEN;
        if output.len() < emit {
            return Err(EngineFault::BufferTooSmall { needed: emit, available: output.len() });
        }

        let mut input = input;
        let mut written = 0;

        if self.pending_len > 0 {
            let take = (AES_BLOCK_LEN - self.pending_len).min(input.len());
            self.pending[self.pending_len..self.pending_len + take].copy_from_slice(&input[..take]);
            self.pending_len += take;
            input = &input[take..];
            if self.pending_len < AES_BLOCK_LEN {
                return Ok(0);
            }
            let mut block = self.pending;
            self.apply(&mut block);
            output[..AES_BLOCK_LEN].copy_from_slice(&block);
            block.zeroize();
            self.pending.zeroize();
            self.pending_len = 0;
            written = AES_BLOCK_LEN;
        }

        let full = input.len() - input.len() % AES_BLOCK_LEN;
        output[written..written + full].copy_from_slice(&input[..full]);
        for block in output[written..written + full].chunks_exact_mut(AES_BLOCK_LEN) {
            self.apply(block);
        }
        written += full;

        let rest = &input[full..];
        self.pending[..rest.len()].copy_from_slice(rest);
        self.pending_len = rest.len();
        Ok(written)
    }

    /// No padding is applied; a partial block at FINISH is a caller error.
    pub(crate) fn finish(&mut self) -> Result<(), EngineFault> {
        if self.pending_len != 0 {
            return Err(EngineFault::Unaligned { pending: self.pending_len });
        }
        Ok(())
    }
}

impl Drop for CbcStream {
    fn drop(&mut self) {
        self.pending.zeroize();
    }
}

pub(crate) enum MacStream {
    Sha1(Hmac<Sha1>),
    Sha256(Hmac<Sha256>),
}

impl MacStream {
    pub(crate) fn new(algorithm: JobAlgorithm, key: &[u8]) -> Result<Self, EngineFault> {
        let bad_key = || EngineFault::InvalidKeyLength { algorithm, len: key.len() };
        match algorithm {
            JobAlgorithm::HmacSha1 => Ok(Self::Sha1(
                <Hmac<Sha1> as Mac>::new_from_slice(key).map_err(|_| bad_key())?,
            )),
            JobAlgorithm::HmacSha256 => Ok(Self::Sha256(
                <Hmac<Sha256> as Mac>::new_from_slice(key).map_err(|_| bad_key())?,
            )),
            _ => Err(bad_key()),
        }
    }

    pub(crate) fn tag_len(&self) -> usize {
        match self {
            Self::Sha1(_) => crate::constants::SHA1_MAC_LEN,
            Self::Sha256(_) => crate::constants::SHA256_MAC_LEN,
        }
    }

    pub(crate) fn update(&mut self, input: &[u8]) {
        match self {
            Self::Sha1(m) => m.update(input),
            Self::Sha256(m) => m.update(input),
        }
    }

    /// Write the tag into `output[..tag_len]`.
    pub(crate) fn finalize_into(self, output: &mut [u8]) -> Result<usize, EngineFault> {
        let len = self.tag_len();
        if output.len() < len {
            return Err(EngineFault::BufferTooSmall { needed: len, available: output.len() });
        }
        match self {
            Self::Sha1(m) => output[..len].copy_from_slice(&m.finalize().into_bytes()),
            Self::Sha256(m) => output[..len].copy_from_slice(&m.finalize().into_bytes()),
        }
        Ok(len)
    }
}

/// One-shot HMAC, used for redirected calls whose input and output live in the key store.
pub(crate) fn hmac_once(algorithm: JobAlgorithm, key: &[u8], data: &[u8], output: &mut [u8]) -> Result<usize, EngineFault> {
    let mut mac = MacStream::new(algorithm, key)?;
    mac.update(data);
    mac.finalize_into(output)
}
