// ## 📂 File: `src/engine/traits.rs`

//! engine/traits.rs
//! Capability interface of the external cipher engine.
//!
//! Contract:
//! - Every data call takes one contiguous input and one contiguous output.
//! - Streaming calls (START / UPDATE / FINISH) report exactly how many bytes each call
//!   produced; for block ciphers that can be less than the input until FINISH.
//! - Key material stays inside the key store; callers move it with the element
//!   get/set/copy/copy-partial operations and must mark a key valid after mutating it.
//! - Any `Err` is final for that operation; callers never retry.

use super::types::{EngineFault, JobId, KeyId, KeyRef, OperationMode};

pub trait CipherEngine {
    /// Streaming symmetric encryption with the job's key and IV. Returns bytes written.
    fn encrypt(
        &mut self,
        job: JobId,
        mode: OperationMode,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<usize, EngineFault>;

    /// Streaming symmetric decryption, mirror of `encrypt`.
    fn decrypt(
        &mut self,
        job: JobId,
        mode: OperationMode,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<usize, EngineFault>;

    /// Streaming HMAC. The full tag is written on FINISH; `output` must hold it.
    fn mac_generate(
        &mut self,
        job: JobId,
        mode: OperationMode,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<usize, EngineFault>;

    /// Single-call HMAC whose input and output are key elements.
    ///
    /// Input and output must be different elements.
    fn mac_generate_redirect(
        &mut self,
        job: JobId,
        input: KeyRef,
        output: KeyRef,
    ) -> Result<usize, EngineFault>;

    /// Single-call AEAD seal; key from CIPHER_KEY, nonce from CIPHER_IV. Writes `ciphertext || tag`.
    fn aead_encrypt(
        &mut self,
        job: JobId,
        aad: &[u8],
        input: &[u8],
        output: &mut [u8],
    ) -> Result<usize, EngineFault>;

    /// Single-call AEAD open of `ciphertext || tag`. Nothing is written when the tag fails.
    fn aead_decrypt(
        &mut self,
        job: JobId,
        aad: &[u8],
        input: &[u8],
        output: &mut [u8],
    ) -> Result<usize, EngineFault>;

    /// Fill `output` from the engine's CSPRNG.
    fn random_generate(&mut self, job: JobId, output: &mut [u8]) -> Result<(), EngineFault>;

    /// Replace an element's value. Invalidates the key.
    fn key_element_set(&mut self, target: KeyRef, value: &[u8]) -> Result<(), EngineFault>;

    /// Read an element into `output`. Returns its length.
    fn key_element_get(&self, source: KeyRef, output: &mut [u8]) -> Result<usize, EngineFault>;

    /// Length of an element without exposing its value.
    fn key_element_len(&self, source: KeyRef) -> Result<usize, EngineFault>;

    /// Copy a whole element (value and length). Invalidates the target key.
    fn key_element_copy(&mut self, source: KeyRef, target: KeyRef) -> Result<(), EngineFault>;

    /// Copy `len` bytes from `source[source_offset..]` to `target[target_offset..]`.
    ///
    /// The target grows when the copy runs past its end; it never shrinks.
    /// `target_offset` may not exceed the target's current length. Invalidates the target key.
    fn key_element_copy_partial(
        &mut self,
        source: KeyRef,
        source_offset: usize,
        target_offset: usize,
        len: usize,
        target: KeyRef,
    ) -> Result<(), EngineFault>;

    /// Mark a key ready for use by jobs.
    fn key_set_valid(&mut self, key: KeyId) -> Result<(), EngineFault>;
}
