// ## 📂 File: `src/engine/software.rs`

//! engine/software.rs
//! In-process `CipherEngine` backed by RustCrypto primitives.
//!
//! Key store:
//! - Keys hold named elements; every element is `Zeroizing` and capped at `max_element_len`.
//! - Any mutation clears the key's valid flag; jobs refuse keys that are not valid.
//!
//! Jobs:
//! - A job binds one algorithm to one key and owns at most one streaming context.
//! - An error, or FINISH, drops the context.
//!
//! Faults queued with `inject_fault` are returned by the next job operations in order;
//! queuing `EngineFault::Busy` models an asynchronous backend that has not completed yet.

use std::collections::{HashMap, VecDeque};

use log::trace;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use zeroize::Zeroizing;

use crate::config::CipherWorkerConfig;
use crate::constants::{key_elements, DEFAULT_MAX_ELEMENT_LEN};
use crate::crypto::suites::{BulkCipher, MacAlgorithm, SuiteParams};
use super::aead;
use super::stream::{hmac_once, CbcStream, MacStream, StreamState};
use super::traits::CipherEngine;
use super::types::{
    EngineFault, JobAlgorithm, JobConfig, JobId, KeyElementId, KeyId, KeyRef, OperationMode,
};

#[derive(Default)]
struct KeySlot {
    elements: HashMap<KeyElementId, Zeroizing<Vec<u8>>>,
    valid: bool,
}

struct JobSlot {
    config: JobConfig,
    stream: Option<StreamState>,
}

pub struct SoftwareCipherEngine {
    keys: HashMap<KeyId, KeySlot>,
    jobs: HashMap<JobId, JobSlot>,
    rng: StdRng,
    max_element_len: usize,
    faults: VecDeque<EngineFault>,
}

impl Default for SoftwareCipherEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareCipherEngine {
    /// Engine with an OS-seeded RNG.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic RNG; two engines with the same seed emit the same IVs.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            keys: HashMap::new(),
            jobs: HashMap::new(),
            rng,
            max_element_len: DEFAULT_MAX_ELEMENT_LEN,
            faults: VecDeque::new(),
        }
    }

    pub fn with_max_element_len(mut self, max: usize) -> Self {
        self.max_element_len = max;
        self
    }

    pub fn register_key(&mut self, key: KeyId) {
        self.keys.entry(key).or_default();
    }

    /// Bind (or rebind) a job. Any in-flight stream on the job is discarded.
    pub fn configure_job(&mut self, job: JobId, config: JobConfig) {
        self.jobs.insert(job, JobSlot { config, stream: None });
    }

    /// Register every key and job one connection needs for `suite`.
    pub fn provision(&mut self, worker: &CipherWorkerConfig, suite: SuiteParams) {
        for key in worker.keys() {
            self.register_key(key);
        }

        self.configure_job(
            worker.random_job,
            JobConfig { algorithm: JobAlgorithm::Random, key: worker.prf_scratch },
        );
        for binding in [worker.prf_private, worker.prf_public] {
            self.configure_job(
                binding.job,
                JobConfig { algorithm: JobAlgorithm::HmacSha256, key: binding.key },
            );
        }

        let mac_algorithm = match suite.mac {
            MacAlgorithm::Sha1 => Some(JobAlgorithm::HmacSha1),
            MacAlgorithm::Sha256 => Some(JobAlgorithm::HmacSha256),
            MacAlgorithm::Aead => None,
        };
        let (tx_cipher, rx_cipher) = match suite.cipher {
            BulkCipher::Null => (None, None),
            BulkCipher::Aes128Cbc => (Some(JobAlgorithm::Aes128CbcEncrypt), Some(JobAlgorithm::Aes128CbcDecrypt)),
            BulkCipher::Aes128Gcm => (Some(JobAlgorithm::Aes128GcmEncrypt), Some(JobAlgorithm::Aes128GcmDecrypt)),
            BulkCipher::Aes256Gcm => (Some(JobAlgorithm::Aes256GcmEncrypt), Some(JobAlgorithm::Aes256GcmDecrypt)),
            BulkCipher::ChaCha20Poly1305 => (
                Some(JobAlgorithm::ChaCha20Poly1305Encrypt),
                Some(JobAlgorithm::ChaCha20Poly1305Decrypt),
            ),
        };

        for (direction, cipher) in [(worker.tx, tx_cipher), (worker.rx, rx_cipher)] {
            if let Some(algorithm) = mac_algorithm {
                self.configure_job(direction.mac_job, JobConfig { algorithm, key: direction.mac_key });
            }
            if let Some(algorithm) = cipher {
                self.configure_job(direction.cipher_job, JobConfig { algorithm, key: direction.cipher_key });
            }
        }
        trace!("engine provisioned for {:?}/{:?}", suite.cipher, suite.mac);
    }

    /// Queue a fault for the next job operation.
    pub fn inject_fault(&mut self, fault: EngineFault) {
        self.faults.push_back(fault);
    }

    pub fn is_key_valid(&self, key: KeyId) -> bool {
        self.keys.get(&key).is_some_and(|slot| slot.valid)
    }

    /// True while a START has not been matched by a FINISH.
    pub fn has_stream(&self, job: JobId) -> bool {
        self.jobs.get(&job).is_some_and(|slot| slot.stream.is_some())
    }

    fn take_fault(&mut self) -> Result<(), EngineFault> {
        match self.faults.pop_front() {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }

    fn job_config(&self, job: JobId) -> Result<JobConfig, EngineFault> {
        self.jobs
            .get(&job)
            .map(|slot| slot.config)
            .ok_or(EngineFault::UnknownJob(job))
    }

    fn slot_mut(&mut self, job: JobId) -> Result<&mut JobSlot, EngineFault> {
        self.jobs.get_mut(&job).ok_or(EngineFault::UnknownJob(job))
    }

    fn key_slot(&self, key: KeyId) -> Result<&KeySlot, EngineFault> {
        self.keys.get(&key).ok_or(EngineFault::UnknownKey(key))
    }

    fn key_slot_mut(&mut self, key: KeyId) -> Result<&mut KeySlot, EngineFault> {
        self.keys.get_mut(&key).ok_or(EngineFault::UnknownKey(key))
    }

    fn element(&self, source: KeyRef) -> Result<&[u8], EngineFault> {
        self.key_slot(source.key)?
            .elements
            .get(&source.element)
            .map(|v| v.as_slice())
            .ok_or(EngineFault::MissingElement(source))
    }

    /// Element of a key that a job is about to use; the key must be valid.
    fn job_element(&self, key: KeyId, element: u32) -> Result<&[u8], EngineFault> {
        if !self.key_slot(key)?.valid {
            return Err(EngineFault::KeyNotValid(key));
        }
        self.element(KeyRef { key, element: KeyElementId(element) })
    }

    fn check_mode(job: JobId, mode: OperationMode) -> Result<(), EngineFault> {
        if mode.is_empty() {
            return Err(EngineFault::InvalidMode { job, mode });
        }
        Ok(())
    }

    fn cbc_stream(
        &mut self,
        job: JobId,
        mode: OperationMode,
        input: &[u8],
        output: &mut [u8],
        expected: JobAlgorithm,
        operation: &'static str,
    ) -> Result<usize, EngineFault> {
        self.take_fault()?;
        let config = self.job_config(job)?;
        if config.algorithm != expected {
            return Err(EngineFault::WrongAlgorithm { job, operation });
        }
        Self::check_mode(job, mode)?;

        if mode.contains(OperationMode::START) {
            let key = self.job_element(config.key, key_elements::CIPHER_KEY)?;
            let iv = self.job_element(config.key, key_elements::CIPHER_IV)?;
            let stream = CbcStream::new(config.algorithm, key, iv)?;
            self.slot_mut(job)?.stream = Some(StreamState::Cbc(stream));
        }

        let slot = self.slot_mut(job)?;
        let result = match slot.stream.as_mut() {
            Some(StreamState::Cbc(stream)) => {
                let mut written = 0;
                let mut outcome = Ok(());
                if mode.contains(OperationMode::UPDATE) {
                    match stream.update(input, output) {
                        Ok(n) => written = n,
                        Err(e) => outcome = Err(e),
                    }
                } else if !input.is_empty() {
                    outcome = Err(EngineFault::InvalidMode { job, mode });
                }
                if outcome.is_ok() && mode.contains(OperationMode::FINISH) {
                    outcome = stream.finish();
                }
                outcome.map(|_| written)
            }
            _ => Err(EngineFault::InvalidMode { job, mode }),
        };

        if result.is_err() || mode.contains(OperationMode::FINISH) {
            slot.stream = None;
        }
        result
    }

    fn aead_call(
        &mut self,
        job: JobId,
        aad: &[u8],
        input: &[u8],
        output: &mut [u8],
        sealing: bool,
    ) -> Result<usize, EngineFault> {
        self.take_fault()?;
        let config = self.job_config(job)?;
        let direction_ok = matches!(
            (config.algorithm, sealing),
            (JobAlgorithm::Aes128GcmEncrypt, true)
                | (JobAlgorithm::Aes256GcmEncrypt, true)
                | (JobAlgorithm::ChaCha20Poly1305Encrypt, true)
                | (JobAlgorithm::Aes128GcmDecrypt, false)
                | (JobAlgorithm::Aes256GcmDecrypt, false)
                | (JobAlgorithm::ChaCha20Poly1305Decrypt, false)
        );
        if !direction_ok {
            let operation = if sealing { "aead_encrypt" } else { "aead_decrypt" };
            return Err(EngineFault::WrongAlgorithm { job, operation });
        }

        let key = self.job_element(config.key, key_elements::CIPHER_KEY)?;
        let nonce = self.job_element(config.key, key_elements::CIPHER_IV)?;
        if sealing {
            aead::seal(config.algorithm, key, nonce, aad, input, output)
        } else {
            aead::open(config.algorithm, key, nonce, aad, input, output)
        }
    }
}

impl CipherEngine for SoftwareCipherEngine {
    fn encrypt(
        &mut self,
        job: JobId,
        mode: OperationMode,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<usize, EngineFault> {
        self.cbc_stream(job, mode, input, output, JobAlgorithm::Aes128CbcEncrypt, "encrypt")
    }

    fn decrypt(
        &mut self,
        job: JobId,
        mode: OperationMode,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<usize, EngineFault> {
        self.cbc_stream(job, mode, input, output, JobAlgorithm::Aes128CbcDecrypt, "decrypt")
    }

    fn mac_generate(
        &mut self,
        job: JobId,
        mode: OperationMode,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<usize, EngineFault> {
        self.take_fault()?;
        let config = self.job_config(job)?;
        if config.algorithm.mac_len().is_none() {
            return Err(EngineFault::WrongAlgorithm { job, operation: "mac_generate" });
        }
        Self::check_mode(job, mode)?;

        if mode.contains(OperationMode::START) {
            let key = self.job_element(config.key, key_elements::MAC_KEY)?;
            let stream = MacStream::new(config.algorithm, key)?;
            self.slot_mut(job)?.stream = Some(StreamState::Mac(stream));
        }

        let slot = self.slot_mut(job)?;
        let stream = match slot.stream.take() {
            Some(StreamState::Mac(stream)) => stream,
            _ => return Err(EngineFault::InvalidMode { job, mode }),
        };
        let mut stream = stream;
        if mode.contains(OperationMode::UPDATE) {
            stream.update(input);
        } else if !input.is_empty() {
            return Err(EngineFault::InvalidMode { job, mode });
        }

        if mode.contains(OperationMode::FINISH) {
            return stream.finalize_into(output);
        }
        slot.stream = Some(StreamState::Mac(stream));
        Ok(0)
    }

    fn mac_generate_redirect(
        &mut self,
        job: JobId,
        input: KeyRef,
        output: KeyRef,
    ) -> Result<usize, EngineFault> {
        self.take_fault()?;
        if input == output {
            return Err(EngineFault::AliasedRedirect(input));
        }
        let config = self.job_config(job)?;
        if config.algorithm.mac_len().is_none() {
            return Err(EngineFault::WrongAlgorithm { job, operation: "mac_generate_redirect" });
        }
        self.key_slot(output.key)?;

        let mut tag = Zeroizing::new([0u8; crate::constants::MAX_MAC_LEN]);
        let key = self.job_element(config.key, key_elements::MAC_KEY)?;
        let data = self.element(input)?;
        let len = hmac_once(config.algorithm, key, data, &mut tag[..])?;

        let slot = self.key_slot_mut(output.key)?;
        slot.elements.insert(output.element, Zeroizing::new(tag[..len].to_vec()));
        slot.valid = false;
        Ok(len)
    }

    fn aead_encrypt(
        &mut self,
        job: JobId,
        aad: &[u8],
        input: &[u8],
        output: &mut [u8],
    ) -> Result<usize, EngineFault> {
        self.aead_call(job, aad, input, output, true)
    }

    fn aead_decrypt(
        &mut self,
        job: JobId,
        aad: &[u8],
        input: &[u8],
        output: &mut [u8],
    ) -> Result<usize, EngineFault> {
        self.aead_call(job, aad, input, output, false)
    }

    fn random_generate(&mut self, job: JobId, output: &mut [u8]) -> Result<(), EngineFault> {
        self.take_fault()?;
        let config = self.job_config(job)?;
        if config.algorithm != JobAlgorithm::Random {
            return Err(EngineFault::WrongAlgorithm { job, operation: "random_generate" });
        }
        self.rng
            .try_fill_bytes(output)
            .map_err(|e| EngineFault::Entropy(e.to_string()))
    }

    fn key_element_set(&mut self, target: KeyRef, value: &[u8]) -> Result<(), EngineFault> {
        if value.len() > self.max_element_len {
            return Err(EngineFault::ElementTooLarge { len: value.len(), max: self.max_element_len });
        }
        let slot = self.key_slot_mut(target.key)?;
        slot.elements.insert(target.element, Zeroizing::new(value.to_vec()));
        slot.valid = false;
        Ok(())
    }

    fn key_element_get(&self, source: KeyRef, output: &mut [u8]) -> Result<usize, EngineFault> {
        let value = self.element(source)?;
        if output.len() < value.len() {
            return Err(EngineFault::BufferTooSmall { needed: value.len(), available: output.len() });
        }
        output[..value.len()].copy_from_slice(value);
        Ok(value.len())
    }

    fn key_element_len(&self, source: KeyRef) -> Result<usize, EngineFault> {
        self.element(source).map(<[u8]>::len)
    }

    fn key_element_copy(&mut self, source: KeyRef, target: KeyRef) -> Result<(), EngineFault> {
        let value = Zeroizing::new(self.element(source)?.to_vec());
        let slot = self.key_slot_mut(target.key)?;
        slot.elements.insert(target.element, value);
        slot.valid = false;
        Ok(())
    }

    fn key_element_copy_partial(
        &mut self,
        source: KeyRef,
        source_offset: usize,
        target_offset: usize,
        len: usize,
        target: KeyRef,
    ) -> Result<(), EngineFault> {
        let src = self.element(source)?;
        let end = source_offset
            .checked_add(len)
            .filter(|end| *end <= src.len())
            .ok_or(EngineFault::InvalidRange { offset: source_offset, len, element_len: src.len() })?;
        let chunk = Zeroizing::new(src[source_offset..end].to_vec());

        let max = self.max_element_len;
        let slot = self.key_slot_mut(target.key)?;
        let current_len = slot.elements.get(&target.element).map_or(0, |v| v.len());
        if target_offset > current_len {
            return Err(EngineFault::InvalidRange { offset: target_offset, len, element_len: current_len });
        }
        let new_len = current_len.max(target_offset + len);
        if new_len > max {
            return Err(EngineFault::ElementTooLarge { len: new_len, max });
        }

        let value = slot.elements.entry(target.element).or_default();
        if value.len() < new_len {
            // Grow into a fresh buffer; the old one is wiped when it drops.
            let mut grown = Zeroizing::new(vec![0u8; new_len]);
            grown[..value.len()].copy_from_slice(&value[..]);
            *value = grown;
        }
        value[target_offset..target_offset + len].copy_from_slice(&chunk);
        slot.valid = false;
        Ok(())
    }

    fn key_set_valid(&mut self, key: KeyId) -> Result<(), EngineFault> {
        self.key_slot_mut(key)?.valid = true;
        Ok(())
    }
}
