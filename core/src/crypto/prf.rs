// ## 📂 File: `src/crypto/prf.rs`

//! crypto/prf.rs
//! TLS 1.2 PRF (`P_SHA256`, RFC 5246 §5) evaluated inside the engine's key store.
//!
//! ```text
//! A(0) = label || seed
//! A(i) = HMAC(secret, A(i-1))
//! P    = HMAC(secret, A(1) || label || seed) || HMAC(secret, A(2) || label || seed) || ...
//! ```
//!
//! Every intermediate value lives in a key element of the scratch key; secrets never
//! leave the engine. `A(i)` alternates between two elements because the engine refuses
//! a redirected MAC whose input and output are the same element.
//!
//! The private variant (master secret, key block) and the public variant (Finished
//! verify data) differ only in the HMAC job they run on.

use std::time::Instant;

use log::trace;
use zeroize::Zeroizing;

use crate::config::{CipherWorkerConfig, JobBinding};
use crate::connection::{Activity, TlsConnection};
use crate::constants::{key_elements, labels, PRF_HASH_LEN, VERIFY_DATA_LEN};
use crate::crypto::key_block::Role;
use crate::engine::{CipherEngine, EngineFault, KeyElementId, KeyId, KeyRef};
use crate::report::FunctionId;
use crate::telemetry::Stage;
use crate::types::{InternalError, StepFailure, TlsError};

/// One PRF evaluation: `len` bytes of `PRF(secret, label, seed)` written to `output`.
#[derive(Debug, Clone, Copy)]
pub struct PrfRequest<'a> {
    pub secret: KeyRef,
    pub label: &'a [u8],
    pub seed: &'a [u8],
    pub output: KeyRef,
    pub len: usize,
}

fn scratch(key: KeyId, id: u32) -> KeyRef {
    KeyRef { key, element: KeyElementId(id) }
}

fn binding(worker: &CipherWorkerConfig, private: bool) -> JobBinding {
    if private {
        worker.prf_private
    } else {
        worker.prf_public
    }
}

/// Run the PRF on the private or public HMAC job of `worker`.
///
/// The output element is replaced. Scratch elements and the job's copy of the secret
/// are emptied whether or not the evaluation succeeds.
pub fn tls_prf<E: CipherEngine>(
    engine: &mut E,
    worker: &CipherWorkerConfig,
    private: bool,
    req: &PrfRequest<'_>,
) -> Result<(), EngineFault> {
    let binding = binding(worker, private);
    let result = expand(engine, binding, worker.prf_scratch, req);

    let mut cleanup = Ok(());
    for id in [
        key_elements::PRF_SEED,
        key_elements::PRF_A_ACTIVE,
        key_elements::PRF_A_PASSIVE,
        key_elements::PRF_INPUT,
        key_elements::PRF_CHUNK,
    ] {
        if let Err(e) = engine.key_element_set(scratch(worker.prf_scratch, id), &[]) {
            cleanup = cleanup.and(Err(e));
        }
    }
    let secret_copy = KeyRef { key: binding.key, element: KeyElementId(key_elements::MAC_KEY) };
    if let Err(e) = engine.key_element_set(secret_copy, &[]) {
        cleanup = cleanup.and(Err(e));
    }

    result.and(cleanup)
}

fn expand<E: CipherEngine>(
    engine: &mut E,
    binding: JobBinding,
    scratch_key: KeyId,
    req: &PrfRequest<'_>,
) -> Result<(), EngineFault> {
    engine.key_element_copy(req.secret, KeyRef { key: binding.key, element: KeyElementId(key_elements::MAC_KEY) })?;
    engine.key_set_valid(binding.key)?;

    let seed = scratch(scratch_key, key_elements::PRF_SEED);
    let input = scratch(scratch_key, key_elements::PRF_INPUT);
    let chunk = scratch(scratch_key, key_elements::PRF_CHUNK);
    let mut active = scratch(scratch_key, key_elements::PRF_A_ACTIVE);
    let mut passive = scratch(scratch_key, key_elements::PRF_A_PASSIVE);

    let label_seed = Zeroizing::new([req.label, req.seed].concat());
    engine.key_element_set(seed, &label_seed)?;
    engine.key_element_copy(seed, active)?;
    engine.key_element_set(req.output, &[])?;

    let mut produced = 0;
    let mut rounds = 0u32;
    while produced < req.len {
        engine.mac_generate_redirect(binding.job, active, passive)?;
        engine.key_element_copy(passive, input)?;
        engine.key_element_copy_partial(seed, 0, PRF_HASH_LEN, label_seed.len(), input)?;
        let hash_len = engine.mac_generate_redirect(binding.job, input, chunk)?;

        let take = hash_len.min(req.len - produced);
        engine.key_element_copy_partial(chunk, 0, produced, take, req.output)?;
        produced += take;
        rounds += 1;
        std::mem::swap(&mut active, &mut passive);
    }
    trace!("prf produced {} bytes in {} rounds", produced, rounds);
    Ok(())
}

/// `tls_prf` for a connection, accounted under `Stage::Prf`.
pub(crate) fn connection_prf<E: CipherEngine>(
    conn: &mut TlsConnection,
    engine: &mut E,
    private: bool,
    req: &PrfRequest<'_>,
) -> Result<(), EngineFault> {
    let started = Instant::now();
    let result = tls_prf(engine, &conn.worker, private, req);
    conn.stage_times.add_since(Stage::Prf, started);
    result
}

/// Run the PRF for a connection; an engine failure aborts the connection.
pub fn prf<E: CipherEngine>(
    conn: &mut TlsConnection,
    engine: &mut E,
    private: bool,
    req: &PrfRequest<'_>,
) -> Result<(), TlsError> {
    conn.ensure_usable(FunctionId::Prf, Activity::Keys)?;
    connection_prf(conn, engine, private, req).map_err(|fault| conn.escalate(FunctionId::Prf, fault.into()))
}

/// Finished `verify_data` (RFC 5246 §7.4.9) for messages sent by `sender`.
///
/// `handshake_hash` is the SHA-256 of the handshake transcript, computed by the caller.
pub fn compute_verify_data<E: CipherEngine>(
    conn: &mut TlsConnection,
    engine: &mut E,
    sender: Role,
    handshake_hash: &[u8],
) -> Result<[u8; VERIFY_DATA_LEN], TlsError> {
    conn.ensure_usable(FunctionId::VerifyData, Activity::Keys)?;
    verify_data(conn, engine, sender, handshake_hash).map_err(|f| conn.escalate(FunctionId::VerifyData, f))
}

fn verify_data<E: CipherEngine>(
    conn: &mut TlsConnection,
    engine: &mut E,
    sender: Role,
    handshake_hash: &[u8],
) -> Result<[u8; VERIFY_DATA_LEN], StepFailure> {
    let label = match sender {
        Role::Client => labels::CLIENT_FINISHED,
        Role::Server => labels::SERVER_FINISHED,
    };
    let output = scratch(conn.worker.prf_scratch, key_elements::PRF_PUBLIC_RESULT);
    let req = PrfRequest {
        secret: conn.worker.master_secret,
        label,
        seed: handshake_hash,
        output,
        len: VERIFY_DATA_LEN,
    };

    let evaluated = connection_prf(conn, engine, false, &req);
    let mut verify = [0u8; VERIFY_DATA_LEN];
    let read = evaluated.and_then(|_| engine.key_element_get(output, &mut verify));
    let cleared = engine.key_element_set(output, &[]);
    let len = read?;
    cleared?;
    if len != VERIFY_DATA_LEN {
        return Err(InternalError::InvalidState("verify data length").into());
    }
    Ok(verify)
}
