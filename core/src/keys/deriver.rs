// ## 📂 File: `src/keys/deriver.rs`

//! keys/deriver.rs
//! Key material deriver: pre-master secret → master secret → key block → traffic keys.
//!
//! ```text
//! Init ─┬─ (ECDHE) ─> ReduceSharedKey ─┐
//!       └─ (PSK) ──────────────────────┴─> CalcMasterSecret -> DeriveKeyBlock
//!                                          -> SetCsmKeys -> Finalize -> Done
//! any intermediate state ── failure ──> Abort -> Done
//! ```
//!
//! Resumption:
//! - All cross-step data lives in the connection and the engine's key store.
//! - `EngineFault::Busy` leaves the state untouched; the next call re-enters that
//!   state without recomputing earlier ones.
//!
//! Abort empties every derived element (pre-master, master secret, key block and
//! both directions' traffic keys) so no half-installed key stays usable.

use std::time::Instant;

use log::{debug, warn};
use zeroize::Zeroizing;

use crate::config::DirectionBinding;
use crate::connection::{Activity, TlsConnection};
use crate::constants::{key_elements, labels, MASTER_SECRET_LEN, MAX_SHARED_VALUE_LEN, RANDOM_LEN};
use crate::crypto::key_block::{DirectionKeys, KeyBlockLayout};
use crate::crypto::prf::{connection_prf, PrfRequest};
use crate::crypto::suites::KeyExchange;
use crate::engine::{CipherEngine, EngineFault, KeyElementId, KeyRef};
use crate::report::FunctionId;
use crate::telemetry::Stage;
use crate::types::{InternalError, StepFailure, TlsError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeriverState {
    Init,
    ReduceSharedKey,
    CalcMasterSecret,
    DeriveKeyBlock,
    SetCsmKeys,
    Finalize,
    Abort,
    #[default]
    Done,
}

impl DeriverState {
    fn is_running(self) -> bool {
        !matches!(self, DeriverState::Done)
    }
}

/// Per-connection derivation state; survives between calls to `run_key_derivation`.
#[derive(Debug, Clone, Default)]
pub struct DerivationContext {
    pub(crate) state: DeriverState,
    pub(crate) recalculation_requested: bool,
    pub(crate) completed: bool,
    pub(crate) key_block_len: usize,
    started: Option<Instant>,
}

impl DerivationContext {
    pub fn state(&self) -> DeriverState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    pub fn recalculation_requested(&self) -> bool {
        self.recalculation_requested
    }

    /// Length of the key block of the last derivation that reached `DeriveKeyBlock`.
    pub fn key_block_len(&self) -> usize {
        self.key_block_len
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivationProgress {
    Complete,
    /// The engine has not finished; call again to resume at this state.
    Yielded(DeriverState),
    Aborted,
}

/// Request a (re)derivation. The pre-master (PSK) or shared value (ECDHE) and both
/// randoms must be in place before `run_key_derivation` is called.
pub fn begin_key_derivation(conn: &mut TlsConnection) -> Result<(), TlsError> {
    conn.ensure_usable(FunctionId::DeriveKeys, Activity::Keys)?;
    let state = conn.derivation.state;
    if state.is_running() && state != DeriverState::Init {
        let detail = InternalError::InvalidState("key derivation already in progress");
        return Err(conn.escalate(FunctionId::DeriveKeys, detail.into()));
    }
    conn.derivation = DerivationContext {
        state: DeriverState::Init,
        recalculation_requested: true,
        completed: false,
        key_block_len: 0,
        started: Some(Instant::now()),
    };
    debug!("[conn {}] key derivation requested", conn.id);
    Ok(())
}

/// Request that an in-flight derivation be abandoned on the next run.
pub fn abort_key_derivation(conn: &mut TlsConnection) {
    if conn.derivation.state.is_running() {
        conn.derivation.state = DeriverState::Abort;
    }
}

/// Drive the state machine until it completes, yields or aborts.
pub fn run_key_derivation<E: CipherEngine>(
    conn: &mut TlsConnection,
    engine: &mut E,
) -> Result<DerivationProgress, TlsError> {
    conn.ensure_usable(FunctionId::DeriveKeys, Activity::Keys)?;
    loop {
        let state = conn.derivation.state;
        let step = match state {
            DeriverState::Init => Ok(match conn.params.key_exchange {
                KeyExchange::Ecdhe => DeriverState::ReduceSharedKey,
                KeyExchange::Psk => DeriverState::CalcMasterSecret,
            }),
            DeriverState::ReduceSharedKey => {
                reduce_shared_key(conn, engine).map(|_| DeriverState::CalcMasterSecret)
            }
            DeriverState::CalcMasterSecret => {
                calc_master_secret(conn, engine).map(|_| DeriverState::DeriveKeyBlock)
            }
            DeriverState::DeriveKeyBlock => derive_key_block(conn, engine).map(|_| DeriverState::SetCsmKeys),
            DeriverState::SetCsmKeys => set_csm_keys(conn, engine).map(|_| DeriverState::Finalize),
            DeriverState::Finalize => finalize(conn, engine).map(|_| DeriverState::Done),
            DeriverState::Abort => {
                invalidate_derived(conn, engine);
                conn.derivation.state = DeriverState::Done;
                debug!("[conn {}] key derivation abandoned", conn.id);
                return Ok(DerivationProgress::Aborted);
            }
            DeriverState::Done => {
                return Ok(if conn.derivation.completed {
                    DerivationProgress::Complete
                } else {
                    DerivationProgress::Aborted
                });
            }
        };

        match step {
            Ok(next) => {
                debug!("[conn {}] key derivation {:?} -> {:?}", conn.id, state, next);
                conn.derivation.state = next;
            }
            Err(StepFailure::Crypto(EngineFault::Busy)) => {
                debug!("[conn {}] key derivation yielded in {:?}", conn.id, state);
                return Ok(DerivationProgress::Yielded(state));
            }
            Err(failure) => {
                warn!("[conn {}] key derivation failed in {:?}", conn.id, state);
                conn.derivation.state = DeriverState::Abort;
                invalidate_derived(conn, engine);
                conn.derivation.state = DeriverState::Done;
                return Err(conn.escalate(FunctionId::DeriveKeys, failure));
            }
        }
    }
}

/// Copy the ECDH shared value into the pre-master element, dropping the single
/// leading zero byte an encoder adds when the value is one byte longer than the field.
fn reduce_shared_key<E: CipherEngine>(conn: &TlsConnection, engine: &mut E) -> Result<(), StepFailure> {
    let shared = conn.worker.shared_secret;
    let pre_master = conn.worker.pre_master;
    let len = engine.key_element_len(shared)?;
    if len == 0 || len > MAX_SHARED_VALUE_LEN {
        return Err(InternalError::InvalidSharedValue { len }.into());
    }

    let strip = len == conn.ecdh_field_len + 1 && {
        let mut value = Zeroizing::new([0u8; MAX_SHARED_VALUE_LEN]);
        engine.key_element_get(shared, &mut value[..])?;
        value[0] == 0
    };

    if strip {
        debug!("[conn {}] stripping leading zero from {}-byte shared value", conn.id, len);
        let scratch = conn.worker.reduction_scratch;
        let copied = engine
            .key_element_set(scratch, &[])
            .and_then(|_| engine.key_element_copy_partial(shared, 1, 0, len - 1, scratch))
            .and_then(|_| engine.key_element_copy(scratch, pre_master));
        let cleared = engine.key_element_set(scratch, &[]);
        copied?;
        cleared?;
    } else {
        engine.key_element_copy(shared, pre_master)?;
    }
    engine.key_set_valid(pre_master.key)?;
    Ok(())
}

fn randoms(conn: &TlsConnection) -> ([u8; 2 * RANDOM_LEN], [u8; 2 * RANDOM_LEN]) {
    let mut client_server = [0u8; 2 * RANDOM_LEN];
    client_server[..RANDOM_LEN].copy_from_slice(&conn.client_random);
    client_server[RANDOM_LEN..].copy_from_slice(&conn.server_random);
    let mut server_client = [0u8; 2 * RANDOM_LEN];
    server_client[..RANDOM_LEN].copy_from_slice(&conn.server_random);
    server_client[RANDOM_LEN..].copy_from_slice(&conn.client_random);
    (client_server, server_client)
}

fn calc_master_secret<E: CipherEngine>(conn: &mut TlsConnection, engine: &mut E) -> Result<(), StepFailure> {
    let (client_server, _) = randoms(conn);
    let output = conn.worker.master_secret;
    let req = PrfRequest {
        secret: conn.worker.pre_master,
        label: labels::MASTER_SECRET,
        seed: &client_server,
        output,
        len: MASTER_SECRET_LEN,
    };
    connection_prf(conn, engine, true, &req)?;
    engine.key_set_valid(output.key)?;
    Ok(())
}

fn derive_key_block<E: CipherEngine>(conn: &mut TlsConnection, engine: &mut E) -> Result<(), StepFailure> {
    let layout = KeyBlockLayout::for_suite(&conn.params)?;
    let (_, server_client) = randoms(conn);
    let output = conn.worker.key_block;
    let req = PrfRequest {
        secret: conn.worker.master_secret,
        label: labels::KEY_EXPANSION,
        seed: &server_client,
        output,
        len: layout.total(),
    };
    connection_prf(conn, engine, true, &req)?;
    engine.key_set_valid(output.key)?;
    conn.derivation.key_block_len = layout.total();
    Ok(())
}

fn set_csm_keys<E: CipherEngine>(conn: &TlsConnection, engine: &mut E) -> Result<(), StepFailure> {
    let layout = KeyBlockLayout::for_suite(&conn.params)?;
    let (tx, rx) = layout.directions(conn.role);
    let key_block = conn.worker.key_block;
    install_direction(engine, key_block, &conn.worker.tx, &tx)?;
    install_direction(engine, key_block, &conn.worker.rx, &rx)?;
    Ok(())
}

fn install_direction<E: CipherEngine>(
    engine: &mut E,
    key_block: KeyRef,
    binding: &DirectionBinding,
    keys: &DirectionKeys,
) -> Result<(), EngineFault> {
    if !keys.mac.is_empty() {
        let target = KeyRef { key: binding.mac_key, element: KeyElementId(key_elements::MAC_KEY) };
        install_range(engine, key_block, keys.mac.start, keys.mac.len(), target)?;
        engine.key_set_valid(binding.mac_key)?;
    }
    if !keys.key.is_empty() {
        let target = KeyRef { key: binding.cipher_key, element: KeyElementId(key_elements::CIPHER_KEY) };
        install_range(engine, key_block, keys.key.start, keys.key.len(), target)?;
    }
    if !keys.iv.is_empty() {
        let target = KeyRef { key: binding.cipher_key, element: KeyElementId(key_elements::IMPLICIT_IV) };
        install_range(engine, key_block, keys.iv.start, keys.iv.len(), target)?;
    }
    if !keys.key.is_empty() {
        engine.key_set_valid(binding.cipher_key)?;
    }
    Ok(())
}

fn install_range<E: CipherEngine>(
    engine: &mut E,
    key_block: KeyRef,
    offset: usize,
    len: usize,
    target: KeyRef,
) -> Result<(), EngineFault> {
    engine.key_element_set(target, &[])?;
    engine.key_element_copy_partial(key_block, offset, 0, len, target)
}

fn finalize<E: CipherEngine>(conn: &mut TlsConnection, engine: &mut E) -> Result<(), StepFailure> {
    // Traffic keys are installed; the key block and pre-master are no longer needed.
    engine.key_element_set(conn.worker.key_block, &[])?;
    engine.key_element_set(conn.worker.pre_master, &[])?;

    conn.derivation.recalculation_requested = false;
    conn.derivation.completed = true;
    conn.telemetry.add_key_derivation();
    if let Some(started) = conn.derivation.started.take() {
        conn.stage_times.add_since(Stage::KeyDerivation, started);
    }
    debug!("[conn {}] key derivation complete ({} byte key block)", conn.id, conn.derivation.key_block_len);
    Ok(())
}

/// Best effort: every element is attempted even if an earlier one fails.
fn invalidate_derived<E: CipherEngine>(conn: &TlsConnection, engine: &mut E) {
    let worker = &conn.worker;
    let mut targets = vec![worker.pre_master, worker.master_secret, worker.key_block, worker.reduction_scratch];
    for direction in [worker.tx, worker.rx] {
        let mac = KeyRef { key: direction.mac_key, element: KeyElementId(key_elements::MAC_KEY) };
        let cipher = KeyRef { key: direction.cipher_key, element: KeyElementId(key_elements::CIPHER_KEY) };
        targets.push(mac);
        targets.push(cipher);
        targets.push(cipher.sibling(key_elements::IMPLICIT_IV));
        targets.push(cipher.sibling(key_elements::CIPHER_IV));
    }
    for target in targets {
        if let Err(fault) = engine.key_element_set(target, &[]) {
            warn!("[conn {}] could not clear {}: {}", conn.id, target, fault);
        }
    }
}
