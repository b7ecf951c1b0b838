// ## 📂 File: `src/keys/psk.rs`

//! keys/psk.rs
//! Plain PSK pre-master secret (RFC 4279 §2):
//! `uint16(N) || zeros(N) || uint16(N) || psk`.

use byteorder::{BigEndian, WriteBytesExt};
use log::debug;
use zeroize::Zeroizing;

use crate::connection::{Activity, TlsConnection};
use crate::constants::MAX_PSK_LEN;
use crate::engine::CipherEngine;
use crate::report::FunctionId;
use crate::types::{InternalError, StepFailure, TlsError};

/// Assemble the pre-master secret from `psk` and install it in the pre-master element.
pub fn assemble_psk_premaster<E: CipherEngine>(
    conn: &mut TlsConnection,
    engine: &mut E,
    psk: &[u8],
) -> Result<(), TlsError> {
    conn.ensure_usable(FunctionId::PskPremaster, Activity::Keys)?;
    install_premaster(conn, engine, psk).map_err(|f| conn.escalate(FunctionId::PskPremaster, f))
}

fn install_premaster<E: CipherEngine>(
    conn: &TlsConnection,
    engine: &mut E,
    psk: &[u8],
) -> Result<(), StepFailure> {
    let n = psk.len();
    if n == 0 || n > MAX_PSK_LEN {
        return Err(InternalError::InvalidPskLength { len: n }.into());
    }

    let mut premaster = Zeroizing::new(Vec::with_capacity(4 + 2 * n));
    premaster
        .write_u16::<BigEndian>(n as u16)
        .map_err(|_| InternalError::InvalidState("pre-master buffer write"))?;
    premaster.resize(2 + n, 0);
    premaster
        .write_u16::<BigEndian>(n as u16)
        .map_err(|_| InternalError::InvalidState("pre-master buffer write"))?;
    premaster.extend_from_slice(psk);

    let target = conn.worker.pre_master;
    engine.key_element_set(target, &premaster)?;
    engine.key_set_valid(target.key)?;
    debug!("[conn {}] psk pre-master installed ({} bytes)", conn.id, premaster.len());
    Ok(())
}
