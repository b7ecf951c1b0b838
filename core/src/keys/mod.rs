//! Key material: PSK pre-master assembly and the key derivation state machine.

pub mod psk;
pub mod deriver;

pub use psk::assemble_psk_premaster;
pub use deriver::{
    abort_key_derivation, begin_key_derivation, run_key_derivation, DerivationContext, DerivationProgress,
    DeriverState,
};
