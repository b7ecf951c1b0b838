//! Cipher suite registry, key-block layout and the TLS 1.2 PRF.

pub mod suites;
pub mod key_block;
pub mod prf;

pub use suites::{BulkCipher, CipherSuite, KeyExchange, MacAlgorithm, SuiteParams};
pub use key_block::{DirectionKeys, KeyBlockError, KeyBlockLayout, Role};
pub use prf::{compute_verify_data, prf, tls_prf, PrfRequest};
