// ## 📂 File: `src/constants.rs`

//! constants.rs
//! Protocol sizes, labels and registry identifiers shared by every layer.
//!
//! Industry notes:
//! - Sizes follow RFC 5246 (TLS 1.2), RFC 5288 (AES-GCM) and RFC 7905 (ChaCha20-Poly1305).
//! - Scratch buffers in the record pipeline are sized from these maxima, never from input.

/// TLS 1.2 legacy record version on the wire.
pub const TLS12_VERSION: u16 = 0x0303;

/// Record header: type(1) + version(2) + length(2).
pub const RECORD_HEADER_LEN: usize = 5;

/// MAC pseudo-header: seq_num(8) + type(1) + version(2) + length(2).
pub const MAC_HEADER_LEN: usize = 13;

/// Largest TLSPlaintext fragment (2^14).
pub const MAX_PLAINTEXT_LEN: usize = 16 * 1024;

/// Largest TLSCiphertext fragment (2^14 + 2048).
pub const MAX_CIPHERTEXT_LEN: usize = MAX_PLAINTEXT_LEN + 2048;

/// AES block size; also the explicit CBC IV length.
pub const AES_BLOCK_LEN: usize = 16;

/// Content is streamed through the split-destination path in chunks of two blocks.
pub const CBC_CHUNK_LEN: usize = 2 * AES_BLOCK_LEN;

pub const AES128_KEY_LEN: usize = 16;
pub const AES256_KEY_LEN: usize = 32;
pub const CHACHA20_KEY_LEN: usize = 32;

pub const SHA1_MAC_LEN: usize = 20;
pub const SHA256_MAC_LEN: usize = 32;

/// Longest record MAC produced by a supported suite.
pub const MAX_MAC_LEN: usize = SHA256_MAC_LEN;

/// MAC + padding trailer never exceeds this.
pub const MAX_TRAILER_LEN: usize = MAX_MAC_LEN + AES_BLOCK_LEN;

/// HMAC-SHA256 output; the PRF block size.
pub const PRF_HASH_LEN: usize = 32;

pub const AEAD_TAG_LEN: usize = 16;
pub const AEAD_NONCE_LEN: usize = 12;
pub const GCM_IMPLICIT_IV_LEN: usize = 4;
pub const GCM_EXPLICIT_NONCE_LEN: usize = 8;
pub const CHACHA20_IV_LEN: usize = 12;

pub const RANDOM_LEN: usize = 32;
pub const MASTER_SECRET_LEN: usize = 48;
pub const VERIFY_DATA_LEN: usize = 12;

/// Largest field element we accept from the key-exchange primitive (P-521).
pub const MAX_SHARED_VALUE_LEN: usize = 67;

/// Longest pre-shared key accepted for the PSK pre-master secret.
pub const MAX_PSK_LEN: usize = 64;

/// Default cap on a single key element inside the software engine.
pub const DEFAULT_MAX_ELEMENT_LEN: usize = 256;

/// PRF labels (RFC 5246 §8.1, §6.3, §7.4.9).
pub mod labels {
    pub const MASTER_SECRET: &[u8] = b"master secret";
    pub const KEY_EXPANSION: &[u8] = b"key expansion";
    pub const CLIENT_FINISHED: &[u8] = b"client finished";
    pub const SERVER_FINISHED: &[u8] = b"server finished";
}

/// Key element identifiers inside one engine key.
///
/// MAC and cipher keys share element 1 (they always live in distinct keys);
/// the remaining ids are scratch slots used by the PRF and the AEAD nonce assembly.
pub mod key_elements {
    pub const MAC_KEY: u32 = 1;
    pub const CIPHER_KEY: u32 = 1;
    pub const SECRET: u32 = 1;
    pub const CIPHER_IV: u32 = 5;
    pub const SHARED_VALUE: u32 = 16;
    pub const IMPLICIT_IV: u32 = 17;

    pub const PRF_SEED: u32 = 100;
    pub const PRF_A_ACTIVE: u32 = 101;
    pub const PRF_A_PASSIVE: u32 = 102;
    pub const PRF_INPUT: u32 = 103;
    pub const PRF_CHUNK: u32 = 104;
    pub const PRF_PUBLIC_RESULT: u32 = 105;
    pub const EXPLICIT_IV: u32 = 110;
}

/// Key-block lengths per {bulk cipher, MAC} combination.
pub mod key_block_len {
    /// 2 × 20 (MAC)
    pub const NULL_SHA1: usize = 40;
    /// 2 × 32 (MAC)
    pub const NULL_SHA256: usize = 64;
    /// 2 × 20 (MAC) + 2 × 16 (key)
    pub const AES128_CBC_SHA1: usize = 72;
    /// 2 × 32 (MAC) + 2 × 16 (key)
    pub const AES128_CBC_SHA256: usize = 96;
    /// 2 × 16 (key) + 2 × 4 (implicit IV)
    pub const AES128_GCM: usize = 40;
    /// 2 × 32 (key) + 2 × 4 (implicit IV)
    pub const AES256_GCM: usize = 72;
    /// 2 × 32 (key) + 2 × 12 (IV)
    pub const CHACHA20_POLY1305: usize = 88;
}

/// Cipher suite identifiers (IANA TLS registry).
pub mod suite_ids {
    pub const PSK_WITH_NULL_SHA: u16 = 0x002C;
    pub const PSK_WITH_AES_128_CBC_SHA: u16 = 0x008C;
    pub const PSK_WITH_AES_128_GCM_SHA256: u16 = 0x00A8;
    pub const PSK_WITH_AES_128_CBC_SHA256: u16 = 0x00AE;
    pub const PSK_WITH_NULL_SHA256: u16 = 0x00B0;
    pub const ECDHE_ECDSA_WITH_NULL_SHA: u16 = 0xC006;
    pub const ECDHE_ECDSA_WITH_AES_128_CBC_SHA: u16 = 0xC009;
    pub const ECDHE_ECDSA_WITH_AES_128_CBC_SHA256: u16 = 0xC023;
    pub const ECDHE_ECDSA_WITH_AES_128_GCM_SHA256: u16 = 0xC02B;
    pub const ECDHE_ECDSA_WITH_AES_256_GCM_SHA384: u16 = 0xC02C;
    pub const ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256: u16 = 0xCCA9;
}

/// Buffer defaults when the configuration leaves them out.
pub const DEFAULT_TLS_BUFFER_SIZE: usize = 4 * 1024;
pub const DEFAULT_RX_BUFFER_SIZE: usize = MAX_CIPHERTEXT_LEN;
pub const DEFAULT_ECDH_FIELD_LEN: usize = 32;
