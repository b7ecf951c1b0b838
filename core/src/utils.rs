use std::fmt;
use num_enum::TryFromPrimitive;

use crate::constants::AES_BLOCK_LEN;

/// Registry-aware rendering of a wire value: the variant name when known, hex otherwise.
pub fn enum_name_or_hex<T>(raw: T::Primitive) -> String
where
    T: TryFromPrimitive + fmt::Debug,
    T::Primitive: fmt::LowerHex,
{
    match T::try_from_primitive(raw) {
        Ok(variant) => format!("{:?}", variant),
        Err(_) => format!("0x{:x}", raw),
    }
}

/// CBC padding value for a record of `content_len` bytes with a `mac_len`-byte MAC.
///
/// The record carries `padding + 1` bytes each equal to `padding`, so that
/// `content_len + mac_len + padding + 1` is a multiple of the block size.
pub fn padding_len(content_len: usize, mac_len: usize) -> usize {
    (AES_BLOCK_LEN - (content_len + mac_len + 1) % AES_BLOCK_LEN) % AES_BLOCK_LEN
}

/// Full CBC record length on the wire (explicit IV included).
pub fn cbc_record_len(content_len: usize, mac_len: usize) -> usize {
    AES_BLOCK_LEN + content_len + mac_len + padding_len(content_len, mac_len) + 1
}

pub fn round_up_block(len: usize) -> usize {
    len.div_ceil(AES_BLOCK_LEN) * AES_BLOCK_LEN
}
