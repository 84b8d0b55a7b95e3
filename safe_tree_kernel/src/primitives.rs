//! SafeTree v1 - Primitive Types
//!
//! Fixed-width identifiers, ABI-style word encoding and the checked
//! counters used by the registry. Every identifier renders as
//! `0x`-prefixed lowercase hex, both in `Display` and in serde output.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::error::ModuleError;

/// Numeric safe identifier. Unique across the whole registry.
pub type SafeId = u64;

/// Parent id of a ROOT-tier (or removed) node.
pub const NO_SAFE: SafeId = 0;

/// Organization identifier: SHA-256 of the organization name.
pub type OrgHash = Hash32;

// ---------------------------------------------------------------------------
// Hex helpers
// ---------------------------------------------------------------------------

/// Malformed hex input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HexError {
    #[error("missing 0x prefix")]
    MissingPrefix,
    #[error("expected {expected} hex digits, got {got}")]
    BadLength { expected: usize, got: usize },
    #[error("invalid hex digit {0:?}")]
    BadDigit(char),
}

/// Lowercase hex, no prefix.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn nibble(c: char) -> Result<u8, HexError> {
    c.to_digit(16).map(|d| d as u8).ok_or(HexError::BadDigit(c))
}

fn decode_prefixed<const N: usize>(s: &str) -> Result<[u8; N], HexError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or(HexError::MissingPrefix)?;
    if digits.len() != N * 2 {
        return Err(HexError::BadLength {
            expected: N * 2,
            got: digits.len(),
        });
    }
    let raw = digits.as_bytes();
    let mut out = [0u8; N];
    for (i, byte) in out.iter_mut().enumerate() {
        let hi = nibble(raw[2 * i] as char)?;
        let lo = nibble(raw[2 * i + 1] as char)?;
        *byte = (hi << 4) | lo;
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// 20-byte account reference (wallet, EOA, module or call target).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    /// Head marker of linked account lists. Never a valid member.
    pub const SENTINEL: Address = Address([
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1,
    ]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }

    /// Address whose low 8 bytes hold `v` big-endian.
    pub fn from_low_u64(v: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&v.to_be_bytes());
        Address(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        *self == Address::ZERO
    }

    /// Left-padded 32-byte word.
    pub fn to_word(&self) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&self.0);
        word
    }
}

/// Reject the zero address and the list sentinel.
pub fn validate_account(account: Address) -> Result<(), ModuleError> {
    if account.is_zero() {
        return Err(ModuleError::ZeroAddressProvided);
    }
    if account == Address::SENTINEL {
        return Err(ModuleError::InvalidAddressProvided(account));
    }
    Ok(())
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", to_hex(&self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = HexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_prefixed::<20>(s).map(Address)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Hash32
// ---------------------------------------------------------------------------

/// 32-byte digest.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Hash32(pub [u8; 32]);

impl Hash32 {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Hash32(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        to_hex(&self.0)
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", to_hex(&self.0))
    }
}

impl fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash32({})", self)
    }
}

impl FromStr for Hash32 {
    type Err = HexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_prefixed::<32>(s).map(Hash32)
    }
}

impl Serialize for Hash32 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Hash32 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Words and counters
// ---------------------------------------------------------------------------

/// Big-endian 32-byte word of an unsigned integer.
pub fn word_u128(v: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&v.to_be_bytes());
    word
}

pub fn word_u64(v: u64) -> [u8; 32] {
    word_u128(v as u128)
}

/// Next nonce value. Fails instead of wrapping.
pub fn checked_next_nonce(nonce: u64) -> Result<u64, ModuleError> {
    nonce.checked_add(1).ok_or(ModuleError::NonceOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_hex_roundtrip() {
        let a = Address::from_low_u64(0xabcd);
        let s = a.to_string();
        assert_eq!(s, "0x000000000000000000000000000000000000abcd");
        assert_eq!(s.parse::<Address>().unwrap(), a);
    }

    #[test]
    fn address_rejects_bad_input() {
        assert_eq!("abcd".parse::<Address>(), Err(HexError::MissingPrefix));
        assert!(matches!(
            "0x1234".parse::<Address>(),
            Err(HexError::BadLength { expected: 40, got: 4 })
        ));
        let bad = format!("0x{}zz", "0".repeat(38));
        assert_eq!(bad.parse::<Address>(), Err(HexError::BadDigit('z')));
    }

    #[test]
    fn address_word_is_left_padded() {
        let word = Address::SENTINEL.to_word();
        assert!(word[..31].iter().all(|b| *b == 0));
        assert_eq!(word[31], 1);
    }

    #[test]
    fn validate_account_rejects_zero_and_sentinel() {
        assert_eq!(
            validate_account(Address::ZERO),
            Err(ModuleError::ZeroAddressProvided)
        );
        assert_eq!(
            validate_account(Address::SENTINEL),
            Err(ModuleError::InvalidAddressProvided(Address::SENTINEL))
        );
        assert!(validate_account(Address::from_low_u64(7)).is_ok());
    }

    #[test]
    fn serde_uses_hex_strings() {
        let h = Hash32::new([0x11; 32]);
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"0x{}\"", "11".repeat(32)));
        let back: Hash32 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }

    #[test]
    fn word_u64_is_big_endian() {
        let w = word_u64(0x0102);
        assert_eq!(w[30], 0x01);
        assert_eq!(w[31], 0x02);
    }

    #[test]
    fn nonce_overflow_is_an_error() {
        assert_eq!(checked_next_nonce(4), Ok(5));
        assert_eq!(checked_next_nonce(u64::MAX), Err(ModuleError::NonceOverflow));
    }
}
