//! Identifiers used throughout OpenSettle.
//!
//! Parties are identified by their ed25519 public key ([`Address`]), orders by
//! the SHA-256 digest of their canonical encoding ([`OrderHash`]), and asset
//! handlers by a 4-byte type tag ([`AssetTypeId`]).

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// Identity of a party (maker, taker, sender, fee recipient, engine, admin).
/// This is the raw ed25519 public key (32 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// The all-zero address. Never a valid signer.
    pub const ZERO: Self = Self([0u8; 32]);

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl From<ed25519_dalek::VerifyingKey> for Address {
    fn from(key: ed25519_dalek::VerifyingKey) -> Self {
        Self(key.to_bytes())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// OrderHash
// ---------------------------------------------------------------------------

/// Canonical identity of an order: SHA-256 over every order field.
///
/// Two orders with identical fields share a hash. Replay is bounded by the
/// cumulative fill tracked per hash, not by uniqueness of submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct OrderHash(pub [u8; 32]);

impl OrderHash {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for OrderHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "order:{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// AssetTypeId
// ---------------------------------------------------------------------------

/// 4-byte tag selecting the handler that moves an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AssetTypeId(pub [u8; 4]);

impl AssetTypeId {
    /// Fungible token balances.
    pub const FUNGIBLE: Self = Self([0xf4, 0x72, 0x61, 0xb0]);
    /// Uniquely owned token ids.
    pub const NON_FUNGIBLE: Self = Self([0x02, 0x57, 0x17, 0x92]);
    /// A bundle of proportionally scaled sub-transfers.
    pub const COMPOSITE: Self = Self([0x94, 0xcf, 0xcd, 0xd7]);

    #[must_use]
    pub fn from_u32(tag: u32) -> Self {
        Self(tag.to_be_bytes())
    }

    #[must_use]
    pub fn as_u32(&self) -> u32 {
        u32::from_be_bytes(self.0)
    }
}

impl fmt::Display for AssetTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

// ---------------------------------------------------------------------------
// TokenId
// ---------------------------------------------------------------------------

/// Identifier of a token contract / asset class inside the holdings store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct TokenId(pub [u8; 32]);

impl TokenId {
    /// Build a token id from a short symbol, left-aligned and zero-padded.
    /// Symbols longer than 32 bytes are truncated.
    #[must_use]
    pub fn from_symbol(symbol: &str) -> Self {
        let mut bytes = [0u8; 32];
        let src = symbol.as_bytes();
        let n = src.len().min(32);
        bytes[..n].copy_from_slice(&src[..n]);
        Self(bytes)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let end = self.0.iter().position(|b| *b == 0).unwrap_or(32);
        match std::str::from_utf8(&self.0[..end]) {
            Ok(s) if !s.is_empty() && self.0[end..].iter().all(|b| *b == 0) => {
                write!(f, "{s}")
            }
            _ => write!(f, "token:{}", hex::encode(&self.0[..8])),
        }
    }
}

// ---------------------------------------------------------------------------
// OperationId
// ---------------------------------------------------------------------------

/// Correlates every log line of one atomic engine operation.
/// Uses UUIDv7 for time-ordered sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct OperationId(pub Uuid);

impl OperationId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op:{}", self.0)
    }
}

/// Integer amount of an asset. All arithmetic on it is overflow-checked.
pub type Amount = u128;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_type_tags_round_trip_u32() {
        assert_eq!(AssetTypeId::COMPOSITE.as_u32(), 0x94cf_cdd7);
        assert_eq!(AssetTypeId::from_u32(0xf472_61b0), AssetTypeId::FUNGIBLE);
        assert_eq!(format!("{}", AssetTypeId::NON_FUNGIBLE), "0x02571792");
    }

    #[test]
    fn token_id_symbol_display() {
        assert_eq!(TokenId::from_symbol("WETH").to_string(), "WETH");
        let raw = TokenId([0xab; 32]);
        assert!(raw.to_string().starts_with("token:abab"));
    }

    #[test]
    fn zero_address() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address([1u8; 32]).is_zero());
    }

    #[test]
    fn operation_ids_are_ordered() {
        let a = OperationId::new();
        let b = OperationId::new();
        assert_ne!(a, b);
        assert!(a < b);
    }

    #[test]
    fn serde_roundtrips() {
        let addr = Address([7u8; 32]);
        let json = serde_json::to_string(&addr).unwrap();
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, back);

        let tag = AssetTypeId::COMPOSITE;
        let json = serde_json::to_string(&tag).unwrap();
        let back: AssetTypeId = serde_json::from_str(&json).unwrap();
        assert_eq!(tag, back);
    }
}
