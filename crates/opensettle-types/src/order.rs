//! Order model for the OpenSettle settlement engine.
//!
//! An [`Order`] is an immutable, maker-signed intent. It is never stored
//! wholesale: the engine only keeps per-[`OrderHash`] fill and cancel state.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Address, Amount, OrderHash};

/// Domain separator mixed into every order hash.
const ORDER_HASH_DOMAIN: &[u8] = b"opensettle:order:v1:";

/// A maker's signed intent to exchange `maker_asset_amount` of one asset for
/// `taker_asset_amount` of another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub maker_address: Address,
    /// When set, only this party may fill the order.
    pub taker_address: Option<Address>,
    /// When set, only this party may submit fills or cancellations.
    pub sender_address: Option<Address>,
    pub fee_recipient_address: Address,
    pub maker_asset_amount: Amount,
    pub taker_asset_amount: Amount,
    pub maker_fee: Amount,
    pub taker_fee: Amount,
    /// Unix seconds. The order is expired once `now >= expiration_time`.
    pub expiration_time: u64,
    pub salt: u64,
    /// Asset data (`[type tag][payload]`) of what the maker gives.
    pub maker_asset_data: Vec<u8>,
    /// Asset data (`[type tag][payload]`) of what the maker receives.
    pub taker_asset_data: Vec<u8>,
}

impl Order {
    /// Canonical byte encoding covering every field.
    ///
    /// Format: `domain || maker || opt(taker) || opt(sender) || fee_recipient
    /// || maker_amount || taker_amount || maker_fee || taker_fee
    /// || expiration || salt || len(maker_data) || maker_data
    /// || len(taker_data) || taker_data`, integers big-endian, optional
    /// addresses prefixed with a presence byte.
    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(
            256 + self.maker_asset_data.len() + self.taker_asset_data.len(),
        );
        buf.extend_from_slice(ORDER_HASH_DOMAIN);
        buf.extend_from_slice(self.maker_address.as_bytes());
        push_optional_address(&mut buf, self.taker_address.as_ref());
        push_optional_address(&mut buf, self.sender_address.as_ref());
        buf.extend_from_slice(self.fee_recipient_address.as_bytes());
        buf.extend_from_slice(&self.maker_asset_amount.to_be_bytes());
        buf.extend_from_slice(&self.taker_asset_amount.to_be_bytes());
        buf.extend_from_slice(&self.maker_fee.to_be_bytes());
        buf.extend_from_slice(&self.taker_fee.to_be_bytes());
        buf.extend_from_slice(&self.expiration_time.to_be_bytes());
        buf.extend_from_slice(&self.salt.to_be_bytes());
        push_length_prefixed(&mut buf, &self.maker_asset_data);
        push_length_prefixed(&mut buf, &self.taker_asset_data);
        buf
    }

    /// Deterministic order identity.
    #[must_use]
    pub fn hash(&self) -> OrderHash {
        let digest = Sha256::digest(self.canonical_bytes());
        OrderHash(digest.into())
    }

    /// Zero-amount orders can never be filled or cancelled.
    #[must_use]
    pub fn has_zero_amount(&self) -> bool {
        self.maker_asset_amount == 0 || self.taker_asset_amount == 0
    }

    #[must_use]
    pub fn is_expired_at(&self, now: u64) -> bool {
        now >= self.expiration_time
    }
}

fn push_optional_address(buf: &mut Vec<u8>, address: Option<&Address>) {
    match address {
        Some(addr) => {
            buf.push(1);
            buf.extend_from_slice(addr.as_bytes());
        }
        None => buf.push(0),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn push_length_prefixed(buf: &mut Vec<u8>, data: &[u8]) {
    buf.extend_from_slice(&(data.len() as u64).to_be_bytes());
    buf.extend_from_slice(data);
}

/// An order together with the maker's signature over its hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedOrder {
    pub order: Order,
    pub signature: Vec<u8>,
}

impl SignedOrder {
    #[must_use]
    pub fn new(order: Order, signature: Vec<u8>) -> Self {
        Self { order, signature }
    }

    #[must_use]
    pub fn hash(&self) -> OrderHash {
        self.order.hash()
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Order {
    /// A fillable order with no fees, no taker/sender restriction and a
    /// far-future expiration.
    pub fn dummy(
        maker: Address,
        maker_asset_data: Vec<u8>,
        maker_asset_amount: Amount,
        taker_asset_data: Vec<u8>,
        taker_asset_amount: Amount,
    ) -> Self {
        Self {
            maker_address: maker,
            taker_address: None,
            sender_address: None,
            fee_recipient_address: Address([0xfe; 32]),
            maker_asset_amount,
            taker_asset_amount,
            maker_fee: 0,
            taker_fee: 0,
            expiration_time: u64::from(u32::MAX),
            salt: rand::random::<u64>() >> 1,
            maker_asset_data,
            taker_asset_data,
        }
    }
}
