//! Order validator: derive an order's status from its fields and the ledger.
//!
//! Pure query: reads the ledger, never mutates it. Checks run in a fixed
//! order and the first match wins:
//!
//! | # | Check | Status |
//! |---|-------|--------|
//! | 1 | zero maker or taker amount | `Invalid` |
//! | 2 | no prior fill and bad maker signature | `SignatureInvalid` |
//! | 3 | `now >= expiration_time` | `Expired` |
//! | 4 | `filled >= taker_asset_amount` | `FullyFilled` |
//! | 5 | hash cancelled | `Cancelled` |
//! | 6 | `maker_epoch > salt` | `Cancelled` |
//! | 7 | sender restriction not met | `SenderInvalid` |
//!
//! An order with a non-zero recorded fill was authenticated when first
//! touched, so its signature is not checked again.

use opensettle_types::{Address, OrderInfo, OrderStatus, SignatureVerifier, SignedOrder};

use crate::ledger::SettlementLedger;

/// Status computation bound to a verifier and a point in time.
pub struct OrderValidator<'a> {
    verifier: &'a dyn SignatureVerifier,
    now: u64,
}

impl<'a> OrderValidator<'a> {
    #[must_use]
    pub fn new(verifier: &'a dyn SignatureVerifier, now: u64) -> Self {
        Self { verifier, now }
    }

    /// Status, hash and cumulative fill of `signed` as seen by `caller`.
    #[must_use]
    pub fn order_info(
        &self,
        signed: &SignedOrder,
        ledger: &SettlementLedger,
        caller: &Address,
    ) -> OrderInfo {
        let order = &signed.order;
        let order_hash = order.hash();
        let filled = ledger.filled_amount(&order_hash);
        let info = |status| OrderInfo {
            status,
            order_hash,
            taker_asset_filled_amount: filled,
        };

        if order.has_zero_amount() {
            return info(OrderStatus::Invalid);
        }
        if filled == 0
            && !self
                .verifier
                .is_valid_signature(&order_hash, &order.maker_address, &signed.signature)
        {
            return info(OrderStatus::SignatureInvalid);
        }
        if order.is_expired_at(self.now) {
            return info(OrderStatus::Expired);
        }
        if filled >= order.taker_asset_amount {
            return info(OrderStatus::FullyFilled);
        }
        if ledger.is_cancelled(&order_hash) {
            return info(OrderStatus::Cancelled);
        }
        if ledger.maker_epoch(&order.maker_address) > order.salt {
            return info(OrderStatus::Cancelled);
        }
        if order.sender_address.is_some_and(|sender| sender != *caller) {
            return info(OrderStatus::SenderInvalid);
        }
        info(OrderStatus::Success)
    }
}
