//! Settlement events: the observability surface of the engine.
//!
//! Events are immutable records appended by committed operations. A hard
//! failure rolls its events back together with its state changes; soft
//! failures leave a [`SettlementEvent::SettlementError`] behind.

use serde::{Deserialize, Serialize};

use crate::{Address, Amount, ErrorClass, FillResult, OpensettleError, Order, OrderHash};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementEvent {
    /// A fill was settled and recorded in the ledger.
    FillRecorded {
        maker: Address,
        taker: Address,
        fee_recipient: Address,
        maker_asset_filled_amount: Amount,
        taker_asset_filled_amount: Amount,
        maker_fee_paid: Amount,
        taker_fee_paid: Amount,
        order_hash: OrderHash,
        maker_asset_data: Vec<u8>,
        taker_asset_data: Vec<u8>,
    },
    /// An order was cancelled by its maker.
    OrderCancelled {
        maker: Address,
        fee_recipient: Address,
        order_hash: OrderHash,
        maker_asset_data: Vec<u8>,
        taker_asset_data: Vec<u8>,
    },
    /// A maker voided every order with `salt < new_epoch`.
    EpochCancelled { maker: Address, new_epoch: u64 },
    /// A settlement request had nothing to do.
    SettlementError {
        code: u16,
        class: ErrorClass,
        order_hash: Option<OrderHash>,
    },
}

impl SettlementEvent {
    #[must_use]
    pub fn fill_recorded(
        order: &Order,
        order_hash: OrderHash,
        taker: Address,
        fill: &FillResult,
    ) -> Self {
        Self::FillRecorded {
            maker: order.maker_address,
            taker,
            fee_recipient: order.fee_recipient_address,
            maker_asset_filled_amount: fill.maker_asset_filled_amount,
            taker_asset_filled_amount: fill.taker_asset_filled_amount,
            maker_fee_paid: fill.maker_fee_paid,
            taker_fee_paid: fill.taker_fee_paid,
            order_hash,
            maker_asset_data: order.maker_asset_data.clone(),
            taker_asset_data: order.taker_asset_data.clone(),
        }
    }

    #[must_use]
    pub fn order_cancelled(order: &Order, order_hash: OrderHash) -> Self {
        Self::OrderCancelled {
            maker: order.maker_address,
            fee_recipient: order.fee_recipient_address,
            order_hash,
            maker_asset_data: order.maker_asset_data.clone(),
            taker_asset_data: order.taker_asset_data.clone(),
        }
    }

    #[must_use]
    pub fn settlement_error(err: &OpensettleError) -> Self {
        Self::SettlementError {
            code: err.code(),
            class: err.class(),
            order_hash: err.order_hash(),
        }
    }

    /// The order this event refers to, if any.
    #[must_use]
    pub fn order_hash(&self) -> Option<OrderHash> {
        match self {
            Self::FillRecorded { order_hash, .. } | Self::OrderCancelled { order_hash, .. } => {
                Some(*order_hash)
            }
            Self::SettlementError { order_hash, .. } => *order_hash,
            Self::EpochCancelled { .. } => None,
        }
    }
}
