//! Fill results and order statuses.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Amount, OpensettleError, OrderHash, Result};

/// Amounts moved by one fill. All zero on every failure path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FillResult {
    pub maker_asset_filled_amount: Amount,
    pub taker_asset_filled_amount: Amount,
    pub maker_fee_paid: Amount,
    pub taker_fee_paid: Amount,
}

impl FillResult {
    /// The zero-valued result returned for soft failures.
    pub const ZERO: Self = Self {
        maker_asset_filled_amount: 0,
        taker_asset_filled_amount: 0,
        maker_fee_paid: 0,
        taker_fee_paid: 0,
    };

    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Field-wise sum, failing on overflow.
    pub fn checked_add(&self, other: &Self) -> Result<Self> {
        let add = |a: Amount, b: Amount| {
            a.checked_add(b).ok_or(OpensettleError::ArithmeticOverflow)
        };
        Ok(Self {
            maker_asset_filled_amount: add(
                self.maker_asset_filled_amount,
                other.maker_asset_filled_amount,
            )?,
            taker_asset_filled_amount: add(
                self.taker_asset_filled_amount,
                other.taker_asset_filled_amount,
            )?,
            maker_fee_paid: add(self.maker_fee_paid, other.maker_fee_paid)?,
            taker_fee_paid: add(self.taker_fee_paid, other.taker_fee_paid)?,
        })
    }
}

/// Status of an order derived from its fields and the ledger.
///
/// `Invalid`, `SignatureInvalid` and `SenderInvalid` are hard validation
/// failures. `Expired`, `FullyFilled` and `Cancelled` mean "nothing to do".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// A zero maker or taker amount.
    Invalid,
    SignatureInvalid,
    SenderInvalid,
    Expired,
    FullyFilled,
    /// Explicitly cancelled or voided by the maker's epoch.
    Cancelled,
    /// Open and fillable by the caller.
    Success,
}

impl OrderStatus {
    #[must_use]
    pub fn is_hard_failure(&self) -> bool {
        matches!(
            self,
            Self::Invalid | Self::SignatureInvalid | Self::SenderInvalid
        )
    }

    /// Convert a non-fillable status into its error, tagged with the order.
    /// Returns `None` for [`OrderStatus::Success`].
    #[must_use]
    pub fn into_error(self, order_hash: OrderHash) -> Option<OpensettleError> {
        match self {
            Self::Invalid => Some(OpensettleError::OrderInvalid(order_hash)),
            Self::SignatureInvalid => Some(OpensettleError::SignatureInvalid(order_hash)),
            Self::SenderInvalid => Some(OpensettleError::SenderInvalid(order_hash)),
            Self::Expired => Some(OpensettleError::OrderExpired(order_hash)),
            Self::FullyFilled => Some(OpensettleError::OrderFullyFilled(order_hash)),
            Self::Cancelled => Some(OpensettleError::OrderCancelled(order_hash)),
            Self::Success => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid => write!(f, "INVALID"),
            Self::SignatureInvalid => write!(f, "SIGNATURE_INVALID"),
            Self::SenderInvalid => write!(f, "SENDER_INVALID"),
            Self::Expired => write!(f, "EXPIRED"),
            Self::FullyFilled => write!(f, "FULLY_FILLED"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Success => write!(f, "SUCCESS"),
        }
    }
}

/// Outcome of the fill computation once an order is known to be fillable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FillStatus {
    Success,
    /// Truncation would distort the exchange rate by more than 0.1%.
    RoundingErrorTooLarge,
}

impl fmt::Display for FillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::RoundingErrorTooLarge => write!(f, "ROUNDING_ERROR_TOO_LARGE"),
        }
    }
}

/// Read-only view of an order: status, identity and cumulative fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderInfo {
    pub status: OrderStatus,
    pub order_hash: OrderHash,
    pub taker_asset_filled_amount: Amount,
}
