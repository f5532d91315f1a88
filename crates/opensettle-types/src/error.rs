//! Error types for the OpenSettle settlement engine.
//!
//! All errors use the `OS_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Validation errors (hard, abort)
//! - 2xx: Order state errors (soft, nothing to do)
//! - 3xx: Arithmetic errors (hard, abort)
//! - 4xx: Dispatch errors (hard, abort with full rollback)
//! - 5xx: Admin / registry errors
//! - 6xx: Holdings errors raised by leaf asset handlers
//! - 9xx: General / internal errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Address, Amount, AssetTypeId, OrderHash, TokenId};

/// Subsystem an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorClass {
    Validation,
    State,
    Arithmetic,
    Dispatch,
    Admin,
    Holdings,
    Internal,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "VALIDATION"),
            Self::State => write!(f, "STATE"),
            Self::Arithmetic => write!(f, "ARITHMETIC"),
            Self::Dispatch => write!(f, "DISPATCH"),
            Self::Admin => write!(f, "ADMIN"),
            Self::Holdings => write!(f, "HOLDINGS"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// Central error enum for all OpenSettle operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpensettleError {
    // =================================================================
    // Validation Errors (1xx)
    // =================================================================
    /// Zero maker or taker amount. Such orders can never be filled.
    #[error("OS_ERR_100: Order invalid: {0}")]
    OrderInvalid(OrderHash),

    /// The maker's signature over the order hash didn't verify.
    #[error("OS_ERR_101: Order signature invalid: {0}")]
    SignatureInvalid(OrderHash),

    /// The order restricts its sender and the caller isn't it.
    #[error("OS_ERR_102: Sender not allowed for {0}")]
    SenderInvalid(OrderHash),

    /// The order restricts its taker and the caller isn't it.
    #[error("OS_ERR_103: Taker not allowed for {0}")]
    TakerInvalid(OrderHash),

    /// A fill must request a positive taker amount.
    #[error("OS_ERR_104: Requested taker amount must be positive for {0}")]
    InvalidTakerAmount(OrderHash),

    /// Only the maker may cancel an order.
    #[error("OS_ERR_105: Caller {caller} is not the maker of {order_hash}")]
    NotMaker { caller: Address, order_hash: OrderHash },

    /// Maker epochs only move forward.
    #[error("OS_ERR_106: Epoch for {maker} must increase: current {current}, requested {requested}")]
    EpochNotIncreasing {
        maker: Address,
        current: u64,
        requested: u64,
    },

    /// A fill-or-kill did not fill the full requested amount.
    #[error("OS_ERR_107: Incomplete fill of {order_hash}: requested {requested}, filled {filled}")]
    IncompleteFill {
        order_hash: OrderHash,
        requested: Amount,
        filled: Amount,
    },

    /// The request itself is malformed (mismatched batch lengths, etc.).
    #[error("OS_ERR_108: Invalid request: {reason}")]
    InvalidRequest { reason: String },

    // =================================================================
    // Order State Errors (2xx)
    // =================================================================
    #[error("OS_ERR_200: Order expired: {0}")]
    OrderExpired(OrderHash),

    #[error("OS_ERR_201: Order fully filled: {0}")]
    OrderFullyFilled(OrderHash),

    /// Cancelled explicitly or voided by the maker's epoch.
    #[error("OS_ERR_202: Order cancelled: {0}")]
    OrderCancelled(OrderHash),

    /// Integer truncation would distort the price by more than 0.1%.
    #[error("OS_ERR_203: Rounding error too large for {0}")]
    RoundingErrorTooLarge(OrderHash),

    // =================================================================
    // Arithmetic Errors (3xx)
    // =================================================================
    #[error("OS_ERR_300: Arithmetic overflow")]
    ArithmeticOverflow,

    #[error("OS_ERR_301: Arithmetic underflow")]
    ArithmeticUnderflow,

    #[error("OS_ERR_302: Division by zero")]
    DivisionByZero,

    // =================================================================
    // Dispatch Errors (4xx)
    // =================================================================
    /// No handler is registered for this asset type tag.
    #[error("OS_ERR_400: No handler registered for asset type {0}")]
    HandlerNotFound(AssetTypeId),

    /// A composite payload's amounts and sub-requests differ in length.
    #[error("OS_ERR_401: Composite length mismatch: {amounts} amounts, {sub_requests} sub-requests")]
    LengthMismatch { amounts: usize, sub_requests: usize },

    /// A leaf handler refused the transfer.
    #[error("OS_ERR_402: Transfer failed for asset type {asset_type}: {reason}")]
    TransferFailed {
        asset_type: AssetTypeId,
        reason: String,
    },

    /// The caller is not authorized to invoke this handler.
    #[error("OS_ERR_403: Caller {caller} not authorized")]
    Unauthorized { caller: Address },

    /// Asset data failed schema-driven decoding.
    #[error("OS_ERR_404: Malformed asset data: {reason}")]
    MalformedAssetData { reason: String },

    /// Composite payloads nested deeper than allowed.
    #[error("OS_ERR_405: Composite nesting exceeds depth {max_depth}")]
    NestingTooDeep { max_depth: usize },

    // =================================================================
    // Admin Errors (5xx)
    // =================================================================
    /// Only the owner may perform this administrative action.
    #[error("OS_ERR_500: Caller {caller} is not the owner")]
    NotOwner { caller: Address },

    #[error("OS_ERR_501: Handler already registered for asset type {0}")]
    HandlerAlreadyRegistered(AssetTypeId),

    #[error("OS_ERR_502: Caller {0} already authorized")]
    AlreadyAuthorized(Address),

    #[error("OS_ERR_503: Caller {0} is not in the authorized set")]
    NotInAuthorizedSet(Address),

    /// The handler for this asset type carries no authorization guard.
    #[error("OS_ERR_504: Asset type {0} has no authorization guard")]
    NoAuthorizationGuard(AssetTypeId),

    // =================================================================
    // Holdings Errors (6xx)
    // =================================================================
    #[error("OS_ERR_600: Insufficient {token} balance: need {needed}, have {available}")]
    InsufficientBalance {
        token: TokenId,
        needed: Amount,
        available: Amount,
    },

    #[error("OS_ERR_601: {owner} does not own {token} #{token_id}")]
    NotTokenOwner {
        owner: Address,
        token: TokenId,
        token_id: u128,
    },

    #[error("OS_ERR_602: Invalid transfer amount: {reason}")]
    InvalidAmount { reason: String },

    #[error("OS_ERR_603: Token {token} #{token_id} already minted")]
    TokenAlreadyMinted { token: TokenId, token_id: u128 },

    /// Supply conservation invariant violated.
    #[error("OS_ERR_604: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    // =================================================================
    // General (9xx)
    // =================================================================
    #[error("OS_ERR_901: Serialization error: {0}")]
    Serialization(String),

    #[error("OS_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

impl OpensettleError {
    /// Numeric code, identical to the one in the display prefix.
    #[must_use]
    pub fn code(&self) -> u16 {
        match self {
            Self::OrderInvalid(_) => 100,
            Self::SignatureInvalid(_) => 101,
            Self::SenderInvalid(_) => 102,
            Self::TakerInvalid(_) => 103,
            Self::InvalidTakerAmount(_) => 104,
            Self::NotMaker { .. } => 105,
            Self::EpochNotIncreasing { .. } => 106,
            Self::IncompleteFill { .. } => 107,
            Self::InvalidRequest { .. } => 108,
            Self::OrderExpired(_) => 200,
            Self::OrderFullyFilled(_) => 201,
            Self::OrderCancelled(_) => 202,
            Self::RoundingErrorTooLarge(_) => 203,
            Self::ArithmeticOverflow => 300,
            Self::ArithmeticUnderflow => 301,
            Self::DivisionByZero => 302,
            Self::HandlerNotFound(_) => 400,
            Self::LengthMismatch { .. } => 401,
            Self::TransferFailed { .. } => 402,
            Self::Unauthorized { .. } => 403,
            Self::MalformedAssetData { .. } => 404,
            Self::NestingTooDeep { .. } => 405,
            Self::NotOwner { .. } => 500,
            Self::HandlerAlreadyRegistered(_) => 501,
            Self::AlreadyAuthorized(_) => 502,
            Self::NotInAuthorizedSet(_) => 503,
            Self::NoAuthorizationGuard(_) => 504,
            Self::InsufficientBalance { .. } => 600,
            Self::NotTokenOwner { .. } => 601,
            Self::InvalidAmount { .. } => 602,
            Self::TokenAlreadyMinted { .. } => 603,
            Self::SupplyInvariantViolation { .. } => 604,
            Self::Serialization(_) => 901,
            Self::Configuration(_) => 902,
        }
    }

    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self.code() / 100 {
            1 => ErrorClass::Validation,
            2 => ErrorClass::State,
            3 => ErrorClass::Arithmetic,
            4 => ErrorClass::Dispatch,
            5 => ErrorClass::Admin,
            6 => ErrorClass::Holdings,
            _ => ErrorClass::Internal,
        }
    }

    /// Soft errors mean "nothing to do": reported, never an abort.
    #[must_use]
    pub fn is_soft(&self) -> bool {
        self.class() == ErrorClass::State
    }

    /// The order this error refers to, where there is one.
    #[must_use]
    pub fn order_hash(&self) -> Option<OrderHash> {
        match self {
            Self::OrderInvalid(h)
            | Self::SignatureInvalid(h)
            | Self::SenderInvalid(h)
            | Self::TakerInvalid(h)
            | Self::InvalidTakerAmount(h)
            | Self::OrderExpired(h)
            | Self::OrderFullyFilled(h)
            | Self::OrderCancelled(h)
            | Self::RoundingErrorTooLarge(h) => Some(*h),
            Self::NotMaker { order_hash, .. } | Self::IncompleteFill { order_hash, .. } => {
                Some(*order_hash)
            }
            _ => None,
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, OpensettleError>;

impl From<serde_json::Error> for OpensettleError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
