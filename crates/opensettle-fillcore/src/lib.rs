//! # opensettle-fillcore
//!
//! **Pure fill arithmetic for OpenSettle.**
//!
//! FillCore is the compute plane: it turns an order, its cumulative fill and
//! a taker request into exact settlement amounts. It has:
//!
//! - **Zero side effects**: no ledger reads or writes, no transfers
//! - **Exact integers**: floor division after a full-width multiply
//! - **Mandatory overflow detection**: overflow aborts, never wraps
//! - **Rounding bound**: fills that distort the price by more than 0.1% are refused

pub mod calculator;
pub mod math;

pub use calculator::compute_fill;
pub use math::{is_rounding_error_excessive, proportional_amount, relative_rounding_error, safe_sub};
