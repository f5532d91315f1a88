//! # opensettle-exchange
//!
//! **Settlement engine for OpenSettle.**
//!
//! Validates signed orders, computes exact fills and settles them through the
//! asset transfer plane, one atomic unit per operation:
//!
//! - **Order validation**: status from order fields and ledger state ([`OrderValidator`])
//! - **Settlement ledger**: cumulative fills, cancellations, maker epochs ([`SettlementLedger`])
//! - **Engine**: fills, batches, market orders, cancels, transfers, admin ([`SettlementEngine`])
//! - **Events**: buffered observability surface ([`EventLog`])

pub mod engine;
pub mod event_log;
pub mod ledger;
pub mod validator;

pub use engine::SettlementEngine;
pub use event_log::EventLog;
pub use ledger::{LedgerCheckpoint, SettlementLedger};
pub use validator::OrderValidator;
