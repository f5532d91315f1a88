//! # opensettle-types
//!
//! Shared types, errors, and configuration for the **OpenSettle** settlement engine.
//!
//! This crate is the leaf dependency of the workspace: Every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`Address`], [`OrderHash`], [`AssetTypeId`], [`TokenId`], [`OperationId`]
//! - **Order model**: [`Order`], [`SignedOrder`]
//! - **Fill model**: [`FillResult`], [`OrderStatus`], [`FillStatus`], [`OrderInfo`]
//! - **Events**: [`SettlementEvent`]
//! - **Configuration**: [`EngineConfig`]
//! - **Capabilities**: [`SignatureVerifier`], [`Clock`]
//! - **Errors**: [`OpensettleError`] with `OS_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod fill;
pub mod ids;
pub mod order;
pub mod signature;

pub use clock::*;
pub use config::*;
pub use error::*;
pub use events::*;
pub use fill::*;
pub use ids::*;
pub use order::*;
pub use signature::{Ed25519Verifier, SignatureVerifier};

#[cfg(any(test, feature = "test-helpers"))]
pub use signature::test_keys;

// Constants are accessed via `opensettle_types::constants::FOO`
// (not re-exported to avoid name collisions).
