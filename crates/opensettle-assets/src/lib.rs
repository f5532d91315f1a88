//! # opensettle-assets
//!
//! **Asset transfer plane for OpenSettle.**
//!
//! Every settlement leg ends up here as `(asset data, from, to, amount)`.
//! The plane provides:
//!
//! - **Type-tagged dispatch**: the 4-byte tag in front of asset data selects
//!   the handler ([`AssetTransferDispatcher`])
//! - **Composite transfers**: one leg fanning out into scaled sub-transfers,
//!   atomically ([`CompositeAssetHandler`])
//! - **Caller authorization**: privileged handlers only answer authorized
//!   callers ([`AuthorizationGuard`])
//! - **Holdings with rollback**: balances and ownership behind a nested
//!   undo journal ([`HoldingsBook`])

pub mod authorization;
pub mod codec;
pub mod composite;
pub mod dispatcher;
pub mod fungible;
pub mod handler;
pub mod holdings;
pub mod non_fungible;

pub use authorization::AuthorizationGuard;
pub use codec::{AssetData, CompositePayload, TransferRequest, decode_fungible, decode_non_fungible};
pub use composite::CompositeAssetHandler;
pub use dispatcher::AssetTransferDispatcher;
pub use fungible::FungibleTokenHandler;
pub use handler::{AssetHandler, TransferContext};
pub use holdings::{Checkpoint, HoldingsBook};
pub use non_fungible::NonFungibleTokenHandler;
