//! Asset transfer dispatcher: routes typed transfers to registered handlers.
//!
//! ## Dispatch Flow
//!
//! ```text
//! asset data ─▶ [tag | payload] ─▶ registry lookup ─▶ handler.transfer()
//!                                        │
//!                                        └─ missing ─▶ HandlerNotFound
//! ```
//!
//! Every dispatch runs inside its own holdings checkpoint: a handler that
//! fails leaves no trace, whatever it did before failing. Sequencing several
//! dispatches atomically is the caller's job (see `CompositeAssetHandler`).
//!
//! Registry mutation is restricted to the dispatcher's owner.

use std::collections::BTreeMap;

use opensettle_types::{Address, Amount, AssetTypeId, ErrorClass, OpensettleError, Result};

use crate::codec::{AssetData, TransferRequest};
use crate::handler::{AssetHandler, TransferContext};
use crate::AuthorizationGuard;

/// Registry mapping asset type tags to handler objects.
pub struct AssetTransferDispatcher {
    owner: Address,
    handlers: BTreeMap<AssetTypeId, Box<dyn AssetHandler>>,
}

impl AssetTransferDispatcher {
    /// Create an empty registry administered by `owner`.
    #[must_use]
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            handlers: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Register `handler` under its own asset type tag.
    pub fn register_handler(
        &mut self,
        admin: &Address,
        handler: Box<dyn AssetHandler>,
    ) -> Result<()> {
        self.ensure_owner(admin)?;
        let asset_type = handler.asset_type();
        if self.handlers.contains_key(&asset_type) {
            return Err(OpensettleError::HandlerAlreadyRegistered(asset_type));
        }
        self.handlers.insert(asset_type, handler);
        tracing::info!(asset_type = %asset_type, "Asset handler registered");
        Ok(())
    }

    /// Remove and return the handler for `asset_type`.
    pub fn deregister_handler(
        &mut self,
        admin: &Address,
        asset_type: AssetTypeId,
    ) -> Result<Box<dyn AssetHandler>> {
        self.ensure_owner(admin)?;
        let handler = self
            .handlers
            .remove(&asset_type)
            .ok_or(OpensettleError::HandlerNotFound(asset_type))?;
        tracing::info!(asset_type = %asset_type, "Asset handler deregistered");
        Ok(handler)
    }

    #[must_use]
    pub fn registered_types(&self) -> Vec<AssetTypeId> {
        self.handlers.keys().copied().collect()
    }

    /// The authorization guard of the handler for `asset_type`.
    pub fn authorization(&self, asset_type: AssetTypeId) -> Result<&AuthorizationGuard> {
        self.handlers
            .get(&asset_type)
            .ok_or(OpensettleError::HandlerNotFound(asset_type))?
            .authorization()
            .ok_or(OpensettleError::NoAuthorizationGuard(asset_type))
    }

    /// Mutable access to a handler's guard. The guard enforces its own
    /// owner check on every mutation.
    pub fn authorization_mut(
        &mut self,
        asset_type: AssetTypeId,
    ) -> Result<&mut AuthorizationGuard> {
        self.handlers
            .get_mut(&asset_type)
            .ok_or(OpensettleError::HandlerNotFound(asset_type))?
            .authorization_mut()
            .ok_or(OpensettleError::NoAuthorizationGuard(asset_type))
    }

    /// Route one transfer to the handler registered for `asset_type`.
    ///
    /// Leaf failures surface as [`OpensettleError::TransferFailed`];
    /// dispatch and arithmetic errors propagate unchanged.
    pub fn dispatch(
        &self,
        ctx: &mut TransferContext<'_>,
        asset_type: AssetTypeId,
        payload: &[u8],
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        let handler = self
            .handlers
            .get(&asset_type)
            .ok_or(OpensettleError::HandlerNotFound(asset_type))?;

        tracing::debug!(
            asset_type = %asset_type,
            from = %from,
            to = %to,
            amount,
            caller = %ctx.caller(),
            depth = ctx.depth(),
            "Dispatching transfer"
        );

        let cp = ctx.holdings().begin();
        match handler.transfer(ctx, payload, from, to, amount) {
            Ok(()) => {
                ctx.holdings().release(cp);
                Ok(())
            }
            Err(err) => {
                ctx.holdings().rollback(cp);
                Err(escalate(asset_type, err))
            }
        }
    }

    /// Dispatch raw asset data (`[tag][payload]`).
    pub fn dispatch_asset_data(
        &self,
        ctx: &mut TransferContext<'_>,
        asset_data: &[u8],
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        let asset = AssetData::decode(asset_data)?;
        self.dispatch(ctx, asset.asset_type, &asset.payload, from, to, amount)
    }

    pub fn dispatch_request(
        &self,
        ctx: &mut TransferContext<'_>,
        request: &TransferRequest,
    ) -> Result<()> {
        self.dispatch(
            ctx,
            request.asset.asset_type,
            &request.asset.payload,
            request.from,
            request.to,
            request.amount,
        )
    }

    fn ensure_owner(&self, caller: &Address) -> Result<()> {
        if *caller == self.owner {
            Ok(())
        } else {
            Err(OpensettleError::NotOwner { caller: *caller })
        }
    }
}

fn escalate(asset_type: AssetTypeId, err: OpensettleError) -> OpensettleError {
    match err.class() {
        ErrorClass::Dispatch | ErrorClass::Arithmetic => err,
        _ => OpensettleError::TransferFailed {
            asset_type,
            reason: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FungibleTokenHandler, HoldingsBook};
    use opensettle_types::TokenId;

    const ADMIN: Address = Address([1u8; 32]);
    const ALICE: Address = Address([2u8; 32]);
    const BOB: Address = Address([3u8; 32]);

    /// Moves funds, then fails: checks the per-dispatch rollback.
    struct HalfwayHandler;

    impl AssetHandler for HalfwayHandler {
        fn asset_type(&self) -> AssetTypeId {
            AssetTypeId::from_u32(0xdead_beef)
        }

        fn transfer(
            &self,
            ctx: &mut TransferContext<'_>,
            _payload: &[u8],
            from: Address,
            to: Address,
            amount: Amount,
        ) -> Result<()> {
            ctx.holdings()
                .transfer_fungible(TokenId::from_symbol("WETH"), from, to, amount)?;
            Err(OpensettleError::InvalidAmount {
                reason: "always fails".into(),
            })
        }
    }

    fn setup() -> (AssetTransferDispatcher, HoldingsBook) {
        let mut dispatcher = AssetTransferDispatcher::new(ADMIN);
        dispatcher
            .register_handler(&ADMIN, Box::new(FungibleTokenHandler))
            .unwrap();
        let mut book = HoldingsBook::new();
        book.mint_fungible(TokenId::from_symbol("WETH"), ALICE, 100)
            .unwrap();
        (dispatcher, book)
    }

    #[test]
    fn routes_by_tag() {
        let (dispatcher, mut book) = setup();
        let asset = AssetData::fungible(TokenId::from_symbol("WETH"));
        let mut ctx = TransferContext::new(&mut book, &dispatcher, ALICE, 8);
        dispatcher
            .dispatch_asset_data(&mut ctx, &asset.encode(), ALICE, BOB, 30)
            .unwrap();
        assert_eq!(book.balance_of(TokenId::from_symbol("WETH"), BOB), 30);
    }

    #[test]
    fn unknown_tag_is_handler_not_found() {
        let (dispatcher, mut book) = setup();
        let mut ctx = TransferContext::new(&mut book, &dispatcher, ALICE, 8);
        let err = dispatcher
            .dispatch(&mut ctx, AssetTypeId::COMPOSITE, &[], ALICE, BOB, 1)
            .unwrap_err();
        assert_eq!(err, OpensettleError::HandlerNotFound(AssetTypeId::COMPOSITE));
    }

    #[test]
    fn leaf_failure_becomes_transfer_failed() {
        let (dispatcher, mut book) = setup();
        let asset = AssetData::fungible(TokenId::from_symbol("WETH"));
        let mut ctx = TransferContext::new(&mut book, &dispatcher, ALICE, 8);
        let err = dispatcher
            .dispatch_request(
                &mut ctx,
                &TransferRequest {
                    asset,
                    from: ALICE,
                    to: BOB,
                    amount: 1_000,
                },
            )
            .unwrap_err();
        assert!(matches!(
            err,
            OpensettleError::TransferFailed { asset_type, .. }
                if asset_type == AssetTypeId::FUNGIBLE
        ));
    }

    #[test]
    fn failed_dispatch_leaves_no_partial_effect() {
        let (mut dispatcher, mut book) = setup();
        dispatcher
            .register_handler(&ADMIN, Box::new(HalfwayHandler))
            .unwrap();
        let mut ctx = TransferContext::new(&mut book, &dispatcher, ALICE, 8);
        let err = dispatcher
            .dispatch(&mut ctx, AssetTypeId::from_u32(0xdead_beef), &[], ALICE, BOB, 40)
            .unwrap_err();
        assert_eq!(err.code(), 402);
        assert_eq!(book.balance_of(TokenId::from_symbol("WETH"), ALICE), 100);
        assert_eq!(book.balance_of(TokenId::from_symbol("WETH"), BOB), 0);
    }

    #[test]
    fn registry_is_admin_gated() {
        let mut dispatcher = AssetTransferDispatcher::new(ADMIN);
        assert_eq!(
            dispatcher
                .register_handler(&ALICE, Box::new(FungibleTokenHandler))
                .unwrap_err(),
            OpensettleError::NotOwner { caller: ALICE }
        );
        dispatcher
            .register_handler(&ADMIN, Box::new(FungibleTokenHandler))
            .unwrap();
        assert_eq!(
            dispatcher
                .register_handler(&ADMIN, Box::new(FungibleTokenHandler))
                .unwrap_err(),
            OpensettleError::HandlerAlreadyRegistered(AssetTypeId::FUNGIBLE)
        );
        assert!(dispatcher
            .deregister_handler(&ALICE, AssetTypeId::FUNGIBLE)
            .is_err());
        dispatcher
            .deregister_handler(&ADMIN, AssetTypeId::FUNGIBLE)
            .unwrap();
        assert!(dispatcher.registered_types().is_empty());
    }

    #[test]
    fn leaf_handlers_have_no_guard() {
        let (mut dispatcher, _) = setup();
        assert_eq!(
            dispatcher
                .authorization_mut(AssetTypeId::FUNGIBLE)
                .unwrap_err(),
            OpensettleError::NoAuthorizationGuard(AssetTypeId::FUNGIBLE)
        );
    }
}
