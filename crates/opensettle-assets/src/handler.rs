//! The transfer capability every asset handler implements.

use opensettle_types::{Address, Amount, AssetTypeId, OpensettleError, Result};

use crate::{AssetTransferDispatcher, AuthorizationGuard, HoldingsBook};

/// Moves one kind of asset. Registered in an [`AssetTransferDispatcher`]
/// under [`AssetHandler::asset_type`].
pub trait AssetHandler: Send + Sync {
    fn asset_type(&self) -> AssetTypeId;

    /// Move `amount` of the asset described by `payload` from `from` to `to`.
    ///
    /// A handler that fails must leave `ctx.holdings()` as it found it.
    fn transfer(
        &self,
        ctx: &mut TransferContext<'_>,
        payload: &[u8],
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()>;

    /// The guard gating this handler, if it has one.
    fn authorization(&self) -> Option<&AuthorizationGuard> {
        None
    }

    fn authorization_mut(&mut self) -> Option<&mut AuthorizationGuard> {
        None
    }
}

/// Everything a handler may touch during one dispatch.
pub struct TransferContext<'a> {
    holdings: &'a mut HoldingsBook,
    dispatcher: &'a AssetTransferDispatcher,
    caller: Address,
    depth: usize,
    max_depth: usize,
}

impl<'a> TransferContext<'a> {
    /// `caller` is the identity invoking the dispatch; it is preserved
    /// through nested composite transfers.
    pub fn new(
        holdings: &'a mut HoldingsBook,
        dispatcher: &'a AssetTransferDispatcher,
        caller: Address,
        max_depth: usize,
    ) -> Self {
        Self {
            holdings,
            dispatcher,
            caller,
            depth: 0,
            max_depth,
        }
    }

    pub fn holdings(&mut self) -> &mut HoldingsBook {
        &mut *self.holdings
    }

    #[must_use]
    pub fn dispatcher(&self) -> &'a AssetTransferDispatcher {
        self.dispatcher
    }

    #[must_use]
    pub fn caller(&self) -> Address {
        self.caller
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Run `f` one composite level deeper, failing once the nesting limit is
    /// exceeded.
    pub fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= self.max_depth {
            return Err(OpensettleError::NestingTooDeep {
                max_depth: self.max_depth,
            });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }
}
