//! Composite asset handler: one transfer that fans out into many.
//!
//! A composite payload bundles `(amounts[i], sub_requests[i])` pairs. A
//! composite transfer of `amount` dispatches every sub-request in order with
//! `amount * amounts[i]`, recursing through the dispatcher so sub-requests may
//! themselves be composite.
//!
//! ## Guarantees
//!
//! 1. Only callers in the handler's [`AuthorizationGuard`] may invoke it.
//!    Nested invocations see the same caller as the outermost one.
//! 2. The bundle is decoded and length-checked before anything moves.
//! 3. All or nothing: a failing sub-request undoes every earlier one.
//! 4. Recursion is bounded by the context's nesting limit.

use opensettle_types::{Address, Amount, AssetTypeId, OpensettleError, Result};

use crate::codec::CompositePayload;
use crate::handler::{AssetHandler, TransferContext};
use crate::AuthorizationGuard;

pub struct CompositeAssetHandler {
    guard: AuthorizationGuard,
}

impl CompositeAssetHandler {
    /// A handler whose guard is owned by `owner` and starts empty.
    #[must_use]
    pub fn new(owner: Address) -> Self {
        Self {
            guard: AuthorizationGuard::new(owner),
        }
    }

    fn transfer_all(
        ctx: &mut TransferContext<'_>,
        bundle: &CompositePayload,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        let dispatcher = ctx.dispatcher();
        ctx.nested(|ctx| {
            for (multiplier, sub) in bundle.amounts.iter().zip(&bundle.sub_requests) {
                let scaled = amount
                    .checked_mul(*multiplier)
                    .ok_or(OpensettleError::ArithmeticOverflow)?;
                dispatcher.dispatch(ctx, sub.asset_type, &sub.payload, from, to, scaled)?;
            }
            Ok(())
        })
    }
}

impl AssetHandler for CompositeAssetHandler {
    fn asset_type(&self) -> AssetTypeId {
        AssetTypeId::COMPOSITE
    }

    fn transfer(
        &self,
        ctx: &mut TransferContext<'_>,
        payload: &[u8],
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        self.guard.check(&ctx.caller())?;
        let bundle = CompositePayload::decode_payload(payload)?;

        let cp = ctx.holdings().begin();
        match Self::transfer_all(ctx, &bundle, from, to, amount) {
            Ok(()) => {
                ctx.holdings().release(cp);
                Ok(())
            }
            Err(err) => {
                ctx.holdings().rollback(cp);
                tracing::debug!(
                    error = %err,
                    depth = ctx.depth(),
                    "Composite transfer rolled back"
                );
                Err(err)
            }
        }
    }

    fn authorization(&self) -> Option<&AuthorizationGuard> {
        Some(&self.guard)
    }

    fn authorization_mut(&mut self) -> Option<&mut AuthorizationGuard> {
        Some(&mut self.guard)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::{AssetData, AssetTransferDispatcher, FungibleTokenHandler, HoldingsBook};
    use opensettle_types::TokenId;

    const ADMIN: Address = Address([1u8; 32]);
    const ENGINE: Address = Address([9u8; 32]);
    const MAKER: Address = Address([2u8; 32]);
    const TAKER: Address = Address([3u8; 32]);
    const MALLORY: Address = Address([4u8; 32]);

    const RECORDING: AssetTypeId = AssetTypeId([0xaa, 0xbb, 0xcc, 0xdd]);

    type Calls = Arc<Mutex<Vec<(Vec<u8>, Amount)>>>;

    struct RecordingHandler {
        calls: Calls,
    }

    impl AssetHandler for RecordingHandler {
        fn asset_type(&self) -> AssetTypeId {
            RECORDING
        }

        fn transfer(
            &self,
            _ctx: &mut TransferContext<'_>,
            payload: &[u8],
            _from: Address,
            _to: Address,
            amount: Amount,
        ) -> Result<()> {
            self.calls.lock().unwrap().push((payload.to_vec(), amount));
            Ok(())
        }
    }

    fn weth() -> TokenId {
        TokenId::from_symbol("WETH")
    }

    fn zrx() -> TokenId {
        TokenId::from_symbol("ZRX")
    }

    fn dispatcher() -> (AssetTransferDispatcher, Calls) {
        let calls = Calls::default();
        let mut dispatcher = AssetTransferDispatcher::new(ADMIN);
        dispatcher
            .register_handler(&ADMIN, Box::new(FungibleTokenHandler))
            .unwrap();
        dispatcher
            .register_handler(&ADMIN, Box::new(RecordingHandler { calls: calls.clone() }))
            .unwrap();
        dispatcher
            .register_handler(&ADMIN, Box::new(CompositeAssetHandler::new(ADMIN)))
            .unwrap();
        dispatcher
            .authorization_mut(AssetTypeId::COMPOSITE)
            .unwrap()
            .add_authorized(&ADMIN, ENGINE)
            .unwrap();
        (dispatcher, calls)
    }

    fn recorded(tag: u8) -> AssetData {
        AssetData::new(RECORDING, vec![tag])
    }

    #[test]
    fn scales_each_leg_in_order() {
        let (dispatcher, calls) = dispatcher();
        let bundle = CompositePayload::new(vec![2, 3], vec![recorded(1), recorded(2)]).unwrap();
        let mut book = HoldingsBook::new();
        let mut ctx = TransferContext::new(&mut book, &dispatcher, ENGINE, 8);

        dispatcher
            .dispatch_asset_data(&mut ctx, &bundle.to_asset_data().encode(), MAKER, TAKER, 10)
            .unwrap();
        assert_eq!(*calls.lock().unwrap(), vec![(vec![1], 20), (vec![2], 30)]);
    }

    #[test]
    fn length_mismatch_dispatches_nothing() {
        let (dispatcher, calls) = dispatcher();
        let bundle = CompositePayload {
            amounts: vec![2, 3],
            sub_requests: vec![recorded(1)],
        };
        let mut book = HoldingsBook::new();
        let mut ctx = TransferContext::new(&mut book, &dispatcher, ENGINE, 8);

        let err = dispatcher
            .dispatch(
                &mut ctx,
                AssetTypeId::COMPOSITE,
                &bundle.encode_payload(),
                MAKER,
                TAKER,
                1,
            )
            .unwrap_err();
        assert_eq!(
            err,
            OpensettleError::LengthMismatch {
                amounts: 2,
                sub_requests: 1
            }
        );
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn unauthorized_caller_dispatches_nothing() {
        let (dispatcher, calls) = dispatcher();
        let bundle = CompositePayload::new(vec![1], vec![recorded(1)]).unwrap();
        let mut book = HoldingsBook::new();
        let mut ctx = TransferContext::new(&mut book, &dispatcher, MALLORY, 8);

        let err = dispatcher
            .dispatch_asset_data(&mut ctx, &bundle.to_asset_data().encode(), MAKER, TAKER, 1)
            .unwrap_err();
        assert_eq!(err, OpensettleError::Unauthorized { caller: MALLORY });
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn failing_leg_rolls_back_earlier_legs() {
        let (dispatcher, _) = dispatcher();
        let mut book = HoldingsBook::new();
        book.mint_fungible(weth(), MAKER, 100).unwrap();
        book.mint_fungible(zrx(), MAKER, 5).unwrap();

        let bundle = CompositePayload::new(
            vec![1, 1],
            vec![AssetData::fungible(weth()), AssetData::fungible(zrx())],
        )
        .unwrap();
        let mut ctx = TransferContext::new(&mut book, &dispatcher, ENGINE, 8);
        let err = dispatcher
            .dispatch_asset_data(&mut ctx, &bundle.to_asset_data().encode(), MAKER, TAKER, 10)
            .unwrap_err();

        assert!(matches!(
            err,
            OpensettleError::TransferFailed { asset_type, .. }
                if asset_type == AssetTypeId::FUNGIBLE
        ));
        assert_eq!(book.balance_of(weth(), MAKER), 100);
        assert_eq!(book.balance_of(weth(), TAKER), 0);
        assert_eq!(book.balance_of(zrx(), MAKER), 5);
        assert_eq!(book.journal_len(), 0);
    }

    #[test]
    fn nested_composites_keep_caller_and_respect_depth() {
        let (dispatcher, _) = dispatcher();
        let inner = CompositePayload::new(vec![2], vec![AssetData::fungible(weth())]).unwrap();
        let outer = CompositePayload::new(vec![3], vec![inner.to_asset_data()]).unwrap();
        let encoded = outer.to_asset_data().encode();

        let mut book = HoldingsBook::new();
        book.mint_fungible(weth(), MAKER, 100).unwrap();

        {
            let mut ctx = TransferContext::new(&mut book, &dispatcher, ENGINE, 1);
            let err = dispatcher
                .dispatch_asset_data(&mut ctx, &encoded, MAKER, TAKER, 5)
                .unwrap_err();
            assert_eq!(err, OpensettleError::NestingTooDeep { max_depth: 1 });
        }
        assert_eq!(book.balance_of(weth(), MAKER), 100);

        let mut ctx = TransferContext::new(&mut book, &dispatcher, ENGINE, 2);
        dispatcher
            .dispatch_asset_data(&mut ctx, &encoded, MAKER, TAKER, 5)
            .unwrap();
        assert_eq!(book.balance_of(weth(), TAKER), 30);
        assert_eq!(book.balance_of(weth(), MAKER), 70);
    }

    #[test]
    fn scaling_overflow_aborts() {
        let (dispatcher, calls) = dispatcher();
        let bundle = CompositePayload::new(vec![2], vec![recorded(1)]).unwrap();
        let mut book = HoldingsBook::new();
        let mut ctx = TransferContext::new(&mut book, &dispatcher, ENGINE, 8);

        let err = dispatcher
            .dispatch_asset_data(
                &mut ctx,
                &bundle.to_asset_data().encode(),
                MAKER,
                TAKER,
                u128::MAX,
            )
            .unwrap_err();
        assert_eq!(err, OpensettleError::ArithmeticOverflow);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn empty_bundle_is_a_no_op() {
        let (dispatcher, calls) = dispatcher();
        let bundle = CompositePayload::new(vec![], vec![]).unwrap();
        let mut book = HoldingsBook::new();
        let mut ctx = TransferContext::new(&mut book, &dispatcher, ENGINE, 8);
        dispatcher
            .dispatch_asset_data(&mut ctx, &bundle.to_asset_data().encode(), MAKER, TAKER, 7)
            .unwrap();
        assert!(calls.lock().unwrap().is_empty());
    }
}
