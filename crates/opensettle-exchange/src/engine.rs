//! Settlement engine: the single writer over ledger, holdings and registry.
//!
//! ## Fill Flow
//!
//! ```text
//! fill_order ─▶ OrderValidator ─▶ compute_fill ─▶ settle legs ─▶ ledger commit
//!                    │                 │              │
//!                    │ hard ─▶ Err     │ soft ─▶ ZERO │ fail ─▶ Err (rolled back)
//!                    └ soft ─▶ ZERO    └ hard ─▶ Err  │
//! ```
//!
//! Settlement of one fill dispatches up to four legs, in order:
//!
//! 1. maker asset, maker → taker
//! 2. taker asset, taker → maker
//! 3. maker fee, maker → fee recipient (skipped when zero)
//! 4. taker fee, taker → fee recipient (skipped when zero)
//!
//! ## Atomicity
//!
//! Every public operation runs inside one `atomically` unit: it
//! either commits all of its holdings, ledger and event changes, or none of
//! them. Validation reads the ledger inside the same unit, immediately before
//! mutating it, so there is no stale snapshot to race against.
//!
//! Hard failures come back as `Err` and are logged at `warn`. Soft outcomes
//! (expired, fully filled, cancelled, rounding error) return a zero result and
//! leave a [`SettlementEvent::SettlementError`] in the event log.

use std::sync::Arc;

use opensettle_assets::{
    AssetHandler, AssetTransferDispatcher, CompositeAssetHandler, FungibleTokenHandler,
    HoldingsBook, NonFungibleTokenHandler, TransferContext,
};
use opensettle_fillcore::{compute_fill, proportional_amount, safe_sub};
use opensettle_types::{
    Address, Amount, AssetTypeId, Clock, Ed25519Verifier, EngineConfig, FillResult, FillStatus,
    OperationId, OpensettleError, Order, OrderInfo, Result, SettlementEvent, SignatureVerifier,
    SignedOrder, SystemClock, TokenId,
};

use crate::event_log::EventLog;
use crate::ledger::SettlementLedger;
use crate::validator::OrderValidator;

pub struct SettlementEngine {
    config: EngineConfig,
    ledger: SettlementLedger,
    dispatcher: AssetTransferDispatcher,
    holdings: HoldingsBook,
    verifier: Arc<dyn SignatureVerifier>,
    clock: Arc<dyn Clock>,
    events: EventLog,
}

impl SettlementEngine {
    /// An engine with an empty handler registry owned by the admin identity.
    ///
    /// # Errors
    /// Returns [`OpensettleError::Configuration`] if `config` is invalid.
    pub fn new(
        config: EngineConfig,
        verifier: Arc<dyn SignatureVerifier>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        tracing::info!(
            engine = %config.engine_address,
            admin = %config.admin_address,
            max_composite_depth = config.max_composite_depth,
            "Settlement engine created"
        );
        Ok(Self {
            dispatcher: AssetTransferDispatcher::new(config.admin_address),
            config,
            ledger: SettlementLedger::new(),
            holdings: HoldingsBook::new(),
            verifier,
            clock,
            events: EventLog::new(),
        })
    }

    /// An engine with fungible, non-fungible and composite handlers
    /// registered, and the engine identity authorized on the composite guard.
    pub fn with_standard_handlers(
        config: EngineConfig,
        verifier: Arc<dyn SignatureVerifier>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let mut engine = Self::new(config, verifier, clock)?;
        let admin = engine.config.admin_address;
        let registry = &mut engine.dispatcher;
        registry.register_handler(&admin, Box::new(FungibleTokenHandler))?;
        registry.register_handler(&admin, Box::new(NonFungibleTokenHandler))?;
        registry.register_handler(&admin, Box::new(CompositeAssetHandler::new(admin)))?;
        registry
            .authorization_mut(AssetTypeId::COMPOSITE)?
            .add_authorized(&admin, engine.config.engine_address)?;
        Ok(engine)
    }

    /// Standard handlers, ed25519 signatures and the system clock.
    pub fn with_system_defaults(config: EngineConfig) -> Result<Self> {
        Self::with_standard_handlers(config, Arc::new(Ed25519Verifier), Arc::new(SystemClock))
    }

    // ── Accessors ────────────────────────────────────────────────────

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn ledger(&self) -> &SettlementLedger {
        &self.ledger
    }

    #[must_use]
    pub fn holdings(&self) -> &HoldingsBook {
        &self.holdings
    }

    #[must_use]
    pub fn dispatcher(&self) -> &AssetTransferDispatcher {
        &self.dispatcher
    }

    #[must_use]
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<SettlementEvent> {
        self.events.drain()
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Status, hash and cumulative fill of `signed` as seen by `caller` now.
    #[must_use]
    pub fn order_info(&self, caller: Address, signed: &SignedOrder) -> OrderInfo {
        OrderValidator::new(self.verifier.as_ref(), self.clock.now_unix())
            .order_info(signed, &self.ledger, &caller)
    }

    #[must_use]
    pub fn orders_info(&self, caller: Address, orders: &[SignedOrder]) -> Vec<OrderInfo> {
        let validator = OrderValidator::new(self.verifier.as_ref(), self.clock.now_unix());
        orders
            .iter()
            .map(|signed| validator.order_info(signed, &self.ledger, &caller))
            .collect()
    }

    /// Amounts a fill would settle, without touching any state.
    pub fn get_fill_amounts(
        &self,
        order: &Order,
        filled_amount: Amount,
        requested_taker_amount: Amount,
        caller: Address,
    ) -> Result<(FillStatus, FillResult)> {
        compute_fill(order, filled_amount, requested_taker_amount, &caller)
    }

    // ── Fills ────────────────────────────────────────────────────────

    /// Fill up to `taker_asset_fill_amount` of `signed` on behalf of `caller`,
    /// who acts as the taker.
    ///
    /// # Errors
    /// Validation, arithmetic and dispatch failures. State is unchanged on
    /// any error.
    pub fn fill_order(
        &mut self,
        caller: Address,
        signed: &SignedOrder,
        taker_asset_fill_amount: Amount,
    ) -> Result<FillResult> {
        let _span = operation_span("fill_order", caller).entered();
        self.try_fill(caller, signed, taker_asset_fill_amount)
            .inspect_err(log_rejection)
    }

    /// Like [`Self::fill_order`], but fails with
    /// [`OpensettleError::IncompleteFill`] unless exactly
    /// `taker_asset_fill_amount` is filled.
    pub fn fill_or_kill_order(
        &mut self,
        caller: Address,
        signed: &SignedOrder,
        taker_asset_fill_amount: Amount,
    ) -> Result<FillResult> {
        let _span = operation_span("fill_or_kill_order", caller).entered();
        self.try_fill_or_kill(caller, signed, taker_asset_fill_amount)
            .inspect_err(log_rejection)
    }

    /// Like [`Self::fill_order`], but any failure yields a zero result.
    pub fn fill_order_no_throw(
        &mut self,
        caller: Address,
        signed: &SignedOrder,
        taker_asset_fill_amount: Amount,
    ) -> FillResult {
        let _span = operation_span("fill_order_no_throw", caller).entered();
        self.fill_no_throw(caller, signed, taker_asset_fill_amount)
    }

    /// Fill each order with its amount. All-or-nothing across the batch.
    pub fn batch_fill_orders(
        &mut self,
        caller: Address,
        orders: &[SignedOrder],
        taker_asset_fill_amounts: &[Amount],
    ) -> Result<Vec<FillResult>> {
        let _span = operation_span("batch_fill_orders", caller).entered();
        check_batch_lengths(orders.len(), taker_asset_fill_amounts.len())
            .and_then(|()| {
                self.atomically(|this| {
                    orders
                        .iter()
                        .zip(taker_asset_fill_amounts)
                        .map(|(signed, amount)| this.try_fill(caller, signed, *amount))
                        .collect()
                })
            })
            .inspect_err(log_rejection)
    }

    /// Fill-or-kill each order. All-or-nothing across the batch.
    pub fn batch_fill_or_kill_orders(
        &mut self,
        caller: Address,
        orders: &[SignedOrder],
        taker_asset_fill_amounts: &[Amount],
    ) -> Result<Vec<FillResult>> {
        let _span = operation_span("batch_fill_or_kill_orders", caller).entered();
        check_batch_lengths(orders.len(), taker_asset_fill_amounts.len())
            .and_then(|()| {
                self.atomically(|this| {
                    orders
                        .iter()
                        .zip(taker_asset_fill_amounts)
                        .map(|(signed, amount)| this.try_fill_or_kill(caller, signed, *amount))
                        .collect()
                })
            })
            .inspect_err(log_rejection)
    }

    /// Fill each order independently; failed orders yield zero results.
    pub fn batch_fill_orders_no_throw(
        &mut self,
        caller: Address,
        orders: &[SignedOrder],
        taker_asset_fill_amounts: &[Amount],
    ) -> Result<Vec<FillResult>> {
        let _span = operation_span("batch_fill_orders_no_throw", caller).entered();
        check_batch_lengths(orders.len(), taker_asset_fill_amounts.len())
            .inspect_err(log_rejection)?;
        Ok(orders
            .iter()
            .zip(taker_asset_fill_amounts)
            .map(|(signed, amount)| self.fill_no_throw(caller, signed, *amount))
            .collect())
    }

    /// Sell up to `taker_asset_fill_amount` of the taker asset across
    /// `orders`, in sequence. Orders that cannot be filled are skipped.
    ///
    /// # Errors
    /// [`OpensettleError::InvalidRequest`] if the orders do not all share the
    /// first order's taker asset data; arithmetic failures while totalling.
    pub fn market_sell_orders(
        &mut self,
        caller: Address,
        orders: &[SignedOrder],
        taker_asset_fill_amount: Amount,
    ) -> Result<FillResult> {
        let _span = operation_span("market_sell_orders", caller).entered();
        self.atomically(|this| {
            require_shared_asset(orders, |order| order.taker_asset_data.as_slice(), "taker")?;
            let mut total = FillResult::ZERO;
            for signed in orders {
                let remaining = safe_sub(taker_asset_fill_amount, total.taker_asset_filled_amount)?;
                if remaining == 0 {
                    break;
                }
                let fill = this.fill_no_throw(caller, signed, remaining);
                total = total.checked_add(&fill)?;
            }
            Ok(total)
        })
        .inspect_err(log_rejection)
    }

    /// Buy up to `maker_asset_fill_amount` of the maker asset across
    /// `orders`, in sequence. Orders that cannot be filled are skipped.
    ///
    /// # Errors
    /// [`OpensettleError::InvalidRequest`] if the orders do not all share the
    /// first order's maker asset data; arithmetic failures while totalling.
    pub fn market_buy_orders(
        &mut self,
        caller: Address,
        orders: &[SignedOrder],
        maker_asset_fill_amount: Amount,
    ) -> Result<FillResult> {
        let _span = operation_span("market_buy_orders", caller).entered();
        self.atomically(|this| {
            require_shared_asset(orders, |order| order.maker_asset_data.as_slice(), "maker")?;
            let mut total = FillResult::ZERO;
            for signed in orders {
                let remaining_maker =
                    safe_sub(maker_asset_fill_amount, total.maker_asset_filled_amount)?;
                if remaining_maker == 0 {
                    break;
                }
                let order = &signed.order;
                if order.has_zero_amount() {
                    continue;
                }
                let taker_amount = proportional_amount(
                    remaining_maker,
                    order.maker_asset_amount,
                    order.taker_asset_amount,
                )?;
                if taker_amount == 0 {
                    continue;
                }
                let fill = this.fill_no_throw(caller, signed, taker_amount);
                total = total.checked_add(&fill)?;
            }
            Ok(total)
        })
        .inspect_err(log_rejection)
    }

    // ── Cancellation ─────────────────────────────────────────────────

    /// Cancel `order` on behalf of its maker. Returns `false` when the order
    /// was already dead (expired or cancelled).
    ///
    /// # Errors
    /// [`OpensettleError::OrderInvalid`] for zero-amount orders,
    /// [`OpensettleError::SenderInvalid`] when a sender restriction is not
    /// met, [`OpensettleError::NotMaker`] when `caller` is not the maker.
    pub fn cancel_order(&mut self, caller: Address, order: &Order) -> Result<bool> {
        let _span = operation_span("cancel_order", caller).entered();
        self.atomically(|this| this.try_cancel(caller, order))
            .inspect_err(log_rejection)
    }

    /// Cancel every order. All-or-nothing across the batch.
    pub fn batch_cancel_orders(&mut self, caller: Address, orders: &[Order]) -> Result<Vec<bool>> {
        let _span = operation_span("batch_cancel_orders", caller).entered();
        self.atomically(|this| {
            orders
                .iter()
                .map(|order| this.try_cancel(caller, order))
                .collect()
        })
        .inspect_err(log_rejection)
    }

    /// Void every order of `caller` with a salt not above `salt`. Returns the
    /// new epoch, `salt + 1`.
    ///
    /// # Errors
    /// [`OpensettleError::EpochNotIncreasing`] unless the new epoch is above
    /// the current one.
    pub fn cancel_orders_up_to(&mut self, caller: Address, salt: u64) -> Result<u64> {
        let _span = operation_span("cancel_orders_up_to", caller).entered();
        self.atomically(|this| {
            let new_epoch = salt
                .checked_add(1)
                .ok_or(OpensettleError::ArithmeticOverflow)?;
            this.ledger.advance_epoch(caller, new_epoch)?;
            this.events.push(SettlementEvent::EpochCancelled {
                maker: caller,
                new_epoch,
            });
            tracing::info!(maker = %caller, new_epoch, "Maker epoch advanced");
            Ok(new_epoch)
        })
        .inspect_err(log_rejection)
    }

    // ── Transfers ────────────────────────────────────────────────────

    /// Dispatch one typed transfer. `caller` must be `from` or the engine
    /// identity; guarded handlers check `caller` again.
    pub fn dispatch_transfer(
        &mut self,
        caller: Address,
        asset_type: AssetTypeId,
        payload: &[u8],
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        let _span = operation_span("dispatch_transfer", caller).entered();
        self.atomically(|this| {
            if caller != from && caller != this.config.engine_address {
                return Err(OpensettleError::Unauthorized { caller });
            }
            let mut ctx = TransferContext::new(
                &mut this.holdings,
                &this.dispatcher,
                caller,
                this.config.max_composite_depth,
            );
            this.dispatcher
                .dispatch(&mut ctx, asset_type, payload, from, to, amount)
        })
        .inspect_err(log_rejection)
    }

    // ── Administration ───────────────────────────────────────────────

    pub fn add_authorized_caller(&mut self, admin: Address, caller: Address) -> Result<()> {
        self.dispatcher
            .authorization_mut(AssetTypeId::COMPOSITE)?
            .add_authorized(&admin, caller)
            .inspect_err(log_rejection)
    }

    pub fn remove_authorized_caller(&mut self, admin: Address, caller: Address) -> Result<()> {
        self.dispatcher
            .authorization_mut(AssetTypeId::COMPOSITE)?
            .remove_authorized(&admin, &caller)
            .inspect_err(log_rejection)
    }

    pub fn authorized_callers(&self) -> Result<Vec<Address>> {
        Ok(self
            .dispatcher
            .authorization(AssetTypeId::COMPOSITE)?
            .authorized_callers())
    }

    pub fn register_asset_handler(
        &mut self,
        admin: Address,
        handler: Box<dyn AssetHandler>,
    ) -> Result<()> {
        self.dispatcher
            .register_handler(&admin, handler)
            .inspect_err(log_rejection)
    }

    pub fn deregister_asset_handler(
        &mut self,
        admin: Address,
        asset_type: AssetTypeId,
    ) -> Result<()> {
        self.dispatcher
            .deregister_handler(&admin, asset_type)
            .map(drop)
            .inspect_err(log_rejection)
    }

    /// Credit `amount` of a fungible token to `owner`.
    pub fn deposit_fungible(
        &mut self,
        admin: Address,
        token: TokenId,
        owner: Address,
        amount: Amount,
    ) -> Result<()> {
        self.ensure_admin(admin)?;
        self.holdings.mint_fungible(token, owner, amount)?;
        tracing::info!(token = %token, owner = %owner, amount, "Fungible deposit");
        Ok(())
    }

    pub fn mint_non_fungible(
        &mut self,
        admin: Address,
        token: TokenId,
        token_id: u128,
        owner: Address,
    ) -> Result<()> {
        self.ensure_admin(admin)?;
        self.holdings.mint_non_fungible(token, token_id, owner)?;
        tracing::info!(token = %token, token_id, owner = %owner, "Non-fungible minted");
        Ok(())
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Run `f` as one atomic unit: on `Err`, holdings, ledger and event log
    /// return to their state before the call.
    fn atomically<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let holdings_cp = self.holdings.begin();
        let ledger_cp = self.ledger.begin();
        let events_len = self.events.len();
        match f(self) {
            Ok(value) => {
                self.holdings.release(holdings_cp);
                self.ledger.release(ledger_cp);
                Ok(value)
            }
            Err(err) => {
                self.holdings.rollback(holdings_cp);
                self.ledger.rollback(ledger_cp);
                self.events.truncate(events_len);
                Err(err)
            }
        }
    }

    fn try_fill(
        &mut self,
        caller: Address,
        signed: &SignedOrder,
        amount: Amount,
    ) -> Result<FillResult> {
        self.atomically(|this| this.fill_unchecked(caller, signed, amount))
    }

    fn try_fill_or_kill(
        &mut self,
        caller: Address,
        signed: &SignedOrder,
        amount: Amount,
    ) -> Result<FillResult> {
        self.atomically(|this| {
            let fill = this.fill_unchecked(caller, signed, amount)?;
            if fill.taker_asset_filled_amount != amount {
                return Err(OpensettleError::IncompleteFill {
                    order_hash: signed.hash(),
                    requested: amount,
                    filled: fill.taker_asset_filled_amount,
                });
            }
            Ok(fill)
        })
    }

    fn fill_no_throw(
        &mut self,
        caller: Address,
        signed: &SignedOrder,
        amount: Amount,
    ) -> FillResult {
        self.try_fill(caller, signed, amount).unwrap_or_else(|err| {
            log_rejection(&err);
            FillResult::ZERO
        })
    }

    /// Validate, compute, settle and record one fill. Callers provide the
    /// rollback boundary.
    fn fill_unchecked(
        &mut self,
        caller: Address,
        signed: &SignedOrder,
        taker_asset_fill_amount: Amount,
    ) -> Result<FillResult> {
        let order = &signed.order;
        let info = self.order_info(caller, signed);
        let order_hash = info.order_hash;

        if let Some(err) = info.status.into_error(order_hash) {
            if err.is_soft() {
                return Ok(self.report_soft(&err));
            }
            return Err(err);
        }

        let (status, fill) = compute_fill(
            order,
            info.taker_asset_filled_amount,
            taker_asset_fill_amount,
            &caller,
        )?;
        if status == FillStatus::RoundingErrorTooLarge {
            return Ok(self.report_soft(&OpensettleError::RoundingErrorTooLarge(order_hash)));
        }

        self.settle(order, caller, &fill)?;
        let total = self
            .ledger
            .record_fill(order_hash, fill.taker_asset_filled_amount)?;
        self.events
            .push(SettlementEvent::fill_recorded(order, order_hash, caller, &fill));

        tracing::info!(
            order = %order_hash,
            maker = %order.maker_address,
            taker = %caller,
            maker_filled = fill.maker_asset_filled_amount,
            taker_filled = fill.taker_asset_filled_amount,
            total_filled = total,
            "Fill settled"
        );
        Ok(fill)
    }

    /// Dispatch the asset and fee legs of a fill.
    fn settle(&mut self, order: &Order, taker: Address, fill: &FillResult) -> Result<()> {
        let registry = &self.dispatcher;
        let mut ctx = TransferContext::new(
            &mut self.holdings,
            registry,
            self.config.engine_address,
            self.config.max_composite_depth,
        );
        let maker = order.maker_address;
        let fee_recipient = order.fee_recipient_address;

        registry.dispatch_asset_data(
            &mut ctx,
            &order.maker_asset_data,
            maker,
            taker,
            fill.maker_asset_filled_amount,
        )?;
        registry.dispatch_asset_data(
            &mut ctx,
            &order.taker_asset_data,
            taker,
            maker,
            fill.taker_asset_filled_amount,
        )?;
        if fill.maker_fee_paid > 0 {
            registry.dispatch_asset_data(
                &mut ctx,
                &self.config.fee_asset_data,
                maker,
                fee_recipient,
                fill.maker_fee_paid,
            )?;
        }
        if fill.taker_fee_paid > 0 {
            registry.dispatch_asset_data(
                &mut ctx,
                &self.config.fee_asset_data,
                taker,
                fee_recipient,
                fill.taker_fee_paid,
            )?;
        }
        Ok(())
    }

    fn try_cancel(&mut self, caller: Address, order: &Order) -> Result<bool> {
        let order_hash = order.hash();
        if order.has_zero_amount() {
            return Err(OpensettleError::OrderInvalid(order_hash));
        }
        if order.sender_address.is_some_and(|sender| sender != caller) {
            return Err(OpensettleError::SenderInvalid(order_hash));
        }
        if caller != order.maker_address {
            return Err(OpensettleError::NotMaker { caller, order_hash });
        }
        if order.is_expired_at(self.clock.now_unix()) {
            self.report_soft(&OpensettleError::OrderExpired(order_hash));
            return Ok(false);
        }
        if !self.ledger.mark_cancelled(order_hash) {
            self.report_soft(&OpensettleError::OrderCancelled(order_hash));
            return Ok(false);
        }

        self.events
            .push(SettlementEvent::order_cancelled(order, order_hash));
        tracing::info!(order = %order_hash, maker = %caller, "Order cancelled");
        Ok(true)
    }

    fn report_soft(&mut self, err: &OpensettleError) -> FillResult {
        tracing::info!(code = err.code(), error = %err, "Nothing to settle");
        self.events.push(SettlementEvent::settlement_error(err));
        FillResult::ZERO
    }

    fn ensure_admin(&self, caller: Address) -> Result<()> {
        if caller == self.config.admin_address {
            Ok(())
        } else {
            Err(OpensettleError::NotOwner { caller })
        }
    }
}

fn operation_span(operation: &'static str, caller: Address) -> tracing::Span {
    tracing::info_span!("settlement", operation, op_id = %OperationId::new(), caller = %caller)
}

fn log_rejection(err: &OpensettleError) {
    match err.order_hash() {
        Some(order) => {
            tracing::warn!(code = err.code(), order = %order, error = %err, "Operation rejected");
        }
        None => tracing::warn!(code = err.code(), error = %err, "Operation rejected"),
    }
}

fn check_batch_lengths(orders: usize, amounts: usize) -> Result<()> {
    if orders == amounts {
        Ok(())
    } else {
        Err(OpensettleError::InvalidRequest {
            reason: format!("{orders} orders but {amounts} fill amounts"),
        })
    }
}

fn require_shared_asset(
    orders: &[SignedOrder],
    asset_of: impl Fn(&Order) -> &[u8],
    side: &str,
) -> Result<()> {
    let Some(first) = orders.first() else {
        return Ok(());
    };
    let expected = asset_of(&first.order);
    if orders.iter().all(|signed| asset_of(&signed.order) == expected) {
        Ok(())
    } else {
        Err(OpensettleError::InvalidRequest {
            reason: format!("all orders must share the first order's {side} asset data"),
        })
    }
}
