//! Settlement ledger: cumulative fills, cancellations, maker epochs.
//!
//! The single authoritative store of the engine. Entries are created lazily
//! (a missing key reads as zero / not cancelled) and never deleted: they are
//! replay-protection tombstones.
//!
//! ## Invariants
//!
//! - `filled[hash]` only grows, and never exceeds the order's taker amount
//!   (enforced by the engine, which clamps every fill to the remainder).
//! - `cancelled[hash]`, once set, stays set.
//! - `maker_epoch[maker]` strictly increases on every bump.
//!
//! Mutations made while a checkpoint is open are journaled so that a failing
//! multi-step operation can be undone as a whole.

use std::collections::{HashMap, HashSet};

use opensettle_types::{Address, Amount, OpensettleError, OrderHash, Result};

/// Rollback boundary in the ledger journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct LedgerCheckpoint(usize);

#[derive(Debug, Clone)]
enum LedgerUndo {
    Filled { hash: OrderHash, previous: Amount },
    Cancelled { hash: OrderHash },
    Epoch { maker: Address, previous: u64 },
}

#[derive(Debug, Default)]
pub struct SettlementLedger {
    filled: HashMap<OrderHash, Amount>,
    cancelled: HashSet<OrderHash>,
    maker_epochs: HashMap<Address, u64>,
    journal: Vec<LedgerUndo>,
    open_checkpoints: usize,
}

impl SettlementLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cumulative taker-asset amount settled against `hash`.
    #[must_use]
    pub fn filled_amount(&self, hash: &OrderHash) -> Amount {
        self.filled.get(hash).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn is_cancelled(&self, hash: &OrderHash) -> bool {
        self.cancelled.contains(hash)
    }

    /// Orders of `maker` with `salt < maker_epoch(maker)` are void.
    #[must_use]
    pub fn maker_epoch(&self, maker: &Address) -> u64 {
        self.maker_epochs.get(maker).copied().unwrap_or(0)
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Add `amount` to the cumulative fill of `hash`. Returns the new total.
    ///
    /// # Errors
    /// Returns [`OpensettleError::ArithmeticOverflow`] if the total would wrap.
    pub fn record_fill(&mut self, hash: OrderHash, amount: Amount) -> Result<Amount> {
        let previous = self.filled_amount(&hash);
        let total = previous
            .checked_add(amount)
            .ok_or(OpensettleError::ArithmeticOverflow)?;
        self.record(LedgerUndo::Filled { hash, previous });
        self.filled.insert(hash, total);
        Ok(total)
    }

    /// Mark `hash` cancelled. Returns `false` if it already was.
    pub fn mark_cancelled(&mut self, hash: OrderHash) -> bool {
        if !self.cancelled.insert(hash) {
            return false;
        }
        self.record(LedgerUndo::Cancelled { hash });
        true
    }

    /// Raise the epoch of `maker` to `new_epoch`.
    ///
    /// # Errors
    /// Returns [`OpensettleError::EpochNotIncreasing`] unless `new_epoch` is
    /// strictly greater than the current epoch.
    pub fn advance_epoch(&mut self, maker: Address, new_epoch: u64) -> Result<()> {
        let current = self.maker_epoch(&maker);
        if new_epoch <= current {
            return Err(OpensettleError::EpochNotIncreasing {
                maker,
                current,
                requested: new_epoch,
            });
        }
        self.record(LedgerUndo::Epoch {
            maker,
            previous: current,
        });
        self.maker_epochs.insert(maker, new_epoch);
        Ok(())
    }

    // ── Checkpoints ──────────────────────────────────────────────────

    pub fn begin(&mut self) -> LedgerCheckpoint {
        self.open_checkpoints += 1;
        LedgerCheckpoint(self.journal.len())
    }

    /// Undo every mutation made since `cp`.
    pub fn rollback(&mut self, cp: LedgerCheckpoint) {
        while self.journal.len() > cp.0 {
            let Some(undo) = self.journal.pop() else {
                break;
            };
            match undo {
                LedgerUndo::Filled { hash, previous } => {
                    if previous == 0 {
                        self.filled.remove(&hash);
                    } else {
                        self.filled.insert(hash, previous);
                    }
                }
                LedgerUndo::Cancelled { hash } => {
                    self.cancelled.remove(&hash);
                }
                LedgerUndo::Epoch { maker, previous } => {
                    if previous == 0 {
                        self.maker_epochs.remove(&maker);
                    } else {
                        self.maker_epochs.insert(maker, previous);
                    }
                }
            }
        }
        self.close_checkpoint();
    }

    pub fn release(&mut self, cp: LedgerCheckpoint) {
        debug_assert!(cp.0 <= self.journal.len());
        self.close_checkpoint();
    }

    fn close_checkpoint(&mut self) {
        self.open_checkpoints = self.open_checkpoints.saturating_sub(1);
        if self.open_checkpoints == 0 {
            self.journal.clear();
        }
    }

    fn record(&mut self, undo: LedgerUndo) {
        if self.open_checkpoints > 0 {
            self.journal.push(undo);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAKER: Address = Address([1u8; 32]);

    fn hash(b: u8) -> OrderHash {
        OrderHash([b; 32])
    }

    #[test]
    fn lazy_defaults() {
        let ledger = SettlementLedger::new();
        assert_eq!(ledger.filled_amount(&hash(1)), 0);
        assert!(!ledger.is_cancelled(&hash(1)));
        assert_eq!(ledger.maker_epoch(&MAKER), 0);
    }

    #[test]
    fn fills_accumulate() {
        let mut ledger = SettlementLedger::new();
        assert_eq!(ledger.record_fill(hash(1), 30).unwrap(), 30);
        assert_eq!(ledger.record_fill(hash(1), 12).unwrap(), 42);
        assert_eq!(ledger.filled_amount(&hash(1)), 42);
    }

    #[test]
    fn fill_overflow_rejected() {
        let mut ledger = SettlementLedger::new();
        ledger.record_fill(hash(1), u128::MAX).unwrap();
        assert_eq!(
            ledger.record_fill(hash(1), 1).unwrap_err(),
            OpensettleError::ArithmeticOverflow
        );
        assert_eq!(ledger.filled_amount(&hash(1)), u128::MAX);
    }

    #[test]
    fn cancel_is_sticky() {
        let mut ledger = SettlementLedger::new();
        assert!(ledger.mark_cancelled(hash(1)));
        assert!(!ledger.mark_cancelled(hash(1)));
        assert!(ledger.is_cancelled(&hash(1)));
    }

    #[test]
    fn epoch_strictly_increases() {
        let mut ledger = SettlementLedger::new();
        ledger.advance_epoch(MAKER, 5).unwrap();
        assert!(matches!(
            ledger.advance_epoch(MAKER, 5).unwrap_err(),
            OpensettleError::EpochNotIncreasing {
                current: 5,
                requested: 5,
                ..
            }
        ));
        assert!(ledger.advance_epoch(MAKER, 4).is_err());
        ledger.advance_epoch(MAKER, 6).unwrap();
        assert_eq!(ledger.maker_epoch(&MAKER), 6);
    }

    #[test]
    fn rollback_restores_everything() {
        let mut ledger = SettlementLedger::new();
        ledger.record_fill(hash(1), 10).unwrap();
        ledger.advance_epoch(MAKER, 3).unwrap();

        let cp = ledger.begin();
        ledger.record_fill(hash(1), 5).unwrap();
        ledger.record_fill(hash(2), 7).unwrap();
        ledger.mark_cancelled(hash(3));
        ledger.advance_epoch(MAKER, 9).unwrap();
        ledger.rollback(cp);

        assert_eq!(ledger.filled_amount(&hash(1)), 10);
        assert_eq!(ledger.filled_amount(&hash(2)), 0);
        assert!(!ledger.is_cancelled(&hash(3)));
        assert_eq!(ledger.maker_epoch(&MAKER), 3);
    }

    #[test]
    fn nested_release_then_outer_rollback() {
        let mut ledger = SettlementLedger::new();
        let outer = ledger.begin();
        let inner = ledger.begin();
        ledger.record_fill(hash(1), 5).unwrap();
        ledger.release(inner);
        ledger.rollback(outer);
        assert_eq!(ledger.filled_amount(&hash(1)), 0);
    }

    #[test]
    fn released_changes_persist() {
        let mut ledger = SettlementLedger::new();
        let cp = ledger.begin();
        ledger.mark_cancelled(hash(1));
        ledger.release(cp);
        assert!(ledger.is_cancelled(&hash(1)));
    }
}
