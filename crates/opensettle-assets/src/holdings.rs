//! Holdings store: the state asset handlers move.
//!
//! Tracks fungible balances per `(token, owner)`, non-fungible ownership per
//! `(token, token_id)`, and minted supply per fungible token.
//!
//! Every mutation appends an undo record to a journal so a sequence of
//! transfers can be rolled back as a unit:
//!
//! ```text
//! let cp = book.begin();
//! ... transfers ...
//! on error → book.rollback(cp)   // state is byte-for-byte as before begin()
//! on success → book.release(cp)  // keep changes
//! ```
//!
//! Supply conservation holds at every release point:
//! ```text
//! ∀ token: Σ balances(token) == minted(token)
//! ```

use std::collections::HashMap;

use opensettle_types::{Address, Amount, OpensettleError, Result, TokenId};

/// Position in the undo journal returned by [`HoldingsBook::begin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a checkpoint must be released or rolled back"]
pub struct Checkpoint(usize);

#[derive(Debug, Clone)]
enum UndoRecord {
    Balance {
        key: (TokenId, Address),
        previous: Amount,
    },
    Owner {
        key: (TokenId, u128),
        previous: Option<Address>,
    },
    Minted {
        token: TokenId,
        previous: Amount,
    },
}

/// Balances and ownership with checkpoint/rollback support.
#[derive(Debug, Default)]
pub struct HoldingsBook {
    balances: HashMap<(TokenId, Address), Amount>,
    owners: HashMap<(TokenId, u128), Address>,
    minted: HashMap<TokenId, Amount>,
    journal: Vec<UndoRecord>,
    open_checkpoints: usize,
}

impl HoldingsBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ──────────────────────────────────────────────────────

    #[must_use]
    pub fn balance_of(&self, token: TokenId, owner: Address) -> Amount {
        self.balances.get(&(token, owner)).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn owner_of(&self, token: TokenId, token_id: u128) -> Option<Address> {
        self.owners.get(&(token, token_id)).copied()
    }

    #[must_use]
    pub fn minted_supply(&self, token: TokenId) -> Amount {
        self.minted.get(&token).copied().unwrap_or(0)
    }

    /// Number of undo records currently held.
    #[must_use]
    pub fn journal_len(&self) -> usize {
        self.journal.len()
    }

    // ── Checkpoints ──────────────────────────────────────────────────

    /// Open a rollback boundary. Checkpoints nest.
    pub fn begin(&mut self) -> Checkpoint {
        self.open_checkpoints += 1;
        Checkpoint(self.journal.len())
    }

    /// Undo every mutation made since `cp` was taken.
    pub fn rollback(&mut self, cp: Checkpoint) {
        while self.journal.len() > cp.0 {
            let Some(record) = self.journal.pop() else {
                break;
            };
            match record {
                UndoRecord::Balance { key, previous } => {
                    put_amount(&mut self.balances, key, previous)
                }
                UndoRecord::Owner { key, previous } => match previous {
                    Some(owner) => {
                        self.owners.insert(key, owner);
                    }
                    None => {
                        self.owners.remove(&key);
                    }
                },
                UndoRecord::Minted { token, previous } => {
                    put_amount(&mut self.minted, token, previous)
                }
            }
        }
        self.close_checkpoint();
    }

    /// Keep every mutation made since `cp` was taken. Releasing the outermost
    /// checkpoint drops the journal.
    pub fn release(&mut self, cp: Checkpoint) {
        debug_assert!(cp.0 <= self.journal.len());
        self.close_checkpoint();
    }

    fn close_checkpoint(&mut self) {
        self.open_checkpoints = self.open_checkpoints.saturating_sub(1);
        if self.open_checkpoints == 0 {
            self.journal.clear();
        }
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Create `amount` new units of `token` owned by `owner`.
    pub fn mint_fungible(&mut self, token: TokenId, owner: Address, amount: Amount) -> Result<()> {
        let supply = self.minted_supply(token);
        let new_supply = supply
            .checked_add(amount)
            .ok_or(OpensettleError::ArithmeticOverflow)?;
        let balance = self.balance_of(token, owner);
        let new_balance = balance
            .checked_add(amount)
            .ok_or(OpensettleError::ArithmeticOverflow)?;

        self.record(UndoRecord::Minted {
            token,
            previous: supply,
        });
        self.minted.insert(token, new_supply);
        self.set_balance(token, owner, new_balance);
        Ok(())
    }

    /// Create a unique token id owned by `owner`.
    pub fn mint_non_fungible(
        &mut self,
        token: TokenId,
        token_id: u128,
        owner: Address,
    ) -> Result<()> {
        if self.owner_of(token, token_id).is_some() {
            return Err(OpensettleError::TokenAlreadyMinted { token, token_id });
        }
        self.set_owner(token, token_id, owner);
        Ok(())
    }

    /// Move `amount` of `token` from `from` to `to`. All-or-nothing.
    pub fn transfer_fungible(
        &mut self,
        token: TokenId,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let available = self.balance_of(token, from);
        let debited = available
            .checked_sub(amount)
            .ok_or(OpensettleError::InsufficientBalance {
                token,
                needed: amount,
                available,
            })?;
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance_of(token, to)
            .checked_add(amount)
            .ok_or(OpensettleError::ArithmeticOverflow)?;

        self.set_balance(token, from, debited);
        self.set_balance(token, to, credited);
        Ok(())
    }

    /// Hand a token id from its current owner `from` to `to`.
    pub fn transfer_non_fungible(
        &mut self,
        token: TokenId,
        token_id: u128,
        from: Address,
        to: Address,
    ) -> Result<()> {
        if self.owner_of(token, token_id) != Some(from) {
            return Err(OpensettleError::NotTokenOwner {
                owner: from,
                token,
                token_id,
            });
        }
        self.set_owner(token, token_id, to);
        Ok(())
    }

    /// Verify `Σ balances(token) == minted(token)`.
    pub fn verify_supply(&self, token: TokenId) -> Result<()> {
        let actual = self
            .balances
            .iter()
            .filter(|((t, _), _)| *t == token)
            .try_fold(0u128, |acc, (_, amount)| acc.checked_add(*amount))
            .ok_or(OpensettleError::ArithmeticOverflow)?;
        let expected = self.minted_supply(token);
        if actual != expected {
            return Err(OpensettleError::SupplyInvariantViolation {
                reason: format!("Token {token}: actual supply {actual} != minted {expected}"),
            });
        }
        Ok(())
    }

    fn set_balance(&mut self, token: TokenId, owner: Address, amount: Amount) {
        let previous = self.balance_of(token, owner);
        self.record(UndoRecord::Balance {
            key: (token, owner),
            previous,
        });
        put_amount(&mut self.balances, (token, owner), amount);
    }

    fn set_owner(&mut self, token: TokenId, token_id: u128, owner: Address) {
        let previous = self.owners.insert((token, token_id), owner);
        self.record(UndoRecord::Owner {
            key: (token, token_id),
            previous,
        });
    }

    fn record(&mut self, record: UndoRecord) {
        // Outside any checkpoint there is nothing to roll back to.
        if self.open_checkpoints > 0 {
            self.journal.push(record);
        }
    }
}

/// Write `value` under `key`, removing zero entries so a rolled-back map is
/// identical to the original.
fn put_amount<K: std::hash::Hash + Eq>(map: &mut HashMap<K, Amount>, key: K, value: Amount) {
    if value == 0 {
        map.remove(&key);
    } else {
        map.insert(key, value);
    }
}
