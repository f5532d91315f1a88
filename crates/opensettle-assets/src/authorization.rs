//! Authorization guard: who may invoke a privileged handler.
//!
//! The composite handler moves assets on behalf of the settlement engine,
//! so it must not be reachable by arbitrary callers. The guard holds the set
//! of authorized caller identities; only its owner may change that set.

use std::collections::BTreeSet;

use opensettle_types::{Address, OpensettleError, Result};

#[derive(Debug, Clone)]
pub struct AuthorizationGuard {
    owner: Address,
    authorized: BTreeSet<Address>,
}

impl AuthorizationGuard {
    /// Create a guard owned by `owner` with an empty authorized set.
    #[must_use]
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            authorized: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn owner(&self) -> Address {
        self.owner
    }

    #[must_use]
    pub fn is_authorized(&self, caller: &Address) -> bool {
        self.authorized.contains(caller)
    }

    /// Authorized callers in ascending order.
    #[must_use]
    pub fn authorized_callers(&self) -> Vec<Address> {
        self.authorized.iter().copied().collect()
    }

    pub fn add_authorized(&mut self, admin: &Address, caller: Address) -> Result<()> {
        self.ensure_owner(admin)?;
        if !self.authorized.insert(caller) {
            return Err(OpensettleError::AlreadyAuthorized(caller));
        }
        tracing::info!(caller = %caller, "Authorized caller added");
        Ok(())
    }

    pub fn remove_authorized(&mut self, admin: &Address, caller: &Address) -> Result<()> {
        self.ensure_owner(admin)?;
        if !self.authorized.remove(caller) {
            return Err(OpensettleError::NotInAuthorizedSet(*caller));
        }
        tracing::info!(caller = %caller, "Authorized caller removed");
        Ok(())
    }

    pub fn transfer_ownership(&mut self, admin: &Address, new_owner: Address) -> Result<()> {
        self.ensure_owner(admin)?;
        tracing::info!(from = %self.owner, to = %new_owner, "Guard ownership transferred");
        self.owner = new_owner;
        Ok(())
    }

    /// Fail with [`OpensettleError::Unauthorized`] unless `caller` is authorized.
    pub fn check(&self, caller: &Address) -> Result<()> {
        if self.is_authorized(caller) {
            Ok(())
        } else {
            Err(OpensettleError::Unauthorized { caller: *caller })
        }
    }

    fn ensure_owner(&self, caller: &Address) -> Result<()> {
        if *caller == self.owner {
            Ok(())
        } else {
            Err(OpensettleError::NotOwner { caller: *caller })
        }
    }
}
