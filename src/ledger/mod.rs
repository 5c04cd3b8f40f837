//! Asset custody and liquidity-token ledgers.
//!
//! The pool engine never holds asset balances itself. It reads and moves
//! them through [`AssetCustody`], and accounts its liquidity-claim token
//! through [`LiquidityLedger`]. Both are seams for the surrounding
//! execution environment; the in-memory implementations here back tests
//! and single-process deployments.

use std::collections::HashMap;

use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::types::CustodyError;

/// External custody of the underlying assets.
///
/// `checkpoint`/`commit`/`revert` expose the all-or-nothing semantics of
/// the execution environment: a pool entry point checkpoints at entry and
/// reverts every transfer it issued when the operation fails, including
/// transfers made by a flash-swap callback.
#[cfg_attr(test, mockall::automock)]
pub trait AssetCustody {
    /// Current balance of `token` held by `owner`.
    fn balance_of(&self, token: Address, owner: Address) -> U256;

    /// Move `value` of `token` from `from` to `to`.
    fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        value: U256,
    ) -> std::result::Result<(), CustodyError>;

    /// Open a checkpoint and return its handle.
    fn checkpoint(&mut self) -> usize;

    /// Discard the checkpoint, keeping all changes made since.
    fn commit(&mut self, checkpoint: usize);

    /// Restore balances to the state captured at the checkpoint.
    fn revert(&mut self, checkpoint: usize);
}

/// In-memory custody ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryCustody {
    balances: HashMap<Address, HashMap<Address, U256>>,
    #[serde(skip)]
    journal: Vec<HashMap<Address, HashMap<Address, U256>>>,
}

impl MemoryCustody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `owner` with `value` of `token` out of thin air. This models
    /// an inbound transfer from outside the engine's custody.
    pub fn deposit(&mut self, token: Address, owner: Address, value: U256) {
        let entry = self
            .balances
            .entry(token)
            .or_default()
            .entry(owner)
            .or_insert_with(U256::zero);
        *entry += value;
    }
}

impl AssetCustody for MemoryCustody {
    fn balance_of(&self, token: Address, owner: Address) -> U256 {
        self.balances
            .get(&token)
            .and_then(|owners| owners.get(&owner))
            .copied()
            .unwrap_or_default()
    }

    fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        value: U256,
    ) -> std::result::Result<(), CustodyError> {
        let have = self.balance_of(token, from);
        if have < value {
            return Err(CustodyError::InsufficientBalance { need: value, have });
        }
        let owners = self.balances.entry(token).or_default();
        *owners.entry(from).or_insert_with(U256::zero) -= value;
        *owners.entry(to).or_insert_with(U256::zero) += value;
        Ok(())
    }

    fn checkpoint(&mut self) -> usize {
        self.journal.push(self.balances.clone());
        self.journal.len() - 1
    }

    fn commit(&mut self, checkpoint: usize) {
        self.journal.truncate(checkpoint);
    }

    fn revert(&mut self, checkpoint: usize) {
        self.balances = self.journal[checkpoint].clone();
        self.journal.truncate(checkpoint);
    }
}

/// Accounting interface for the pool's liquidity-claim token. Allowances
/// and signature-based approvals live with the surrounding token ledger,
/// not here.
pub trait LiquidityLedger {
    fn total_supply(&self) -> U256;

    fn balance_of(&self, owner: Address) -> U256;

    fn mint(&mut self, to: Address, value: U256);

    fn burn(&mut self, from: Address, value: U256) -> std::result::Result<(), CustodyError>;

    fn transfer(
        &mut self,
        from: Address,
        to: Address,
        value: U256,
    ) -> std::result::Result<(), CustodyError>;
}

/// Balance book for the liquidity-claim token, embedded in pair state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LpLedger {
    total_supply: U256,
    balances: HashMap<Address, U256>,
}

impl LiquidityLedger for LpLedger {
    fn total_supply(&self) -> U256 {
        self.total_supply
    }

    fn balance_of(&self, owner: Address) -> U256 {
        self.balances.get(&owner).copied().unwrap_or_default()
    }

    fn mint(&mut self, to: Address, value: U256) {
        self.total_supply += value;
        *self.balances.entry(to).or_insert_with(U256::zero) += value;
    }

    fn burn(&mut self, from: Address, value: U256) -> std::result::Result<(), CustodyError> {
        let have = self.balance_of(from);
        if have < value {
            return Err(CustodyError::InsufficientBalance { need: value, have });
        }
        *self.balances.entry(from).or_insert_with(U256::zero) -= value;
        self.total_supply -= value;
        Ok(())
    }

    fn transfer(
        &mut self,
        from: Address,
        to: Address,
        value: U256,
    ) -> std::result::Result<(), CustodyError> {
        let have = self.balance_of(from);
        if have < value {
            return Err(CustodyError::InsufficientBalance { need: value, have });
        }
        *self.balances.entry(from).or_insert_with(U256::zero) -= value;
        *self.balances.entry(to).or_insert_with(U256::zero) += value;
        Ok(())
    }
}
