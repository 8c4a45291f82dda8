//! Account balances and histories
//!
//! # Invariants
//!
//! - Balances never go negative
//! - A rejected transaction leaves every balance and history untouched
//! - Value is only moved, never created or destroyed, after account creation

use crate::{
    types::{Account, AccountId, Transaction},
    Error, Result,
};
use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Balance granted to every new account
pub const INITIAL_BALANCE: u64 = 100;

/// Mapping from account name to account state
#[derive(Debug, Clone)]
pub struct Accounts {
    accounts: HashMap<AccountId, Account>,
    initial_balance: u64,
}

impl Default for Accounts {
    fn default() -> Self {
        Self::new(INITIAL_BALANCE)
    }
}

impl Accounts {
    /// Empty account set granting `initial_balance` on creation
    pub fn new(initial_balance: u64) -> Self {
        Self {
            accounts: HashMap::new(),
            initial_balance,
        }
    }

    /// Create an account with the initial grant and an empty history
    pub fn create_account(&mut self, name: AccountId) -> Result<Account> {
        if self.accounts.contains_key(&name) {
            return Err(Error::AccountAlreadyExists(name.to_string()));
        }

        // Supply is conserved, so this bounds every balance and their sum.
        let accounts = self.accounts.len() + 1;
        if (accounts as u64).checked_mul(self.initial_balance).is_none() {
            return Err(Error::SupplyOverflow {
                accounts,
                initial_balance: self.initial_balance,
            });
        }

        let account = Account::new(name.clone(), self.initial_balance);
        self.accounts.insert(name, account.clone());
        Ok(account)
    }

    /// Current balance
    pub fn get_balance(&self, name: &AccountId) -> Result<u64> {
        self.accounts
            .get(name)
            .map(|account| account.balance)
            .ok_or_else(|| Error::AccountNotFound(name.to_string()))
    }

    /// Snapshot of an account
    pub fn get_account(&self, name: &AccountId) -> Result<Account> {
        self.accounts
            .get(name)
            .cloned()
            .ok_or_else(|| Error::AccountNotFound(name.to_string()))
    }

    /// Check a transaction against current balances without applying it
    pub fn check_transaction(&self, tx: &Transaction) -> Result<()> {
        self.check_batch(std::slice::from_ref(tx))
    }

    /// Validate and apply a single transaction
    pub fn apply_transaction(&mut self, tx: Arc<Transaction>) -> Result<()> {
        self.apply_batch(std::slice::from_ref(&tx))
    }

    /// Validate a sequence of transactions as if applied in order
    pub fn check_batch<T: Borrow<Transaction>>(&self, txs: &[T]) -> Result<()> {
        self.simulate(txs).map(|_| ())
    }

    /// Apply a sequence of transactions all-or-nothing
    ///
    /// Every transaction is validated against the balances left by the ones
    /// before it; nothing is mutated unless all of them pass.
    pub fn apply_batch(&mut self, txs: &[Arc<Transaction>]) -> Result<()> {
        let balances = self.simulate(txs)?;

        for (name, balance) in balances {
            if let Some(account) = self.accounts.get_mut(&name) {
                account.balance = balance;
            }
        }

        for tx in txs {
            if let Some(sender) = self.accounts.get_mut(&tx.sender) {
                sender.transactions.push(Arc::clone(tx));
            }
            if tx.recipient != tx.sender {
                if let Some(recipient) = self.accounts.get_mut(&tx.recipient) {
                    recipient.transactions.push(Arc::clone(tx));
                }
            }
        }

        Ok(())
    }

    /// Number of accounts
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Check if there are no accounts
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Sum of all balances
    pub fn total_balance(&self) -> u64 {
        self.accounts.values().map(|account| account.balance).sum()
    }

    /// Balances after applying `txs` in order, keyed by touched account
    fn simulate<T: Borrow<Transaction>>(&self, txs: &[T]) -> Result<BTreeMap<AccountId, u64>> {
        let mut balances: BTreeMap<AccountId, u64> = BTreeMap::new();

        for tx in txs {
            let tx = <T as Borrow<Transaction>>::borrow(tx);
            if tx.amount == 0 {
                return Err(Error::InvalidAmount(tx.amount));
            }

            let sender_balance = match balances.get(&tx.sender) {
                Some(balance) => *balance,
                None => self
                    .accounts
                    .get(&tx.sender)
                    .map(|account| account.balance)
                    .ok_or_else(|| Error::SenderNotFound(tx.sender.to_string()))?,
            };

            let recipient_balance = match balances.get(&tx.recipient) {
                Some(balance) => *balance,
                None => self
                    .accounts
                    .get(&tx.recipient)
                    .map(|account| account.balance)
                    .ok_or_else(|| Error::RecipientNotFound(tx.recipient.to_string()))?,
            };

            if sender_balance < tx.amount {
                return Err(Error::InsufficientFunds {
                    account: tx.sender.to_string(),
                    balance: sender_balance,
                    requested: tx.amount,
                });
            }

            if tx.sender == tx.recipient {
                balances.insert(tx.sender.clone(), sender_balance);
                continue;
            }

            let credited = recipient_balance.checked_add(tx.amount).ok_or_else(|| {
                Error::InvalidAmount(tx.amount)
            })?;
            balances.insert(tx.sender.clone(), sender_balance - tx.amount);
            balances.insert(tx.recipient.clone(), credited);
        }

        Ok(balances)
    }
}
