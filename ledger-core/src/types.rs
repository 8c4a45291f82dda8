//! Core types for the ledger
//!
//! Transactions are immutable once created and shared (`Arc`) between the
//! block that seals them and the histories of both participating accounts.
//! Timestamps are Unix seconds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Account identifier (the account's unique name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Create new account ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Transfer of value between two accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Debited account
    pub sender: AccountId,

    /// Credited account
    pub recipient: AccountId,

    /// Amount transferred (non-zero)
    pub amount: u64,

    /// Creation time, assigned once
    pub timestamp: i64,
}

impl Transaction {
    /// Create a transaction stamped with the current time
    pub fn new(sender: AccountId, recipient: AccountId, amount: u64) -> Self {
        Self::with_timestamp(sender, recipient, amount, chrono::Utc::now().timestamp())
    }

    /// Create a transaction with an explicit timestamp
    pub fn with_timestamp(
        sender: AccountId,
        recipient: AccountId,
        amount: u64,
        timestamp: i64,
    ) -> Self {
        Self {
            sender,
            recipient,
            amount,
            timestamp,
        }
    }

    /// Whether `account` takes part in this transaction
    pub fn involves(&self, account: &AccountId) -> bool {
        &self.sender == account || &self.recipient == account
    }
}

/// Account snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique, immutable name
    pub name: AccountId,

    /// Current balance, never negative
    pub balance: u64,

    /// Transactions this account took part in, oldest first
    #[serde(rename = "transaction_history")]
    pub transactions: Vec<Arc<Transaction>>,
}

impl Account {
    /// Fresh account with an empty history
    pub fn new(name: AccountId, initial_balance: u64) -> Self {
        Self {
            name,
            balance: initial_balance,
            transactions: Vec::new(),
        }
    }
}

/// Block of transactions sealed by proof of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Transactions in block order (empty only for genesis)
    pub transactions: Vec<Arc<Transaction>>,

    /// Block creation time
    pub timestamp: i64,

    /// Hash of the preceding block
    pub prev_hash: String,

    /// Nonce found by the miner
    pub nonce: u64,

    /// Digest over the fields above
    pub hash: String,
}

impl Block {
    /// Recompute the digest over this block's own fields
    pub fn compute_hash(&self) -> String {
        crate::crypto::hash_block(&self.transactions, self.timestamp, &self.prev_hash, self.nonce)
    }

    /// Whether the stored hash matches the recomputed one
    pub fn has_valid_hash(&self) -> bool {
        self.compute_hash() == self.hash
    }
}

/// Acknowledgement returned for an admitted transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    /// Hash of the block sealing the transaction
    pub block_hash: String,

    /// The admitted transaction
    pub transaction: Transaction,
}

/// Aggregate figures over the whole ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    /// Number of accounts
    pub accounts: usize,

    /// Number of blocks, genesis included
    pub blocks: usize,

    /// Sum of all balances
    pub total_balance: u64,

    /// Proof-of-work prefix
    pub target: String,
}
