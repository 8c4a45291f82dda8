//! The ledger aggregate: chain, accounts and proof-of-work target
//!
//! `Ledger` is plain single-threaded state. Concurrent access goes through
//! the actor in [`crate::actor`], which owns exactly one `Ledger`.
//!
//! A transaction is admitted in two steps so mining can happen elsewhere:
//! [`Ledger::prepare_transaction`] validates it and hands out the current tip,
//! and [`Ledger::commit_block`] debits, credits and appends in one call once a
//! block over that tip has been mined.

use crate::{
    accounts::Accounts,
    chain::{Chain, Target},
    config::LedgerConfig,
    miner,
    types::{Account, AccountId, Block, LedgerStats, Transaction, TransactionReceipt},
    Error, Result,
};
use std::sync::Arc;

/// Result of committing a mined block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Block was sealed onto the chain
    Appended {
        /// Hash of the appended block
        hash: String,
    },
    /// The chain moved on while the block was mined; it must be re-mined
    Stale {
        /// Current tip the block should have extended
        tip: String,
    },
}

/// Ledger state owned by a single writer
#[derive(Debug, Clone)]
pub struct Ledger {
    chain: Chain,
    accounts: Accounts,
    target: Target,
}

impl Ledger {
    /// New ledger with a fresh genesis block
    pub fn new(target: Target, initial_balance: u64) -> Self {
        Self {
            chain: Chain::new(chrono::Utc::now().timestamp()),
            accounts: Accounts::new(initial_balance),
            target,
        }
    }

    /// New ledger from configuration, rejecting unusable targets
    pub fn from_config(config: &LedgerConfig) -> Result<Self> {
        let target = Target::new(config.target.clone())?;
        Ok(Self::new(target, config.initial_balance))
    }

    /// Proof-of-work target
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Read access to the chain
    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// Create an account
    pub fn create_account(&mut self, name: AccountId) -> Result<Account> {
        let account = self.accounts.create_account(name)?;
        tracing::info!("Created account {} with balance {}", account.name, account.balance);
        Ok(account)
    }

    /// Validate `tx` against current balances and return the tip to mine on
    pub fn prepare_transaction(&self, tx: &Transaction) -> Result<String> {
        self.accounts.check_transaction(tx)?;
        Ok(self.chain.tip_hash().to_string())
    }

    /// Seal a mined block: re-validate, move balances and append as one step
    pub fn commit_block(&mut self, block: Block) -> Result<CommitOutcome> {
        let tip = self.chain.tip_hash();
        if block.prev_hash != tip {
            return Ok(CommitOutcome::Stale {
                tip: tip.to_string(),
            });
        }

        if block.transactions.is_empty() {
            return Err(Error::InvalidBlock("block has no transactions".to_string()));
        }
        if !block.has_valid_hash() {
            return Err(Error::InvalidBlock(format!(
                "hash {} does not match block contents",
                block.hash
            )));
        }
        if !self.target.admits(&block.hash) {
            return Err(Error::InvalidBlock(format!(
                "hash {} does not meet target {}",
                block.hash, self.target
            )));
        }

        // All-or-nothing: a failure here leaves balances and histories untouched.
        self.accounts.apply_batch(&block.transactions)?;

        // Cannot fail: linkage to the tip was checked above.
        let hash = block.hash.clone();
        let count = block.transactions.len();
        self.chain.append(block)?;

        tracing::info!(
            "Appended block {} at height {} with {} transaction(s)",
            hash,
            self.chain.len() - 1,
            count
        );
        Ok(CommitOutcome::Appended { hash })
    }

    /// Admit a transaction, mining its block inline
    pub fn submit_transaction(
        &mut self,
        sender: AccountId,
        recipient: AccountId,
        amount: u64,
    ) -> Result<TransactionReceipt> {
        if amount == 0 {
            return Err(Error::InvalidAmount(amount));
        }

        let tx = Arc::new(Transaction::new(sender, recipient, amount));
        let tip = self.prepare_transaction(&tx)?;
        let block = miner::mine(vec![Arc::clone(&tx)], tip, &self.target);

        match self.commit_block(block)? {
            CommitOutcome::Appended { hash } => Ok(TransactionReceipt {
                block_hash: hash,
                transaction: (*tx).clone(),
            }),
            // Nothing else can touch the chain while we hold `&mut self`.
            CommitOutcome::Stale { tip } => Err(Error::InvalidBlock(format!(
                "chain tip moved to {} during inline mining",
                tip
            ))),
        }
    }

    /// Balance of an account
    pub fn get_balance(&self, name: &AccountId) -> Result<u64> {
        self.accounts.get_balance(name)
    }

    /// Snapshot of an account
    pub fn get_account(&self, name: &AccountId) -> Result<Account> {
        self.accounts.get_account(name)
    }

    /// Block hashes in chain order
    pub fn chain_summary(&self) -> Vec<String> {
        self.chain.hashes()
    }

    /// Block with the given hash
    pub fn get_block(&self, hash: &str) -> Result<Block> {
        self.chain
            .find(hash)
            .cloned()
            .ok_or_else(|| Error::BlockNotFound(hash.to_string()))
    }

    /// Transactions of the block with the given hash
    pub fn get_block_transactions(&self, hash: &str) -> Result<Vec<Transaction>> {
        self.chain
            .find(hash)
            .map(|block| block.transactions.iter().map(|tx| (**tx).clone()).collect())
            .ok_or_else(|| Error::BlockNotFound(hash.to_string()))
    }

    /// Full chain integrity check
    pub fn validate_chain(&self) -> bool {
        self.chain.validate(&self.target)
    }

    /// Aggregate figures
    pub fn stats(&self) -> LedgerStats {
        LedgerStats {
            accounts: self.accounts.len(),
            blocks: self.chain.len(),
            total_balance: self.accounts.total_balance(),
            target: self.target.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::GENESIS_HASH;

    fn test_ledger() -> Ledger {
        let mut ledger = Ledger::new(Target::new("0").unwrap(), 100);
        ledger.create_account("John".into()).unwrap();
        ledger.create_account("Mike".into()).unwrap();
        ledger
    }

    #[test]
    fn test_submit_transaction_scenario() {
        let mut ledger = test_ledger();
        let receipt = ledger
            .submit_transaction("John".into(), "Mike".into(), 20)
            .unwrap();

        assert_eq!(ledger.get_balance(&"John".into()).unwrap(), 80);
        assert_eq!(ledger.get_balance(&"Mike".into()).unwrap(), 120);
        assert_eq!(ledger.chain().len(), 2);

        let txs = ledger.get_block_transactions(&receipt.block_hash).unwrap();
        assert_eq!(txs, vec![receipt.transaction.clone()]);
        assert_eq!(txs[0].sender.as_str(), "John");
        assert_eq!(txs[0].recipient.as_str(), "Mike");
        assert_eq!(txs[0].amount, 20);

        let block = ledger.get_block(&receipt.block_hash).unwrap();
        assert_eq!(block.prev_hash, GENESIS_HASH);
        assert!(block.hash.starts_with('0'));
        assert!(ledger.validate_chain());
    }

    #[test]
    fn test_failed_submission_changes_nothing() {
        let mut ledger = test_ledger();

        assert!(matches!(
            ledger.submit_transaction("Ghost".into(), "Mike".into(), 5),
            Err(Error::SenderNotFound(_))
        ));
        assert!(matches!(
            ledger.submit_transaction("John".into(), "Mike".into(), 500),
            Err(Error::InsufficientFunds { .. })
        ));
        assert!(matches!(
            ledger.submit_transaction("John".into(), "Mike".into(), 0),
            Err(Error::InvalidAmount(0))
        ));

        assert_eq!(ledger.chain().len(), 1);
        assert_eq!(ledger.get_balance(&"John".into()).unwrap(), 100);
        assert_eq!(ledger.get_balance(&"Mike".into()).unwrap(), 100);
    }

    #[test]
    fn test_commit_of_stale_block_is_reported() {
        let mut ledger = test_ledger();
        let tx = Arc::new(Transaction::new("John".into(), "Mike".into(), 10));
        let tip = ledger.prepare_transaction(&tx).unwrap();
        let late = miner::mine(vec![tx], tip, ledger.target());

        ledger
            .submit_transaction("Mike".into(), "John".into(), 1)
            .unwrap();

        let outcome = ledger.commit_block(late).unwrap();
        assert!(matches!(outcome, CommitOutcome::Stale { .. }));
        assert_eq!(ledger.chain().len(), 2);
        assert_eq!(ledger.get_balance(&"John".into()).unwrap(), 101);
    }

    #[test]
    fn test_commit_rejects_forged_blocks() {
        let mut ledger = test_ledger();
        let tx = Arc::new(Transaction::new("John".into(), "Mike".into(), 10));
        let tip = ledger.prepare_transaction(&tx).unwrap();

        let mut tampered = miner::mine(vec![Arc::clone(&tx)], tip.clone(), ledger.target());
        tampered.nonce += 1;
        assert!(matches!(ledger.commit_block(tampered), Err(Error::InvalidBlock(_))));

        let overdraft = Arc::new(Transaction::new("John".into(), "Mike".into(), 1_000));
        let block = miner::mine(vec![overdraft], tip, ledger.target());
        assert!(matches!(
            ledger.commit_block(block),
            Err(Error::InsufficientFunds { .. })
        ));

        assert_eq!(ledger.chain().len(), 1);
        assert_eq!(ledger.stats().total_balance, 200);
    }

    #[test]
    fn test_commit_moves_balances_and_seals_together() {
        let mut ledger = test_ledger();
        let first = Arc::new(Transaction::new("John".into(), "Mike".into(), 70));
        let second = Arc::new(Transaction::new("John".into(), "Mike".into(), 70));
        let tip = ledger.prepare_transaction(&first).unwrap();

        // Each passes alone, but not in sequence.
        let block = miner::mine(vec![first, second], tip, ledger.target());
        assert!(matches!(
            ledger.commit_block(block),
            Err(Error::InsufficientFunds { balance: 30, requested: 70, .. })
        ));
        assert_eq!(ledger.chain().len(), 1);
        assert_eq!(ledger.get_balance(&"John".into()).unwrap(), 100);
        assert!(ledger.get_account(&"John".into()).unwrap().transactions.is_empty());

        let receipt = ledger
            .submit_transaction("John".into(), "Mike".into(), 70)
            .unwrap();
        let sealed = ledger.get_block(&receipt.block_hash).unwrap();
        let history = ledger.get_account(&"Mike".into()).unwrap().transactions;
        assert_eq!(history, sealed.transactions);
        assert_eq!(ledger.get_balance(&"Mike".into()).unwrap(), 170);
        assert_eq!(ledger.chain().len(), 2);
    }

    #[test]
    fn test_commit_rejects_inadmissible_block() {
        let mut ledger = test_ledger();
        let tx = Arc::new(Transaction::new("John".into(), "Mike".into(), 10));
        let tip = ledger.prepare_transaction(&tx).unwrap();

        // Find a nonce whose hash misses the "0" target.
        let hasher = crate::crypto::BlockHasher::new(std::slice::from_ref(&tx), 1, &tip);
        let nonce = (0..).find(|n| !hasher.digest(*n).starts_with('0')).unwrap();
        let block = Block {
            transactions: vec![tx],
            timestamp: 1,
            prev_hash: tip,
            nonce,
            hash: hasher.digest(nonce),
        };

        assert!(matches!(ledger.commit_block(block), Err(Error::InvalidBlock(_))));
    }

    #[test]
    fn test_queries_are_idempotent() {
        let mut ledger = test_ledger();
        let receipt = ledger
            .submit_transaction("John".into(), "Mike".into(), 20)
            .unwrap();

        assert_eq!(ledger.chain_summary(), ledger.chain_summary());
        assert_eq!(
            ledger.get_block(&receipt.block_hash).unwrap(),
            ledger.get_block(&receipt.block_hash).unwrap()
        );
        assert_eq!(
            ledger.get_balance(&"John".into()).unwrap(),
            ledger.get_balance(&"John".into()).unwrap()
        );
        assert!(matches!(ledger.get_block("nope"), Err(Error::BlockNotFound(_))));
        assert!(matches!(
            ledger.get_block_transactions("nope"),
            Err(Error::BlockNotFound(_))
        ));
    }

    #[test]
    fn test_from_config_rejects_bad_target() {
        let config = LedgerConfig {
            target: "not-hex".to_string(),
            initial_balance: 100,
        };
        assert!(matches!(Ledger::from_config(&config), Err(Error::Config(_))));
    }
}
