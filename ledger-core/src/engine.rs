//! Ledger engine: the operations exposed to the transport layer
//!
//! The engine ties the actor, the miner and metrics together. Submitting a
//! transaction runs in three phases:
//!
//! 1. prepare on the actor (validate, read the tip)
//! 2. mine on the blocking thread pool, outside the actor
//! 3. commit on the actor (re-validate, debit/credit, append)
//!
//! If another block landed between 1 and 3 the mined block is stale; it is
//! dropped and the transaction goes back to phase 1, where it may now be
//! rejected. Queries never wait on mining.
//!
//! # Example
//!
//! ```no_run
//! use hashchain_ledger::{Config, LedgerEngine};
//!
//! #[tokio::main]
//! async fn main() -> hashchain_ledger::Result<()> {
//!     let engine = LedgerEngine::open(Config::default()).await?;
//!
//!     engine.create_account("John").await?;
//!     engine.create_account("Mike").await?;
//!     engine.submit_transaction("John", "Mike", 20).await?;
//!     assert_eq!(engine.get_balance("Mike").await?, 120);
//!
//!     engine.shutdown().await
//! }
//! ```

use crate::{
    actor::{spawn_ledger_actor, LedgerHandle},
    chain::Target,
    ledger::{CommitOutcome, Ledger},
    metrics::Metrics,
    miner::{self, MiningStats},
    types::{Account, AccountId, Block, LedgerStats, Transaction, TransactionReceipt},
    Config, Error, Result,
};
use std::sync::Arc;

/// Main ledger interface
#[derive(Clone)]
pub struct LedgerEngine {
    /// Actor handle owning the ledger state
    handle: LedgerHandle,

    /// Proof-of-work target, fixed for the engine's lifetime
    target: Target,

    /// Metrics
    metrics: Metrics,

    /// Configuration
    config: Arc<Config>,
}

impl LedgerEngine {
    /// Validate the configuration and start the ledger actor
    pub async fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let ledger = Ledger::from_config(&config.ledger)?;
        let target = ledger.target().clone();
        let metrics = Metrics::new()
            .map_err(|e| Error::Config(format!("Failed to register metrics: {}", e)))?;

        let handle = spawn_ledger_actor(ledger, config.actor.mailbox_capacity);

        tracing::info!(
            "Ledger engine {} v{} started with target {:?}",
            config.service_name,
            config.service_version,
            target.as_str()
        );

        Ok(Self {
            handle,
            target,
            metrics,
            config: Arc::new(config),
        })
    }

    /// Create an account with the initial balance
    pub async fn create_account(&self, name: impl Into<AccountId>) -> Result<Account> {
        let account = self.handle.create_account(name.into()).await?;
        self.metrics.record_account_created();
        Ok(account)
    }

    /// Admit a transfer and seal it in a newly mined block
    pub async fn submit_transaction(
        &self,
        sender: impl Into<AccountId>,
        recipient: impl Into<AccountId>,
        amount: u64,
    ) -> Result<TransactionReceipt> {
        if amount == 0 {
            return Err(self.rejected(Error::InvalidAmount(amount)));
        }

        let tx = Transaction::new(sender.into(), recipient.into(), amount);
        let shared = Arc::new(tx.clone());

        loop {
            let tip = self
                .handle
                .prepare_transaction(tx.clone())
                .await
                .map_err(|e| self.rejected(e))?;

            let (block, stats) = self.mine(Arc::clone(&shared), tip).await?;
            self.metrics
                .record_mining(stats.attempts, stats.elapsed.as_secs_f64());

            if let Some(receipt) = self.seal(&tx, block).await? {
                return Ok(receipt);
            }
        }
    }

    /// Commit a mined block; `None` means it went stale and must be re-mined
    async fn seal(&self, tx: &Transaction, block: Block) -> Result<Option<TransactionReceipt>> {
        match self
            .handle
            .commit_block(block)
            .await
            .map_err(|e| self.rejected(e))?
        {
            CommitOutcome::Appended { hash } => {
                self.metrics.record_transaction_admitted();
                Ok(Some(TransactionReceipt {
                    block_hash: hash,
                    transaction: tx.clone(),
                }))
            }
            CommitOutcome::Stale { tip } => {
                self.metrics.record_stale_block();
                tracing::warn!(
                    "Discarding stale block for {} -> {} ({}), tip moved to {}",
                    tx.sender,
                    tx.recipient,
                    tx.amount,
                    tip
                );
                Ok(None)
            }
        }
    }

    /// Balance of an account
    pub async fn get_balance(&self, name: impl Into<AccountId>) -> Result<u64> {
        self.handle.get_balance(name.into()).await
    }

    /// Snapshot of an account
    pub async fn get_account(&self, name: impl Into<AccountId>) -> Result<Account> {
        self.handle.get_account(name.into()).await
    }

    /// Block hashes in chain order
    pub async fn get_chain_summary(&self) -> Result<Vec<String>> {
        self.handle.get_chain_summary().await
    }

    /// Block by hash
    pub async fn get_block(&self, hash: impl Into<String>) -> Result<Block> {
        self.handle.get_block(hash.into()).await
    }

    /// Transactions of a block
    pub async fn get_block_transactions(&self, hash: impl Into<String>) -> Result<Vec<Transaction>> {
        self.handle.get_block_transactions(hash.into()).await
    }

    /// Recompute and check every block
    pub async fn validate_chain(&self) -> Result<bool> {
        self.handle.validate_chain().await
    }

    /// Aggregate figures
    pub async fn get_stats(&self) -> Result<LedgerStats> {
        self.handle.get_stats().await
    }

    /// Proof-of-work target
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Configuration the engine was opened with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Stop the ledger actor; later calls on any clone fail
    pub async fn shutdown(&self) -> Result<()> {
        self.handle.shutdown().await
    }

    /// Run the nonce search on the blocking pool
    async fn mine(&self, tx: Arc<Transaction>, prev_hash: String) -> Result<(Block, MiningStats)> {
        let target = self.target.clone();
        tokio::task::spawn_blocking(move || {
            miner::mine_with_stats(vec![tx], prev_hash, chrono::Utc::now().timestamp(), &target)
        })
        .await
        .map_err(|e| Error::Concurrency(format!("Mining task failed: {}", e)))
    }

    /// Count and log a rejected submission, passing the error through
    fn rejected(&self, err: Error) -> Error {
        if err.is_domain() {
            self.metrics.record_transaction_rejected();
            tracing::warn!("Rejected transaction: {}", err);
        } else {
            tracing::error!("Transaction failed: {}", err);
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn create_test_engine() -> LedgerEngine {
        let mut config = Config::default();
        config.ledger.target = "0".to_string();
        LedgerEngine::open(config).await.unwrap()
    }

    #[tokio::test]
    async fn test_engine_open_rejects_bad_target() {
        let mut config = Config::default();
        config.ledger.target = "0".repeat(65);
        assert!(matches!(
            LedgerEngine::open(config).await,
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_submit_and_query() {
        let engine = create_test_engine().await;
        engine.create_account("John").await.unwrap();
        engine.create_account("Mike").await.unwrap();

        let receipt = engine.submit_transaction("John", "Mike", 20).await.unwrap();
        assert!(receipt.block_hash.starts_with('0'));
        assert_eq!(receipt.transaction.amount, 20);

        assert_eq!(engine.get_balance("John").await.unwrap(), 80);
        assert_eq!(engine.get_balance("Mike").await.unwrap(), 120);

        let summary = engine.get_chain_summary().await.unwrap();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[1], receipt.block_hash);

        let block = engine.get_block(receipt.block_hash.clone()).await.unwrap();
        assert_eq!(block.prev_hash, summary[0]);
        assert_eq!(
            engine.get_block_transactions(receipt.block_hash).await.unwrap(),
            vec![receipt.transaction]
        );

        let john = engine.get_account("John").await.unwrap();
        assert_eq!(john.transactions.len(), 1);

        assert_eq!(engine.metrics().transactions_total.get(), 1);
        assert_eq!(engine.metrics().accounts_total.get(), 2);
        assert!(engine.validate_chain().await.unwrap());

        engine.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_stale_block_is_discarded_and_remined() {
        let engine = create_test_engine().await;
        engine.create_account("John").await.unwrap();
        engine.create_account("Mike").await.unwrap();

        let tx = Transaction::new("John".into(), "Mike".into(), 30);
        let tip = engine.handle.prepare_transaction(tx.clone()).await.unwrap();
        let (late, _) = engine.mine(Arc::new(tx.clone()), tip).await.unwrap();

        // Another block lands while `late` was being mined.
        engine.submit_transaction("Mike", "John", 5).await.unwrap();

        assert!(engine.seal(&tx, late).await.unwrap().is_none());
        assert_eq!(engine.metrics().stale_blocks.get(), 1);
        assert_eq!(engine.metrics().transactions_total.get(), 1);
        assert_eq!(engine.get_balance("John").await.unwrap(), 105);
        assert_eq!(engine.get_chain_summary().await.unwrap().len(), 2);

        let tip = engine.handle.prepare_transaction(tx.clone()).await.unwrap();
        let (block, _) = engine.mine(Arc::new(tx.clone()), tip).await.unwrap();
        let receipt = engine.seal(&tx, block).await.unwrap().unwrap();
        assert_eq!(receipt.transaction, tx);
        assert_eq!(engine.get_balance("John").await.unwrap(), 75);
        assert_eq!(engine.get_chain_summary().await.unwrap().len(), 3);
        assert!(engine.validate_chain().await.unwrap());

        engine.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_stale_retry_revalidates_balance() {
        let engine = create_test_engine().await;
        for name in ["John", "Mike", "Anna"] {
            engine.create_account(name).await.unwrap();
        }

        let tx = Transaction::new("John".into(), "Mike".into(), 60);
        let tip = engine.handle.prepare_transaction(tx.clone()).await.unwrap();
        let (late, _) = engine.mine(Arc::new(tx.clone()), tip).await.unwrap();

        engine.submit_transaction("John", "Anna", 60).await.unwrap();

        assert!(engine.seal(&tx, late).await.unwrap().is_none());
        assert!(matches!(
            engine.handle.prepare_transaction(tx).await,
            Err(Error::InsufficientFunds { balance: 40, requested: 60, .. })
        ));
        assert_eq!(engine.get_balance("Mike").await.unwrap(), 100);

        engine.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_oversized_grant_does_not_stop_the_actor() {
        let mut config = Config::default();
        config.ledger.target = String::new();
        config.ledger.initial_balance = u64::MAX / 2 + 1;
        let engine = LedgerEngine::open(config).await.unwrap();

        engine.create_account("John").await.unwrap();
        assert!(matches!(
            engine.create_account("Mike").await,
            Err(Error::SupplyOverflow { .. })
        ));

        let stats = engine.get_stats().await.unwrap();
        assert_eq!(stats.accounts, 1);
        assert_eq!(stats.total_balance, u64::MAX / 2 + 1);
        assert_eq!(engine.get_balance("John").await.unwrap(), u64::MAX / 2 + 1);

        engine.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_rejections_are_counted() {
        let engine = create_test_engine().await;
        engine.create_account("John").await.unwrap();

        assert!(matches!(
            engine.submit_transaction("John", "Ghost", 5).await,
            Err(Error::RecipientNotFound(_))
        ));
        assert!(matches!(
            engine.submit_transaction("John", "John", 0).await,
            Err(Error::InvalidAmount(0))
        ));
        assert_eq!(engine.metrics().transactions_rejected.get(), 2);
        assert_eq!(engine.get_chain_summary().await.unwrap().len(), 1);

        engine.shutdown().await.unwrap();
    }
}
