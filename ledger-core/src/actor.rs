//! Actor-based concurrency for the ledger
//!
//! One task owns the [`Ledger`] and processes messages from its mailbox one
//! at a time, so every read and every mutation observes a consistent state
//! and check-then-debit sequences cannot interleave.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │            Transport (one task per connection)        │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │               LedgerHandle (Clone)                    │
//! │         Sends messages to actor mailbox               │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              LedgerActor (Single Task)                │
//! │   owns Ledger { Chain, Accounts, Target }             │
//! │   replies over oneshot channels                       │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! Mining never runs on the actor task: callers prepare a transaction,
//! mine elsewhere, then commit the sealed block.

use crate::{
    ledger::{CommitOutcome, Ledger},
    types::{Account, AccountId, Block, LedgerStats, Transaction},
    Error, Result,
};
use tokio::sync::{mpsc, oneshot};

/// Message sent to the ledger actor
#[derive(Debug)]
pub enum LedgerMessage {
    /// Create an account
    CreateAccount {
        name: AccountId,
        response: oneshot::Sender<Result<Account>>,
    },

    /// Validate a transaction and return the tip to mine on
    PrepareTransaction {
        transaction: Transaction,
        response: oneshot::Sender<Result<String>>,
    },

    /// Commit a mined block
    CommitBlock {
        block: Block,
        response: oneshot::Sender<Result<CommitOutcome>>,
    },

    /// Get account balance
    GetBalance {
        name: AccountId,
        response: oneshot::Sender<Result<u64>>,
    },

    /// Get account snapshot
    GetAccount {
        name: AccountId,
        response: oneshot::Sender<Result<Account>>,
    },

    /// Get block hashes in chain order
    GetChainSummary {
        response: oneshot::Sender<Vec<String>>,
    },

    /// Get block by hash
    GetBlock {
        hash: String,
        response: oneshot::Sender<Result<Block>>,
    },

    /// Get transactions of a block by hash
    GetBlockTransactions {
        hash: String,
        response: oneshot::Sender<Result<Vec<Transaction>>>,
    },

    /// Run the full chain integrity check
    ValidateChain {
        response: oneshot::Sender<bool>,
    },

    /// Get aggregate figures
    GetStats {
        response: oneshot::Sender<LedgerStats>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that processes ledger messages
#[derive(Debug)]
pub struct LedgerActor {
    /// Ledger state, owned exclusively by this actor
    ledger: Ledger,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(ledger: Ledger, mailbox: mpsc::Receiver<LedgerMessage>) -> Self {
        Self { ledger, mailbox }
    }

    /// Run the actor event loop until shutdown or until every handle is dropped
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            if let LedgerMessage::Shutdown = msg {
                tracing::info!("Ledger actor shutting down");
                break;
            }
            self.handle_message(msg);
        }
        tracing::debug!("Ledger actor stopped at {} blocks", self.ledger.chain().len());
    }

    /// Handle a single message
    fn handle_message(&mut self, msg: LedgerMessage) {
        let delivered = match msg {
            LedgerMessage::CreateAccount { name, response } => {
                response.send(self.ledger.create_account(name)).is_ok()
            }

            LedgerMessage::PrepareTransaction {
                transaction,
                response,
            } => {
                let result = self.ledger.prepare_transaction(&transaction);
                tracing::debug!(
                    "Prepared {} -> {} ({}): {:?}",
                    transaction.sender,
                    transaction.recipient,
                    transaction.amount,
                    result
                );
                response.send(result).is_ok()
            }

            LedgerMessage::CommitBlock { block, response } => {
                let result = self.ledger.commit_block(block);
                response.send(result).is_ok()
            }

            LedgerMessage::GetBalance { name, response } => {
                response.send(self.ledger.get_balance(&name)).is_ok()
            }

            LedgerMessage::GetAccount { name, response } => {
                response.send(self.ledger.get_account(&name)).is_ok()
            }

            LedgerMessage::GetChainSummary { response } => {
                response.send(self.ledger.chain_summary()).is_ok()
            }

            LedgerMessage::GetBlock { hash, response } => {
                response.send(self.ledger.get_block(&hash)).is_ok()
            }

            LedgerMessage::GetBlockTransactions { hash, response } => {
                response.send(self.ledger.get_block_transactions(&hash)).is_ok()
            }

            LedgerMessage::ValidateChain { response } => {
                response.send(self.ledger.validate_chain()).is_ok()
            }

            LedgerMessage::GetStats { response } => response.send(self.ledger.stats()).is_ok(),

            LedgerMessage::Shutdown => true,
        };

        if !delivered {
            tracing::warn!("Caller dropped before receiving ledger response");
        }
    }
}

/// Handle for sending messages to the actor
#[derive(Debug, Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    /// Send a message and wait for the actor's reply
    async fn request<T>(
        &self,
        message: impl FnOnce(oneshot::Sender<T>) -> LedgerMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(message(tx))
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
    }

    /// Create an account
    pub async fn create_account(&self, name: AccountId) -> Result<Account> {
        self.request(|response| LedgerMessage::CreateAccount { name, response })
            .await?
    }

    /// Validate a transaction, returning the tip to mine on
    pub async fn prepare_transaction(&self, transaction: Transaction) -> Result<String> {
        self.request(|response| LedgerMessage::PrepareTransaction {
            transaction,
            response,
        })
        .await?
    }

    /// Commit a mined block
    pub async fn commit_block(&self, block: Block) -> Result<CommitOutcome> {
        self.request(|response| LedgerMessage::CommitBlock { block, response })
            .await?
    }

    /// Get account balance
    pub async fn get_balance(&self, name: AccountId) -> Result<u64> {
        self.request(|response| LedgerMessage::GetBalance { name, response })
            .await?
    }

    /// Get account snapshot
    pub async fn get_account(&self, name: AccountId) -> Result<Account> {
        self.request(|response| LedgerMessage::GetAccount { name, response })
            .await?
    }

    /// Get block hashes in chain order
    pub async fn get_chain_summary(&self) -> Result<Vec<String>> {
        self.request(|response| LedgerMessage::GetChainSummary { response })
            .await
    }

    /// Get block by hash
    pub async fn get_block(&self, hash: String) -> Result<Block> {
        self.request(|response| LedgerMessage::GetBlock { hash, response })
            .await?
    }

    /// Get transactions of a block
    pub async fn get_block_transactions(&self, hash: String) -> Result<Vec<Transaction>> {
        self.request(|response| LedgerMessage::GetBlockTransactions { hash, response })
            .await?
    }

    /// Run the full chain integrity check
    pub async fn validate_chain(&self) -> Result<bool> {
        self.request(|response| LedgerMessage::ValidateChain { response })
            .await
    }

    /// Get aggregate figures
    pub async fn get_stats(&self) -> Result<LedgerStats> {
        self.request(|response| LedgerMessage::GetStats { response })
            .await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ledger actor
pub fn spawn_ledger_actor(ledger: Ledger, mailbox_capacity: usize) -> LedgerHandle {
    let (tx, rx) = mpsc::channel(mailbox_capacity); // Bounded channel for backpressure
    let actor = LedgerActor::new(ledger, rx);

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle::new(tx)
}
