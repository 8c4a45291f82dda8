//! Hashchain Ledger Core
//!
//! Append-only, hash-linked ledger of transfers between named accounts,
//! sealed by proof of work.
//!
//! # Architecture
//!
//! - **Single Writer**: one actor task owns all ledger state
//! - **Off-actor Mining**: nonce search runs on the blocking pool, never under the writer
//! - **Optimistic Commit**: a block mined on an outdated tip is discarded and re-mined
//! - **Typed Failures**: every rejection is a distinct [`Error`] variant
//!
//! # Invariants
//!
//! - Money conservation: Σ(balances) == initial balance × accounts, for all time
//! - No overdraft: balances never go negative
//! - Linkage: every block's `prev_hash` is its predecessor's hash
//! - Append-only: blocks are never modified or removed

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, clippy::all)]

pub mod accounts;
pub mod actor;
pub mod chain;
pub mod config;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod miner;
pub mod rpc;
pub mod types;

// Re-exports
pub use chain::Target;
pub use config::Config;
pub use engine::LedgerEngine;
pub use error::{Error, Result};
pub use ledger::Ledger;
pub use types::{Account, AccountId, Block, LedgerStats, Transaction, TransactionReceipt};
