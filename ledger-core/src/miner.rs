//! Proof-of-work mining
//!
//! Mining is a pure function of its inputs: it never touches ledger state,
//! so callers can run it outside any critical section. The search is a
//! linear scan over nonces starting at zero with no retry limit.

use crate::{
    chain::Target,
    crypto::BlockHasher,
    types::{Block, Transaction},
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome figures of one mining run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MiningStats {
    /// Number of digests computed
    pub attempts: u64,
    /// Wall-clock search time
    pub elapsed: Duration,
}

/// Mine a block stamped with the current time
pub fn mine(transactions: Vec<Arc<Transaction>>, prev_hash: String, target: &Target) -> Block {
    mine_at(transactions, prev_hash, chrono::Utc::now().timestamp(), target)
}

/// Mine a block with an explicit timestamp
pub fn mine_at(
    transactions: Vec<Arc<Transaction>>,
    prev_hash: String,
    timestamp: i64,
    target: &Target,
) -> Block {
    mine_with_stats(transactions, prev_hash, timestamp, target).0
}

/// Mine a block and report how much work it took
pub fn mine_with_stats(
    transactions: Vec<Arc<Transaction>>,
    prev_hash: String,
    timestamp: i64,
    target: &Target,
) -> (Block, MiningStats) {
    let started = Instant::now();
    let hasher = BlockHasher::new(&transactions, timestamp, &prev_hash);

    let mut nonce: u64 = 0;
    let mut attempts: u64 = 1;
    let mut hash = hasher.digest(nonce);
    while !target.admits(&hash) {
        nonce = nonce.wrapping_add(1);
        attempts += 1;
        hash = hasher.digest(nonce);
    }

    let stats = MiningStats {
        attempts,
        elapsed: started.elapsed(),
    };
    tracing::debug!(
        "Mined block {} after {} attempts in {:?}",
        hash,
        stats.attempts,
        stats.elapsed
    );

    let block = Block {
        transactions,
        timestamp,
        prev_hash,
        nonce,
        hash,
    };
    (block, stats)
}
