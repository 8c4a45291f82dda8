//! Hashing for blocks
//!
//! A block's canonical form is the text concatenation, without separators, of
//! each transaction's sender, recipient, amount and timestamp (in block order),
//! followed by the block timestamp, previous hash and nonce. The digest is
//! SHA-256, rendered as 64 lowercase hex characters.

use crate::types::Transaction;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Length of a hex digest in characters
pub const DIGEST_HEX_LEN: usize = 64;

/// Hash arbitrary bytes using SHA-256, hex encoded
pub fn hash_bytes(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Canonical text form of a block's hashed fields
pub fn canonical_text(
    transactions: &[Arc<Transaction>],
    timestamp: i64,
    prev_hash: &str,
    nonce: u64,
) -> String {
    let mut text = String::new();
    for tx in transactions {
        text.push_str(tx.sender.as_str());
        text.push_str(tx.recipient.as_str());
        text.push_str(&tx.amount.to_string());
        text.push_str(&tx.timestamp.to_string());
    }
    text.push_str(&timestamp.to_string());
    text.push_str(prev_hash);
    text.push_str(&nonce.to_string());
    text
}

/// Hash a block's fields
pub fn hash_block(
    transactions: &[Arc<Transaction>],
    timestamp: i64,
    prev_hash: &str,
    nonce: u64,
) -> String {
    BlockHasher::new(transactions, timestamp, prev_hash).digest(nonce)
}

/// Hasher with everything but the nonce already absorbed.
///
/// Produces the same digest as [`hash_block`]; the miner uses it so each
/// attempt only hashes the nonce on top of a cloned state.
#[derive(Clone)]
pub struct BlockHasher {
    prefix: Sha256,
}

impl BlockHasher {
    /// Absorb transactions, timestamp and previous hash
    pub fn new(transactions: &[Arc<Transaction>], timestamp: i64, prev_hash: &str) -> Self {
        let mut prefix = Sha256::new();
        for tx in transactions {
            prefix.update(tx.sender.as_str().as_bytes());
            prefix.update(tx.recipient.as_str().as_bytes());
            prefix.update(tx.amount.to_string().as_bytes());
            prefix.update(tx.timestamp.to_string().as_bytes());
        }
        prefix.update(timestamp.to_string().as_bytes());
        prefix.update(prev_hash.as_bytes());
        Self { prefix }
    }

    /// Digest for a given nonce
    pub fn digest(&self, nonce: u64) -> String {
        let mut hasher = self.prefix.clone();
        hasher.update(nonce.to_string().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl std::fmt::Debug for BlockHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockHasher").finish_non_exhaustive()
    }
}
