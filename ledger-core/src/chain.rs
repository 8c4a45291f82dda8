//! Hash-linked chain of blocks
//!
//! # Invariants
//!
//! - Append-only: blocks are never modified or removed
//! - Linkage: `blocks[i].prev_hash == blocks[i - 1].hash` for every `i > 0`
//! - Every non-genesis hash matches its fields and starts with the target

use crate::{crypto::DIGEST_HEX_LEN, types::Block, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hash carried by the genesis block
pub const GENESIS_HASH: &str = "0";

/// Previous-hash sentinel of the genesis block
pub const GENESIS_PREV_HASH: &str = "";

/// Proof-of-work target: a required hash prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Target(String);

impl Target {
    /// Validate a target prefix
    ///
    /// Rejects prefixes a hex digest can never start with, since mining
    /// against them would not terminate.
    pub fn new(prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();

        if prefix.len() > DIGEST_HEX_LEN {
            return Err(Error::Config(format!(
                "target length {} exceeds digest length {}",
                prefix.len(),
                DIGEST_HEX_LEN
            )));
        }

        if let Some(c) = prefix
            .chars()
            .find(|c| !matches!(c, '0'..='9' | 'a'..='f'))
        {
            return Err(Error::Config(format!(
                "target contains non lowercase-hex character {:?}",
                c
            )));
        }

        Ok(Self(prefix))
    }

    /// Target that admits every hash
    pub fn trivial() -> Self {
        Self(String::new())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `hash` satisfies this target
    pub fn admits(&self, hash: &str) -> bool {
        admissible(hash, &self.0)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Target {
    type Error = Error;

    fn try_from(prefix: String) -> Result<Self> {
        Self::new(prefix)
    }
}

impl From<Target> for String {
    fn from(target: Target) -> Self {
        target.0
    }
}

/// Admission predicate: raw character prefix match
pub fn admissible(hash: &str, target: &str) -> bool {
    hash.as_bytes().starts_with(target.as_bytes())
}

/// Ordered, append-only sequence of blocks
#[derive(Debug, Clone)]
pub struct Chain {
    blocks: Vec<Block>,
}

impl Chain {
    /// Chain holding only a genesis block stamped `timestamp`
    pub fn new(timestamp: i64) -> Self {
        Self {
            blocks: vec![Self::genesis(timestamp)],
        }
    }

    /// Genesis block: no transactions, sentinel hashes
    pub fn genesis(timestamp: i64) -> Block {
        Block {
            transactions: Vec::new(),
            timestamp,
            prev_hash: GENESIS_PREV_HASH.to_string(),
            nonce: 0,
            hash: GENESIS_HASH.to_string(),
        }
    }

    /// Most recent block
    pub fn last(&self) -> &Block {
        // A chain always holds its genesis block.
        &self.blocks[self.blocks.len() - 1]
    }

    /// Hash of the most recent block
    pub fn tip_hash(&self) -> &str {
        &self.last().hash
    }

    /// Append a block that extends the current tip
    ///
    /// Admissibility is checked by whoever mined the block, not here.
    pub fn append(&mut self, block: Block) -> Result<()> {
        if block.prev_hash != self.last().hash {
            return Err(Error::InvalidBlock(format!(
                "prev_hash {} does not match tip {}",
                block.prev_hash,
                self.last().hash
            )));
        }

        self.blocks.push(block);
        Ok(())
    }

    /// First block whose hash equals `hash`
    pub fn find(&self, hash: &str) -> Option<&Block> {
        self.blocks.iter().find(|block| block.hash == hash)
    }

    /// Block hashes in chain order
    pub fn hashes(&self) -> Vec<String> {
        self.blocks.iter().map(|block| block.hash.clone()).collect()
    }

    /// All blocks in chain order
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Number of blocks, genesis included
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Full integrity check, see [`validate_chain`]
    pub fn validate(&self, target: &Target) -> bool {
        validate_chain(&self.blocks, target)
    }
}

/// Recompute every hash and check linkage and admissibility.
///
/// The genesis block is exempt from hash and admissibility checks.
pub fn validate_chain(blocks: &[Block], target: &Target) -> bool {
    let Some((genesis, rest)) = blocks.split_first() else {
        return false;
    };

    let mut prev = genesis;
    for block in rest {
        if block.prev_hash != prev.hash {
            tracing::debug!("Broken linkage at block {}", block.hash);
            return false;
        }
        if !block.has_valid_hash() {
            tracing::debug!("Hash mismatch at block {}", block.hash);
            return false;
        }
        if !target.admits(&block.hash) {
            tracing::debug!("Inadmissible hash at block {}", block.hash);
            return false;
        }
        prev = block;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Transaction;
    use std::sync::Arc;

    fn sealed_block(prev_hash: &str, target: &Target) -> Block {
        let tx = Arc::new(Transaction::with_timestamp(
            "John".into(),
            "Mike".into(),
            20,
            1_700_000_000,
        ));
        crate::miner::mine_at(vec![tx], prev_hash.to_string(), 1_700_000_001, target)
    }

    #[test]
    fn test_admissible_is_prefix_match() {
        assert!(admissible("000abc", "000"));
        assert!(admissible("000abc", ""));
        assert!(!admissible("00abc", "000"));
        assert!(!admissible("0", "00"));
        assert!(admissible("abc", "abc"));
    }

    #[test]
    fn test_target_validation() {
        assert!(Target::new("000000").is_ok());
        assert!(Target::new("").is_ok());
        assert!(Target::new("00ff").is_ok());
        assert!(matches!(Target::new("0".repeat(65)), Err(Error::Config(_))));
        assert!(matches!(Target::new("00F"), Err(Error::Config(_))));
        assert!(matches!(Target::new("zz"), Err(Error::Config(_))));
    }

    #[test]
    fn test_target_deserialization_validates() {
        let target: Target = serde_json::from_str("\"00\"").unwrap();
        assert_eq!(target.as_str(), "00");
        assert!(serde_json::from_str::<Target>("\"xyz\"").is_err());
    }

    #[test]
    fn test_genesis_chain() {
        let chain = Chain::new(1_700_000_000);
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.tip_hash(), GENESIS_HASH);
        assert_eq!(chain.last().prev_hash, GENESIS_PREV_HASH);
        assert!(chain.last().transactions.is_empty());
        assert!(chain.validate(&Target::new("000000").unwrap()));
    }

    #[test]
    fn test_append_requires_linkage() {
        let target = Target::new("0").unwrap();
        let mut chain = Chain::new(1_700_000_000);

        let block = sealed_block(GENESIS_HASH, &target);
        chain.append(block.clone()).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.tip_hash(), block.hash);

        let stale = sealed_block(GENESIS_HASH, &target);
        assert!(matches!(chain.append(stale), Err(Error::InvalidBlock(_))));
        assert_eq!(chain.len(), 2);
        assert!(chain.validate(&target));
    }

    #[test]
    fn test_find_and_hashes() {
        let target = Target::trivial();
        let mut chain = Chain::new(1_700_000_000);
        let block = sealed_block(GENESIS_HASH, &target);
        chain.append(block.clone()).unwrap();

        assert_eq!(chain.hashes(), vec![GENESIS_HASH.to_string(), block.hash.clone()]);
        assert_eq!(chain.find(&block.hash), Some(&block));
        assert!(chain.find("missing").is_none());
    }

    #[test]
    fn test_validate_detects_tampering() {
        let target = Target::new("0").unwrap();
        let mut chain = Chain::new(1_700_000_000);
        chain.append(sealed_block(GENESIS_HASH, &target)).unwrap();

        let mut blocks = chain.blocks().to_vec();
        assert!(validate_chain(&blocks, &target));

        let forged = Arc::new(Transaction::with_timestamp(
            "John".into(),
            "Mike".into(),
            99,
            1_700_000_000,
        ));
        blocks[1].transactions = vec![forged];
        assert!(!validate_chain(&blocks, &target));
    }

    #[test]
    fn test_validate_detects_inadmissible_hash() {
        let mut chain = Chain::new(1_700_000_000);
        let block = sealed_block(GENESIS_HASH, &Target::trivial());
        let strict = Target::new("f".repeat(8)).unwrap();
        chain.append(block).unwrap();
        assert!(!chain.validate(&strict));
        assert!(chain.validate(&Target::trivial()));
    }

    #[test]
    fn test_validate_detects_broken_linkage() {
        let target = Target::trivial();
        let mut chain = Chain::new(1_700_000_000);
        chain.append(sealed_block(GENESIS_HASH, &target)).unwrap();

        let mut blocks = chain.blocks().to_vec();
        blocks[1] = sealed_block("elsewhere", &target);
        assert!(!validate_chain(&blocks, &target));
        assert!(!validate_chain(&[], &target));
    }
}
