//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//! Each engine owns its own [`Registry`], so several engines (as in tests)
//! can coexist in one process.
//!
//! # Metrics
//!
//! - `ledger_accounts_total` - Accounts created
//! - `ledger_transactions_total` - Transactions admitted
//! - `ledger_transactions_rejected_total` - Submissions rejected by validation
//! - `ledger_blocks_total` - Blocks appended
//! - `ledger_stale_blocks_total` - Mined blocks discarded because the tip moved
//! - `ledger_mining_attempts` - Histogram of digests computed per block
//! - `ledger_mining_duration_seconds` - Histogram of nonce search time

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Accounts created
    pub accounts_total: IntCounter,

    /// Transactions admitted
    pub transactions_total: IntCounter,

    /// Submissions rejected
    pub transactions_rejected: IntCounter,

    /// Blocks appended
    pub blocks_total: IntCounter,

    /// Stale mining results
    pub stale_blocks: IntCounter,

    /// Mining attempts histogram
    pub mining_attempts: Histogram,

    /// Mining duration histogram
    pub mining_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let accounts_total = IntCounter::new("ledger_accounts_total", "Accounts created")?;
        registry.register(Box::new(accounts_total.clone()))?;

        let transactions_total =
            IntCounter::new("ledger_transactions_total", "Transactions admitted")?;
        registry.register(Box::new(transactions_total.clone()))?;

        let transactions_rejected = IntCounter::new(
            "ledger_transactions_rejected_total",
            "Submissions rejected by validation",
        )?;
        registry.register(Box::new(transactions_rejected.clone()))?;

        let blocks_total = IntCounter::new("ledger_blocks_total", "Blocks appended")?;
        registry.register(Box::new(blocks_total.clone()))?;

        let stale_blocks = IntCounter::new(
            "ledger_stale_blocks_total",
            "Mined blocks discarded because the tip moved",
        )?;
        registry.register(Box::new(stale_blocks.clone()))?;

        let mining_attempts = Histogram::with_opts(
            HistogramOpts::new("ledger_mining_attempts", "Digests computed per block").buckets(
                vec![1.0, 16.0, 256.0, 4096.0, 65536.0, 1_048_576.0, 16_777_216.0],
            ),
        )?;
        registry.register(Box::new(mining_attempts.clone()))?;

        let mining_duration = Histogram::with_opts(
            HistogramOpts::new(
                "ledger_mining_duration_seconds",
                "Nonce search time per block",
            )
            .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 5.0, 30.0, 120.0]),
        )?;
        registry.register(Box::new(mining_duration.clone()))?;

        Ok(Self {
            accounts_total,
            transactions_total,
            transactions_rejected,
            blocks_total,
            stale_blocks,
            mining_attempts,
            mining_duration,
            registry,
        })
    }

    /// Record account creation
    pub fn record_account_created(&self) {
        self.accounts_total.inc();
    }

    /// Record an admitted transaction and its sealing block
    pub fn record_transaction_admitted(&self) {
        self.transactions_total.inc();
        self.blocks_total.inc();
    }

    /// Record a rejected submission
    pub fn record_transaction_rejected(&self) {
        self.transactions_rejected.inc();
    }

    /// Record a discarded stale block
    pub fn record_stale_block(&self) {
        self.stale_blocks.inc();
    }

    /// Record one mining run
    pub fn record_mining(&self, attempts: u64, duration_seconds: f64) {
        self.mining_attempts.observe(attempts as f64);
        self.mining_duration.observe(duration_seconds);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all metrics in the Prometheus text format
    pub fn gather_text(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            tracing::error!("Failed to encode metrics: {}", e);
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}
