//! Configuration for the ledger

use crate::{accounts::INITIAL_BALANCE, chain::Target};
use serde::{Deserialize, Serialize};

/// Ledger service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// RPC listen address
    pub rpc_listen_addr: String,

    /// Ledger configuration
    pub ledger: LedgerConfig,

    /// Actor configuration
    pub actor: ActorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "hashchain-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            rpc_listen_addr: "0.0.0.0:8080".to_string(),
            ledger: LedgerConfig::default(),
            actor: ActorConfig::default(),
        }
    }
}

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Required hash prefix for admissible blocks
    pub target: String,

    /// Balance granted to new accounts
    pub initial_balance: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            target: "000000".to_string(),
            initial_balance: INITIAL_BALANCE,
        }
    }
}

/// Actor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorConfig {
    /// Mailbox capacity (bounded for backpressure)
    pub mailbox_capacity: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1000,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        Config::default().with_env_overrides()
    }

    /// Apply environment variable overrides on top of `self`
    pub fn with_env_overrides(mut self) -> crate::Result<Self> {
        if let Ok(addr) = std::env::var("LEDGER_RPC_ADDR") {
            self.rpc_listen_addr = addr;
        }

        if let Ok(target) = std::env::var("LEDGER_TARGET") {
            self.ledger.target = target;
        }

        if let Ok(balance) = std::env::var("LEDGER_INITIAL_BALANCE") {
            self.ledger.initial_balance = balance.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid LEDGER_INITIAL_BALANCE: {}", e))
            })?;
        }

        Ok(self)
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        Target::new(self.ledger.target.clone())?;

        if self.actor.mailbox_capacity == 0 {
            return Err(crate::Error::Config(
                "actor.mailbox_capacity must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
