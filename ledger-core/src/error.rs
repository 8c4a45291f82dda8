//! Error types for the ledger

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// An account with this name already exists
    #[error("Account already exists: {0}")]
    AccountAlreadyExists(String),

    /// Account not found
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Block not found
    #[error("Block not found: {0}")]
    BlockNotFound(String),

    /// Transaction sender does not exist
    #[error("Sender not found: {0}")]
    SenderNotFound(String),

    /// Transaction recipient does not exist
    #[error("Recipient not found: {0}")]
    RecipientNotFound(String),

    /// Sender balance is lower than the requested amount
    #[error("Insufficient funds: {account} has {balance}, requested {requested}")]
    InsufficientFunds {
        /// Sending account
        account: String,
        /// Balance at the moment of admission
        balance: u64,
        /// Requested amount
        requested: u64,
    },

    /// Amount must be non-zero
    #[error("Invalid amount: {0}")]
    InvalidAmount(u64),

    /// Another account would push the total supply past the balance range
    #[error("Supply overflow: {accounts} accounts of {initial_balance} exceed u64")]
    SupplyOverflow {
        /// Account count including the rejected one
        accounts: usize,
        /// Balance granted per account
        initial_balance: u64,
    },

    /// Block failed linkage, integrity or admissibility checks
    #[error("Invalid block: {0}")]
    InvalidBlock(String),

    /// Malformed request on the transport surface
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable failure code carried on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            Error::AccountAlreadyExists(_) => "AlreadyExists",
            Error::AccountNotFound(_) | Error::BlockNotFound(_) => "NotFound",
            Error::SenderNotFound(_) => "SenderNotFound",
            Error::RecipientNotFound(_) => "RecipientNotFound",
            Error::InsufficientFunds { .. } => "InsufficientFunds",
            Error::InvalidAmount(_) => "InvalidAmount",
            Error::InvalidBlock(_) => "InvalidBlock",
            Error::InvalidRequest(_) | Error::Serialization(_) => "InvalidRequest",
            Error::SupplyOverflow { .. }
            | Error::Concurrency(_)
            | Error::Config(_)
            | Error::Io(_) => "Internal",
        }
    }

    /// Whether the failure is an expected, caller-recoverable domain condition
    pub fn is_domain(&self) -> bool {
        !matches!(self.kind(), "Internal" | "InvalidRequest")
    }
}
