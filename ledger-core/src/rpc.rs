//! Procedure-call surface over newline-delimited JSON
//!
//! Each request is one JSON object on its own line:
//!
//! ```text
//! {"method":"CreateAccount","params":{"name":"John"}}
//! {"method":"SubmitTransaction","params":{"sender":"John","recipient":"Mike","amount":20}}
//! {"method":"GetChainSummary"}
//! ```
//!
//! and each response is one line, either
//! `{"status":"ok","result":...}` or
//! `{"status":"error","kind":"InsufficientFunds","message":"..."}`.

use crate::{
    engine::LedgerEngine,
    types::{Account, Block, LedgerStats, Transaction, TransactionReceipt},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// Inbound operation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum Request {
    /// Create an account
    CreateAccount {
        /// Account name
        name: String,
    },
    /// Transfer value between accounts
    SubmitTransaction {
        /// Debited account
        sender: String,
        /// Credited account
        recipient: String,
        /// Amount
        amount: u64,
    },
    /// Balance of an account
    GetBalance {
        /// Account name
        name: String,
    },
    /// Account snapshot
    GetAccount {
        /// Account name
        name: String,
    },
    /// Block hashes in chain order
    GetChainSummary,
    /// Block by hash
    GetBlock {
        /// Block hash
        hash: String,
    },
    /// Transactions of a block
    GetBlockTransactions {
        /// Block hash
        hash: String,
    },
    /// Full chain integrity check
    ValidateChain,
    /// Aggregate figures
    GetStats,
}

impl Request {
    /// Operation name
    pub fn method(&self) -> &'static str {
        match self {
            Request::CreateAccount { .. } => "CreateAccount",
            Request::SubmitTransaction { .. } => "SubmitTransaction",
            Request::GetBalance { .. } => "GetBalance",
            Request::GetAccount { .. } => "GetAccount",
            Request::GetChainSummary => "GetChainSummary",
            Request::GetBlock { .. } => "GetBlock",
            Request::GetBlockTransactions { .. } => "GetBlockTransactions",
            Request::ValidateChain => "ValidateChain",
            Request::GetStats => "GetStats",
        }
    }
}

/// Successful result payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    /// Account snapshot
    Account(Account),
    /// Transaction acknowledgement
    Receipt(TransactionReceipt),
    /// Account balance
    Balance(u64),
    /// Block hashes
    Hashes(Vec<String>),
    /// Block snapshot
    Block(Block),
    /// Block transactions
    Transactions(Vec<Transaction>),
    /// Chain validity
    Valid(bool),
    /// Aggregate figures
    Stats(LedgerStats),
}

/// Outbound response envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Response {
    /// Operation succeeded
    Ok {
        /// Result payload
        result: Reply,
    },
    /// Operation failed
    Error {
        /// Stable failure code
        kind: String,
        /// Human-readable description
        message: String,
    },
}

impl From<Result<Reply>> for Response {
    fn from(result: Result<Reply>) -> Self {
        match result {
            Ok(result) => Response::Ok { result },
            Err(err) => Response::Error {
                kind: err.kind().to_string(),
                message: err.to_string(),
            },
        }
    }
}

/// Route a request to the engine
pub async fn dispatch(engine: &LedgerEngine, request: Request) -> Response {
    let method = request.method();
    let result = match request {
        Request::CreateAccount { name } => engine.create_account(name).await.map(Reply::Account),
        Request::SubmitTransaction {
            sender,
            recipient,
            amount,
        } => engine
            .submit_transaction(sender, recipient, amount)
            .await
            .map(Reply::Receipt),
        Request::GetBalance { name } => engine.get_balance(name).await.map(Reply::Balance),
        Request::GetAccount { name } => engine.get_account(name).await.map(Reply::Account),
        Request::GetChainSummary => engine.get_chain_summary().await.map(Reply::Hashes),
        Request::GetBlock { hash } => engine.get_block(hash).await.map(Reply::Block),
        Request::GetBlockTransactions { hash } => engine
            .get_block_transactions(hash)
            .await
            .map(Reply::Transactions),
        Request::ValidateChain => engine.validate_chain().await.map(Reply::Valid),
        Request::GetStats => engine.get_stats().await.map(Reply::Stats),
    };

    if let Err(ref e) = result {
        tracing::debug!("{} failed: {}", method, e);
    }
    result.into()
}

/// Serve requests from one connection until the peer closes it
pub async fn serve_connection<S>(engine: LedgerEngine, stream: S) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            break;
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        // Raw bytes, so invalid UTF-8 is answered like any other bad request.
        let response = match serde_json::from_slice::<Request>(&line) {
            Ok(request) => dispatch(&engine, request).await,
            Err(e) => Response::from(Err::<Reply, _>(Error::InvalidRequest(e.to_string()))),
        };

        let mut payload = serde_json::to_vec(&response)?;
        payload.push(b'\n');
        writer.write_all(&payload).await?;
        writer.flush().await?;
    }

    Ok(())
}
