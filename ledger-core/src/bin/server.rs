//! Ledger RPC server binary
//!
//! Configuration is read from the TOML file named by `LEDGER_CONFIG` (if set),
//! then overridden from the environment.

use hashchain_ledger::{rpc, Config, LedgerEngine};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting Hashchain Ledger Server");

    // Load configuration
    let config = match std::env::var("LEDGER_CONFIG") {
        Ok(path) => Config::from_file(&path)?,
        Err(_) => Config::default(),
    }
    .with_env_overrides()?;

    // Open ledger
    let engine = LedgerEngine::open(config).await?;
    let listener = TcpListener::bind(&engine.config().rpc_listen_addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::error!("Accept failed: {}", e);
                        continue;
                    }
                };

                let engine = engine.clone();
                tokio::spawn(async move {
                    tracing::debug!("Connection from {}", peer);
                    if let Err(e) = rpc::serve_connection(engine, stream).await {
                        tracing::warn!("Connection {} closed with error: {}", peer, e);
                    }
                });
            }

            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    tracing::info!("Shutting down ledger server");
    let stats = engine.get_stats().await?;
    tracing::info!(
        "Final state: {} accounts, {} blocks, total balance {}",
        stats.accounts,
        stats.blocks,
        stats.total_balance
    );
    tracing::debug!("{}", engine.metrics().gather_text());
    engine.shutdown().await?;
    Ok(())
}
