//! causewayd — the Causeway relay daemon.
//!
//! Rendezvous and dumb pipe for local-first peers: unauthenticated,
//! transport-terminating, stores nothing. One process, one listener.

use anyhow::{Context, Result};

use causeway_core::config::CausewayConfig;
use causeway_relay::Relay;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = CausewayConfig::load().context("failed to load configuration")?;
    let relay = Relay::bind(&config.listen_addr()).await?;
    tracing::info!(addr = %relay.local_addr()?, "causeway relay listening");

    let handle = relay.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received");
            handle.shutdown();
        }
    });

    relay.serve().await
}
