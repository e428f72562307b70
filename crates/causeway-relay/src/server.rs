//! Relay front-end — listener, routes, and lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::connection;
use crate::introduction;
use crate::registry::PeerRegistry;
use crate::rendezvous::RendezvousTable;
use crate::transport::ConnectionTracker;

// ── Shared state ──────────────────────────────────────────────────────────────

/// Everything a handler needs: the two state machines, the open-connection
/// tracker, and the shutdown broadcast every connection task subscribes to.
#[derive(Clone)]
pub struct RelayState {
    pub registry: Arc<PeerRegistry>,
    pub rendezvous: Arc<RendezvousTable>,
    pub connections: ConnectionTracker,
    pub shutdown: broadcast::Sender<()>,
}

impl RelayState {
    fn new() -> Self {
        let (shutdown, _) = broadcast::channel(4);
        Self {
            registry: Arc::new(PeerRegistry::new()),
            rendezvous: Arc::new(RendezvousTable::new()),
            connections: ConnectionTracker::new(),
            shutdown,
        }
    }
}

// ── Lifecycle ─────────────────────────────────────────────────────────────────

/// A bound, not-yet-serving relay. Binding is separate from serving so the
/// caller can learn the OS-assigned port and keep a shutdown handle.
pub struct Relay {
    listener: TcpListener,
    state: RelayState,
}

/// Stops a serving relay from another task.
#[derive(Clone)]
pub struct RelayHandle {
    shutdown: broadcast::Sender<()>,
    connections: ConnectionTracker,
}

impl RelayHandle {
    /// Stop accepting, force-close every open client transport, and let
    /// `serve` return once the listener is torn down. No in-flight drain.
    pub fn shutdown(&self) {
        tracing::info!(
            open = self.connections.len(),
            "relay shutting down, closing client transports"
        );
        let _ = self.shutdown.send(());
    }
}

impl Relay {
    /// Bind the listener. A port conflict or other bind failure surfaces
    /// here; it is not retried.
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind relay listener on {addr}"))?;
        Ok(Self {
            listener,
            state: RelayState::new(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("listener has no local address")
    }

    pub fn handle(&self) -> RelayHandle {
        RelayHandle {
            shutdown: self.state.shutdown.clone(),
            connections: self.state.connections.clone(),
        }
    }

    /// Shared state, for introspection from the embedding process or tests.
    pub fn state(&self) -> RelayState {
        self.state.clone()
    }

    /// Serve until the shutdown handle fires, then complete once every
    /// connection task has closed its socket.
    pub async fn serve(self) -> Result<()> {
        let mut shutdown_rx = self.state.shutdown.subscribe();
        let app = router(self.state);
        axum::serve(self.listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await
            .context("relay server failed")?;
        tracing::info!("relay stopped");
        Ok(())
    }
}

// ── Routes ────────────────────────────────────────────────────────────────────

fn router(state: RelayState) -> Router {
    Router::new()
        .route("/", get(landing))
        .route("/introduction/{id}", get(introduction::upgrade))
        .route("/connection/{from}/{to}/{key}", get(connection::upgrade))
        .with_state(state)
}

/// Liveness page. Not part of the relay contract — anything beyond "200 and
/// some HTML" is cosmetic.
async fn landing() -> Html<&'static str> {
    Html(LANDING_PAGE)
}

const LANDING_PAGE: &str = concat!(
    "<!DOCTYPE html>\n<html>\n<head><title>Causeway</title></head>\n<body>\n\
     <h1>Causeway relay</h1>\n\
     <p>version ",
    env!("CARGO_PKG_VERSION"),
    " &mdash; introduction and connection endpoints are up.</p>\n\
     </body>\n</html>\n"
);
