//! A single worker: one process, one thread, one HTTP listener on the shared
//! port.

use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpSocket};
use tracing::{info, warn};

use crate::{api, config::Config, telemetry};

/// Bind `addr` so that sibling worker processes can bind it too.
///
/// The kernel spreads incoming connections across every socket bound with
/// SO_REUSEPORT on the same address.
pub fn bind_shared(addr: SocketAddr, backlog: u32) -> Result<TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .context("failed to create listening socket")?;

    socket.set_reuseaddr(true)?;
    #[cfg(unix)]
    socket.set_reuseport(true)?;

    socket
        .bind(addr)
        .with_context(|| format!("failed to bind {addr}"))?;
    socket
        .listen(backlog)
        .with_context(|| format!("failed to listen on {addr}"))
}

pub fn app(cfg: &Config, slot: Option<usize>) -> Router {
    #[allow(unused_mut)]
    let mut app = api::router(cfg, slot);

    #[cfg(feature = "swagger")]
    {
        app = api::with_swagger(app, cfg);
    }

    app
}

/// Serve HTTP until a shutdown signal arrives.
///
/// Must run on a current-thread runtime: workloads execute inline on that
/// thread and block the worker for their whole duration.
pub async fn run_worker(cfg: Config, slot: Option<usize>) -> Result<()> {
    let addr = cfg.server.socket_addr()?;

    if cfg.server.host == "0.0.0.0" && slot.map_or(true, |s| s == 0) {
        warn!(
            "Server binding to 0.0.0.0 - the load generator will be reachable from the network"
        );
    }

    let listener = bind_shared(addr, cfg.server.listen_backlog)?;
    let app = app(&cfg, slot);

    info!(%addr, worker = ?slot, pid = std::process::id(), "worker listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    info!(worker = ?slot, pid = std::process::id(), "worker stopped");
    Ok(())
}
