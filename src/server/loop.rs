// Server loop module
// Accepts connections until shutdown, then drains in-flight connections

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::{watch, Notify};

use super::connection::accept_connection;
use crate::config;
use crate::logger;

/// How often the drain phase re-checks the connection counter
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Configuration for server loop behavior
pub struct ServerLoopConfig {
    pub shutdown: Arc<Notify>,
    /// Upper bound on how long in-flight connections may keep running after shutdown
    pub grace: Duration,
}

/// Run the accept loop until the shutdown signal fires.
///
/// After shutdown the listener is dropped so no new connections are
/// accepted and every open connection is told to finish gracefully. The
/// loop then waits for active connections to close or for the grace period
/// to elapse, whichever comes first.
#[allow(clippy::ignored_unit_patterns)]
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<config::AppState>,
    active_connections: Arc<AtomicUsize>,
    config: ServerLoopConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let (stopping_tx, stopping_rx) = watch::channel(false);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections, &stopping_rx);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            _ = config.shutdown.notified() => {
                break;
            }
        }
    }

    drop(listener);
    stopping_tx.send_replace(true);
    logger::log_shutdown_started(active_connections.load(Ordering::SeqCst));
    drain_connections(&active_connections, config.grace).await;
    logger::log_shutdown_complete();
    Ok(())
}

async fn drain_connections(active_connections: &AtomicUsize, grace: Duration) {
    let deadline = tokio::time::Instant::now() + grace;

    while active_connections.load(Ordering::SeqCst) > 0 {
        if tokio::time::Instant::now() >= deadline {
            logger::log_warning(&format!(
                "Grace period elapsed with {} connection(s) still open",
                active_connections.load(Ordering::SeqCst)
            ));
            return;
        }
        tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
    }
}
