use std::sync::Arc;
use std::time::Duration;

use engine_core::EngineLoop;
use net::server::run_listener;
use net::Channel;
use tokio::sync::watch;

use gameserver::config::parse_cli_args;
use gameserver::handlers::{build_client_dispatch, build_internal_dispatch};
use gameserver::outbound::drain_outbound;
use gameserver::shutdown::wait_for_signal;

const EXIT_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    observability::init_logging();

    let config = parse_cli_args();
    tracing::info!("game server starting...");

    let engine = Arc::new(EngineLoop::new(
        config.to_tick_config(),
        build_client_dispatch(),
        build_internal_dispatch(),
    ));
    if let Err(e) = engine.start() {
        tracing::error!("failed to start simulation thread: {}", e);
        std::process::exit(1);
    }
    let outbound = tokio::spawn(drain_outbound(Arc::clone(&engine)));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut listeners = Vec::new();
    for channel in [Channel::Client, Channel::Internal] {
        let listener = config.listener(channel);
        let control_tx = engine.sender();
        let shutdown = shutdown_rx.clone();
        listeners.push(tokio::spawn(async move {
            if let Err(e) = run_listener(listener, control_tx, shutdown).await {
                tracing::error!(%channel, "listener error: {}", e);
            }
        }));
    }

    if let Err(e) = wait_for_signal().await {
        tracing::error!("failed to listen for shutdown signals: {}", e);
    }
    tracing::info!("shutdown signal received, stopping server...");

    let _ = shutdown_tx.send(true);
    for listener in listeners {
        let _ = listener.await;
    }

    engine.stop();
    match tokio::time::timeout(EXIT_TIMEOUT, outbound).await {
        Ok(Ok(prints)) => tracing::debug!(prints, "outbound drained"),
        Ok(Err(e)) => tracing::error!("outbound task failed: {}", e),
        Err(_) => tracing::warn!("simulation did not confirm exit in time"),
    }
    if let Err(e) = engine.join() {
        tracing::error!("simulation thread: {}", e);
    }

    tracing::info!("server stopped.");
}
