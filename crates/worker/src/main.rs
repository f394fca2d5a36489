//! Eventline worker binary: background job consumer for C5/C6.

use eventline_shared::bootstrap;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bootstrap::init_env();
    let _guard = bootstrap::init_tracing("worker");

    let config = eventline_worker::Config::from_env()?;
    let pool = bootstrap::init_db(&config.core).await?;

    info!("Eventline worker starting");

    let shutdown = CancellationToken::new();
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            shutdown_signal.cancel();
        }
    });

    if let Err(e) = eventline_worker::run_worker(pool, config, Some(shutdown)).await {
        error!("Worker exited with error: {}", e);
        return Err(e);
    }

    Ok(())
}
