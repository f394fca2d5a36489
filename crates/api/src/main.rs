//! Eventline API binary: the REST surface for C2/C3/C4/C7 (ingestion
//! upload, event review, calendar selection, auth).

use eventline_shared::bootstrap;
use tracing::error;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bootstrap::init_env();
    let _guard = bootstrap::init_tracing("api");

    let config = api::config::Config::from_env()?;
    let pool = bootstrap::init_db(&config.core).await?;

    let state = api::AppState { pool, core: config.core.clone() };

    if let Err(e) = api::run_api(state, &config.host, config.port, &config.core.cors_origins).await {
        error!("API server exited with error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
