use anyhow::Result;
use sea_orm::Database;
use std::time::Duration;

use crate::schemas::AppState;

/// Initialize application state against the given database URL.
pub async fn initialize_app_state_with_url(database_url: &str) -> Result<AppState> {
    // Connect to database
    tracing::info!("Connecting to database: {}", database_url);
    let db = Database::connect(database_url).await?;

    Ok(AppState { db })
}

/// Cadence of the background expiry sweeper, from SWEEP_INTERVAL_SECS.
pub fn get_sweep_interval() -> Duration {
    let seconds = std::env::var("SWEEP_INTERVAL_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(300);
    Duration::from_secs(seconds)
}
