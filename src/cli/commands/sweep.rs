use anyhow::Result;
use chrono::Utc;
use sea_orm::Database;
use tracing::{debug, info, trace};

pub async fn run_sweep(database_url: &str) -> Result<()> {
    trace!("Entering run_sweep function");
    info!("Running one-shot expiry sweep");
    debug!("Database URL: {}", database_url);

    let db = Database::connect(database_url).await?;

    let reverted = engine::sweeper::sweep(&db, Utc::now().naive_utc()).await?;
    info!("Expiry sweep reverted {} deal(s)", reverted);

    Ok(())
}
