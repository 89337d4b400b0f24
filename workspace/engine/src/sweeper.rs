//! Reconciliation of deals whose window has closed.
//!
//! The sweep runs as its own schedulable unit, decoupled from any read
//! path. Each expired deal is reverted in its own transaction using the
//! same deactivation path as a manual toggle, so a sweep racing an admin
//! action converges instead of double-reverting.

use chrono::{NaiveDateTime, Utc};
use model::entities::{deal, prelude::*};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait};
use tracing::{debug, error, info};

use crate::error::{EngineError, Result};
use crate::lifecycle;

/// Deactivates every deal that is still marked active past its end date and
/// reverts the affected products to their standard plans. Returns how many
/// deals were reverted.
///
/// A deal that fails to revert is logged and left for the next sweep; the
/// operation is idempotent, so a second call right after finds nothing to
/// do. The sweeper never moves a deal towards active.
pub async fn sweep(db: &DatabaseConnection, now: NaiveDateTime) -> Result<u64> {
    let expired = Deal::find()
        .filter(deal::Column::Active.eq(true))
        .filter(deal::Column::EndDate.lt(now))
        .all(db)
        .await?;

    if expired.is_empty() {
        debug!("No expired deals at {}", now);
        return Ok(0);
    }

    let mut reverted = 0u64;
    for deal_row in expired {
        let deal_id = deal_row.id;
        let outcome = db
            .transaction::<_, bool, EngineError>(move |txn| {
                Box::pin(async move {
                    // Re-read inside the transaction: a manual deactivate may
                    // have won the race since the listing above.
                    let Some(current) = Deal::find_by_id(deal_id).one(txn).await? else {
                        return Ok(false);
                    };
                    if !current.active {
                        return Ok(false);
                    }

                    lifecycle::deactivate_deal(txn, current).await?;
                    Ok(true)
                })
            })
            .await
            .map_err(EngineError::from);

        match outcome {
            Ok(true) => {
                info!("Expired deal {} reverted to standard plans", deal_id);
                reverted += 1;
            }
            Ok(false) => {
                debug!("Expired deal {} was already handled", deal_id);
            }
            Err(err) => {
                // Left active; the next sweep retries it.
                error!("Failed to revert expired deal {}: {}", deal_id, err);
            }
        }
    }

    Ok(reverted)
}

/// Runs [`sweep`] forever on a fixed cadence. Spawned by the server as an
/// independent background task.
pub async fn run(db: DatabaseConnection, period: std::time::Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    info!("Expiry sweeper running every {:?}", period);
    loop {
        ticker.tick().await;
        let now = Utc::now().naive_utc();
        match sweep(&db, now).await {
            Ok(0) => {}
            Ok(count) => info!("Expiry sweep reverted {} deal(s)", count),
            Err(err) => error!("Expiry sweep failed: {}", err),
        }
    }
}
