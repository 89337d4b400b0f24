//! Swap operations over a product's materialized installment plan rows.
//!
//! These are the only code paths that write `installment_plans.active` or
//! insert/delete plan rows. Every function is generic over
//! [`ConnectionTrait`] so the lifecycle manager can compose them into a
//! single transaction.

use common::InstallmentTemplate;
use model::entities::{installment_plan, prelude::*};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, Set,
};
use tracing::{debug, warn};

use crate::error::Result;

/// Identifies the deal-side owner of a materialized plan set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanSource {
    /// Plans materialized from a deal's own template rows.
    Deal(i32),
    /// Plans materialized from a product-deal binding's template rows.
    ProductDeal(i32),
}

impl PlanSource {
    fn column(self) -> installment_plan::Column {
        match self {
            PlanSource::Deal(_) => installment_plan::Column::DealId,
            PlanSource::ProductDeal(_) => installment_plan::Column::ProductDealId,
        }
    }

    fn id(self) -> i32 {
        match self {
            PlanSource::Deal(id) | PlanSource::ProductDeal(id) => id,
        }
    }
}

/// Installs a deal's plan set as the product's active plans.
///
/// Any rows a previous run left for the same source are dropped first, so a
/// re-run converges to the same state. The standard set is deactivated, not
/// deleted. A missing product makes this a no-op: the caller may be racing a
/// product deletion.
pub async fn materialize_deal_plans<C: ConnectionTrait>(
    conn: &C,
    product_id: i32,
    source: PlanSource,
    templates: &[InstallmentTemplate],
) -> Result<()> {
    if Product::find_by_id(product_id).one(conn).await?.is_none() {
        debug!(
            "Skipping plan materialization, product {} no longer exists",
            product_id
        );
        return Ok(());
    }

    // Drop any leftover rows from an earlier materialization of this source.
    InstallmentPlan::delete_many()
        .filter(installment_plan::Column::ProductId.eq(product_id))
        .filter(source.column().eq(source.id()))
        .exec(conn)
        .await?;

    // Deactivate the standard set before the new one becomes visible.
    InstallmentPlan::update_many()
        .col_expr(installment_plan::Column::Active, Expr::value(false))
        .filter(installment_plan::Column::ProductId.eq(product_id))
        .filter(installment_plan::Column::DealId.is_null())
        .filter(installment_plan::Column::ProductDealId.is_null())
        .exec(conn)
        .await?;

    let (deal_id, product_deal_id) = match source {
        PlanSource::Deal(id) => (Some(id), None),
        PlanSource::ProductDeal(id) => (None, Some(id)),
    };

    for template in templates {
        installment_plan::ActiveModel {
            product_id: Set(product_id),
            term_months: Set(template.term_months),
            advance_amount: Set(template.advance_amount),
            monthly_amount: Set(template.monthly_amount),
            total_price: Set(template.total_price),
            active: Set(true),
            deal_id: Set(deal_id),
            product_deal_id: Set(product_deal_id),
            ..Default::default()
        }
        .insert(conn)
        .await?;
    }

    debug!(
        "Materialized {} plans for product {} from {:?}",
        templates.len(),
        product_id,
        source
    );
    Ok(())
}

/// Removes a deal's materialized plans and reactivates the standard set.
///
/// Counterpart of [`materialize_deal_plans`]; a second call for the same
/// source finds nothing to delete and leaves the reactivated standard set
/// as-is, so racing reverts are harmless.
pub async fn revert_to_standard_plans<C: ConnectionTrait>(
    conn: &C,
    product_id: i32,
    source: PlanSource,
) -> Result<()> {
    if Product::find_by_id(product_id).one(conn).await?.is_none() {
        debug!(
            "Skipping plan reversion, product {} no longer exists",
            product_id
        );
        return Ok(());
    }

    InstallmentPlan::delete_many()
        .filter(installment_plan::Column::ProductId.eq(product_id))
        .filter(source.column().eq(source.id()))
        .exec(conn)
        .await?;

    InstallmentPlan::update_many()
        .col_expr(installment_plan::Column::Active, Expr::value(true))
        .filter(installment_plan::Column::ProductId.eq(product_id))
        .filter(installment_plan::Column::DealId.is_null())
        .filter(installment_plan::Column::ProductDealId.is_null())
        .exec(conn)
        .await?;

    let standard_count = InstallmentPlan::find()
        .filter(installment_plan::Column::ProductId.eq(product_id))
        .filter(installment_plan::Column::DealId.is_null())
        .filter(installment_plan::Column::ProductDealId.is_null())
        .count(conn)
        .await?;
    if standard_count == 0 {
        // Reportable inconsistency: the product now has zero active plans.
        warn!(
            "Product {} has no standard plans to restore after reverting {:?}",
            product_id, source
        );
    }

    Ok(())
}

/// Replaces a product's standard plan set.
///
/// Used by the catalog when a product is created or its price changes. The
/// new rows inherit the activity state of the slot: they are created
/// inactive while a deal-sourced set is active, so a running promotion is
/// not disturbed.
pub async fn set_standard_plans<C: ConnectionTrait>(
    conn: &C,
    product_id: i32,
    templates: &[InstallmentTemplate],
) -> Result<()> {
    let deal_set_active = InstallmentPlan::find()
        .filter(installment_plan::Column::ProductId.eq(product_id))
        .filter(installment_plan::Column::Active.eq(true))
        .filter(
            Condition::any()
                .add(installment_plan::Column::DealId.is_not_null())
                .add(installment_plan::Column::ProductDealId.is_not_null()),
        )
        .count(conn)
        .await?
        > 0;

    InstallmentPlan::delete_many()
        .filter(installment_plan::Column::ProductId.eq(product_id))
        .filter(installment_plan::Column::DealId.is_null())
        .filter(installment_plan::Column::ProductDealId.is_null())
        .exec(conn)
        .await?;

    for template in templates {
        installment_plan::ActiveModel {
            product_id: Set(product_id),
            term_months: Set(template.term_months),
            advance_amount: Set(template.advance_amount),
            monthly_amount: Set(template.monthly_amount),
            total_price: Set(template.total_price),
            active: Set(!deal_set_active),
            deal_id: Set(None),
            product_deal_id: Set(None),
            ..Default::default()
        }
        .insert(conn)
        .await?;
    }

    Ok(())
}
