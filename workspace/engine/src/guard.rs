//! Cross-deal exclusivity: a product is claimed by at most one active deal.

use model::entities::{deal, product_deal, prelude::*};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, JoinType, PaginatorTrait, QueryFilter, QuerySelect,
    RelationTrait,
};
use tracing::{debug, warn};

use crate::error::{EngineError, Result};

/// Checks that none of the given products is already claimed by another
/// active deal, either directly or through an active product-deal binding
/// with an active parent deal.
///
/// `exclude_deal_id` names the candidate's own deal so a deal re-activating
/// itself (or adding another binding of its own) is not reported as its own
/// conflict. Fails fast with the first conflicting product.
pub async fn check_conflicts<C: ConnectionTrait>(
    conn: &C,
    product_ids: &[i32],
    exclude_deal_id: Option<i32>,
) -> Result<()> {
    for &product_id in product_ids {
        let mut direct = Deal::find()
            .filter(deal::Column::ProductId.eq(product_id))
            .filter(deal::Column::Active.eq(true));
        if let Some(own_id) = exclude_deal_id {
            direct = direct.filter(deal::Column::Id.ne(own_id));
        }
        if direct.count(conn).await? > 0 {
            warn!(
                "Deal conflict: product {} already has an active deal",
                product_id
            );
            return Err(EngineError::DealConflict { product_id });
        }

        let mut bound = ProductDeal::find()
            .filter(product_deal::Column::ProductId.eq(product_id))
            .filter(product_deal::Column::Active.eq(true))
            .join(JoinType::InnerJoin, product_deal::Relation::Deal.def())
            .filter(deal::Column::Active.eq(true));
        if let Some(own_id) = exclude_deal_id {
            bound = bound.filter(product_deal::Column::DealId.ne(own_id));
        }
        if bound.count(conn).await? > 0 {
            warn!(
                "Deal conflict: product {} is bound to another active deal",
                product_id
            );
            return Err(EngineError::DealConflict { product_id });
        }
    }

    debug!(
        "No deal conflicts across {} product(s) (excluding deal {:?})",
        product_ids.len(),
        exclude_deal_id
    );
    Ok(())
}
