//! Lifecycle transitions for deals and product-deal bindings.
//!
//! Every public operation wraps its whole transition in one transaction:
//! revert-then-materialize is strictly ordered inside it, so no observer
//! ever sees a product with two active plan sets or none. The connection is
//! injected by the caller; this module holds no state of its own.

use chrono::NaiveDateTime;
use common::InstallmentTemplate;
use model::entities::{deal, deal_installment, product, product_deal, prelude::*};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
    TransactionTrait,
};
use tracing::{debug, info};

use crate::error::{EngineError, Result};
use crate::generator;
use crate::guard;
use crate::store::{self, PlanSource};

/// Everything needed to create or replace a deal.
#[derive(Debug, Clone)]
pub struct DealDraft {
    pub name: String,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    /// The single product the deal targets directly.
    pub product_id: i32,
    pub active: bool,
    /// Explicit installment templates. When `None`, the plan generator
    /// derives them from the product's price and category.
    pub installments: Option<Vec<InstallmentTemplate>>,
}

/// Everything needed to bind an additional product to an existing deal.
#[derive(Debug, Clone)]
pub struct BindingDraft {
    pub deal_id: i32,
    pub product_id: i32,
    pub active: bool,
    /// Per-product template overrides; generated from the product when
    /// `None`.
    pub installments: Option<Vec<InstallmentTemplate>>,
}

/// A deal together with its owned template rows, as returned by every
/// lifecycle operation.
pub type DealRecord = (deal::Model, Vec<deal_installment::Model>);

/// A binding together with its owned template rows.
pub type BindingRecord = (product_deal::Model, Vec<deal_installment::Model>);

/// Creates a deal. With `active = true` the deal's plans displace the
/// product's standard set before the transaction commits; a conflicting
/// active deal rejects the request outright and nothing is persisted.
pub async fn create_deal(db: &DatabaseConnection, draft: DealDraft) -> Result<DealRecord> {
    validate_window(&draft.name, draft.start_date, draft.end_date)?;

    let record = db
        .transaction::<_, DealRecord, EngineError>(move |txn| {
            Box::pin(async move {
                let product = find_product(txn, draft.product_id).await?;
                let templates = resolve_templates(txn, &product, draft.installments).await?;

                let deal_row = deal::ActiveModel {
                    name: Set(draft.name),
                    start_date: Set(draft.start_date),
                    end_date: Set(draft.end_date),
                    product_id: Set(product.id),
                    active: Set(false),
                    ..Default::default()
                }
                .insert(txn)
                .await?;
                let rows = insert_templates(txn, PlanSource::Deal(deal_row.id), &templates).await?;

                let deal_row = if draft.active {
                    activate_deal(txn, deal_row).await?
                } else {
                    deal_row
                };

                info!(
                    "Created deal {} ('{}') on product {}, active={}",
                    deal_row.id, deal_row.name, deal_row.product_id, deal_row.active
                );
                Ok((deal_row, rows))
            })
        })
        .await?;

    Ok(record)
}

/// Replaces a deal: reverts it first when it is active, swaps the template
/// rows wholesale, then applies the requested state.
pub async fn update_deal(db: &DatabaseConnection, deal_id: i32, draft: DealDraft) -> Result<DealRecord> {
    validate_window(&draft.name, draft.start_date, draft.end_date)?;

    let record = db
        .transaction::<_, DealRecord, EngineError>(move |txn| {
            Box::pin(async move {
                let deal_row = find_deal(txn, deal_id).await?;

                // Revert before anything else so the product never carries
                // stale deal plans alongside the new state.
                let deal_row = if deal_row.active {
                    deactivate_deal(txn, deal_row).await?
                } else {
                    deal_row
                };

                let product = find_product(txn, draft.product_id).await?;
                let templates = resolve_templates(txn, &product, draft.installments).await?;

                // Replace the template rows wholesale, no diffing.
                DealInstallment::delete_many()
                    .filter(deal_installment::Column::DealId.eq(deal_row.id))
                    .exec(txn)
                    .await?;

                let mut active_row: deal::ActiveModel = deal_row.into();
                active_row.name = Set(draft.name);
                active_row.start_date = Set(draft.start_date);
                active_row.end_date = Set(draft.end_date);
                active_row.product_id = Set(product.id);
                let deal_row = active_row.update(txn).await?;

                let rows = insert_templates(txn, PlanSource::Deal(deal_row.id), &templates).await?;

                let deal_row = if draft.active {
                    activate_deal(txn, deal_row).await?
                } else {
                    deal_row
                };

                info!("Updated deal {}, active={}", deal_row.id, deal_row.active);
                Ok((deal_row, rows))
            })
        })
        .await?;

    Ok(record)
}

/// Flips a deal's active flag. Toggling to the current state is a no-op,
/// not an error.
pub async fn toggle_deal(db: &DatabaseConnection, deal_id: i32, target_active: bool) -> Result<DealRecord> {
    let record = db
        .transaction::<_, DealRecord, EngineError>(move |txn| {
            Box::pin(async move {
                let deal_row = find_deal(txn, deal_id).await?;
                let rows = load_templates(txn, PlanSource::Deal(deal_row.id)).await?;

                if deal_row.active == target_active {
                    debug!(
                        "Deal {} already has active={}, nothing to do",
                        deal_row.id, target_active
                    );
                    return Ok((deal_row, rows));
                }

                let deal_row = if target_active {
                    activate_deal(txn, deal_row).await?
                } else {
                    deactivate_deal(txn, deal_row).await?
                };

                info!("Toggled deal {} to active={}", deal_row.id, deal_row.active);
                Ok((deal_row, rows))
            })
        })
        .await?;

    Ok(record)
}

/// Deletes a deal, reverting it first when active. Template rows and
/// product-deal bindings go with it via cascade.
pub async fn delete_deal(db: &DatabaseConnection, deal_id: i32) -> Result<()> {
    db.transaction::<_, (), EngineError>(move |txn| {
        Box::pin(async move {
            let deal_row = find_deal(txn, deal_id).await?;

            let deal_row = if deal_row.active {
                deactivate_deal(txn, deal_row).await?
            } else {
                deal_row
            };

            Deal::delete_by_id(deal_row.id).exec(txn).await?;
            info!("Deleted deal {}", deal_row.id);
            Ok(())
        })
    })
    .await?;

    Ok(())
}

/// Binds an additional product to a deal with its own template overrides.
pub async fn create_product_deal(db: &DatabaseConnection, draft: BindingDraft) -> Result<BindingRecord> {
    let record = db
        .transaction::<_, BindingRecord, EngineError>(move |txn| {
            Box::pin(async move {
                let deal_row = find_deal(txn, draft.deal_id).await?;
                let product = find_product(txn, draft.product_id).await?;

                let already_bound = ProductDeal::find()
                    .filter(product_deal::Column::DealId.eq(deal_row.id))
                    .filter(product_deal::Column::ProductId.eq(product.id))
                    .count(txn)
                    .await?
                    > 0;
                if already_bound {
                    return Err(EngineError::Validation(format!(
                        "deal {} already binds product {}",
                        deal_row.id, product.id
                    )));
                }

                let templates = resolve_templates(txn, &product, draft.installments).await?;

                // Live means the plans get materialized now; a binding of an
                // inactive deal waits for the deal to be activated.
                let live = draft.active && deal_row.active;
                if live {
                    guard::check_conflicts(txn, &[product.id], Some(deal_row.id)).await?;
                }

                let binding = product_deal::ActiveModel {
                    deal_id: Set(deal_row.id),
                    product_id: Set(product.id),
                    active: Set(draft.active),
                    ..Default::default()
                }
                .insert(txn)
                .await?;
                let rows =
                    insert_templates(txn, PlanSource::ProductDeal(binding.id), &templates).await?;

                if live {
                    store::materialize_deal_plans(
                        txn,
                        product.id,
                        PlanSource::ProductDeal(binding.id),
                        &templates,
                    )
                    .await
                    .map_err(as_activation)?;
                }
                refresh_product_flag(txn, product.id).await?;

                info!(
                    "Bound product {} to deal {} (binding {}), active={}",
                    product.id, deal_row.id, binding.id, binding.active
                );
                Ok((binding, rows))
            })
        })
        .await?;

    Ok(record)
}

/// Replaces a binding's template rows and active flag, reverting its
/// materialized plans first when it was live.
pub async fn update_product_deal(
    db: &DatabaseConnection,
    binding_id: i32,
    target_active: bool,
    installments: Option<Vec<InstallmentTemplate>>,
) -> Result<BindingRecord> {
    let record = db
        .transaction::<_, BindingRecord, EngineError>(move |txn| {
            Box::pin(async move {
                let binding = find_binding(txn, binding_id).await?;
                let deal_row = find_deal(txn, binding.deal_id).await?;
                let product = find_product(txn, binding.product_id).await?;

                if binding.active && deal_row.active {
                    store::revert_to_standard_plans(
                        txn,
                        binding.product_id,
                        PlanSource::ProductDeal(binding.id),
                    )
                    .await?;
                }

                let templates = resolve_templates(txn, &product, installments).await?;

                DealInstallment::delete_many()
                    .filter(deal_installment::Column::ProductDealId.eq(binding.id))
                    .exec(txn)
                    .await?;

                let mut active_row: product_deal::ActiveModel = binding.into();
                active_row.active = Set(target_active);
                let binding = active_row.update(txn).await?;

                let rows =
                    insert_templates(txn, PlanSource::ProductDeal(binding.id), &templates).await?;

                if binding.active && deal_row.active {
                    guard::check_conflicts(txn, &[product.id], Some(deal_row.id)).await?;
                    store::materialize_deal_plans(
                        txn,
                        product.id,
                        PlanSource::ProductDeal(binding.id),
                        &templates,
                    )
                    .await
                    .map_err(as_activation)?;
                }
                refresh_product_flag(txn, product.id).await?;

                info!("Updated binding {}, active={}", binding.id, binding.active);
                Ok((binding, rows))
            })
        })
        .await?;

    Ok(record)
}

/// Flips a binding's active flag. Materialization only happens while the
/// parent deal is active; otherwise only the flag changes.
pub async fn toggle_product_deal(
    db: &DatabaseConnection,
    binding_id: i32,
    target_active: bool,
) -> Result<BindingRecord> {
    let record = db
        .transaction::<_, BindingRecord, EngineError>(move |txn| {
            Box::pin(async move {
                let binding = find_binding(txn, binding_id).await?;
                let rows = load_templates(txn, PlanSource::ProductDeal(binding.id)).await?;

                if binding.active == target_active {
                    debug!(
                        "Binding {} already has active={}, nothing to do",
                        binding.id, target_active
                    );
                    return Ok((binding, rows));
                }

                let deal_row = find_deal(txn, binding.deal_id).await?;

                if target_active && deal_row.active {
                    guard::check_conflicts(txn, &[binding.product_id], Some(deal_row.id)).await?;
                }

                let product_id = binding.product_id;
                let mut active_row: product_deal::ActiveModel = binding.into();
                active_row.active = Set(target_active);
                let binding = active_row.update(txn).await?;

                if deal_row.active {
                    if target_active {
                        let templates = if rows.is_empty() {
                            let parent_rows =
                                load_templates(txn, PlanSource::Deal(deal_row.id)).await?;
                            templates_of(&parent_rows)
                        } else {
                            templates_of(&rows)
                        };
                        store::materialize_deal_plans(
                            txn,
                            product_id,
                            PlanSource::ProductDeal(binding.id),
                            &templates,
                        )
                        .await
                        .map_err(as_activation)?;
                    } else {
                        store::revert_to_standard_plans(
                            txn,
                            product_id,
                            PlanSource::ProductDeal(binding.id),
                        )
                        .await?;
                    }
                }
                refresh_product_flag(txn, product_id).await?;

                info!("Toggled binding {} to active={}", binding.id, binding.active);
                Ok((binding, rows))
            })
        })
        .await?;

    Ok(record)
}

/// Removes a binding, reverting its plans first when live.
pub async fn delete_product_deal(db: &DatabaseConnection, binding_id: i32) -> Result<()> {
    db.transaction::<_, (), EngineError>(move |txn| {
        Box::pin(async move {
            let binding = find_binding(txn, binding_id).await?;
            let parent_active = Deal::find_by_id(binding.deal_id)
                .one(txn)
                .await?
                .is_some_and(|d| d.active);

            if binding.active && parent_active {
                store::revert_to_standard_plans(
                    txn,
                    binding.product_id,
                    PlanSource::ProductDeal(binding.id),
                )
                .await?;
            }

            let product_id = binding.product_id;
            ProductDeal::delete_by_id(binding.id).exec(txn).await?;
            refresh_product_flag(txn, product_id).await?;

            info!("Deleted binding {}", binding_id);
            Ok(())
        })
    })
    .await?;

    Ok(())
}

/// Activates a deal and all of its active bindings: conflict check across
/// every targeted product, then materialization, then the product flags.
/// Storage failures past the guard surface as `ActivationFailed`.
pub(crate) async fn activate_deal<C: ConnectionTrait>(
    conn: &C,
    deal_row: deal::Model,
) -> Result<deal::Model> {
    let bindings = ProductDeal::find()
        .filter(product_deal::Column::DealId.eq(deal_row.id))
        .filter(product_deal::Column::Active.eq(true))
        .all(conn)
        .await?;

    let mut product_ids = vec![deal_row.product_id];
    product_ids.extend(bindings.iter().map(|b| b.product_id));
    guard::check_conflicts(conn, &product_ids, Some(deal_row.id)).await?;

    let mut active_row: deal::ActiveModel = deal_row.into();
    active_row.active = Set(true);
    let deal_row = active_row.update(conn).await.map_err(EngineError::ActivationFailed)?;

    let deal_templates = load_templates(conn, PlanSource::Deal(deal_row.id)).await?;
    store::materialize_deal_plans(
        conn,
        deal_row.product_id,
        PlanSource::Deal(deal_row.id),
        &templates_of(&deal_templates),
    )
    .await
    .map_err(as_activation)?;

    for binding in &bindings {
        let rows = load_templates(conn, PlanSource::ProductDeal(binding.id)).await?;
        let templates = if rows.is_empty() {
            // A binding without overrides rides on the deal's own templates.
            templates_of(&deal_templates)
        } else {
            templates_of(&rows)
        };
        store::materialize_deal_plans(
            conn,
            binding.product_id,
            PlanSource::ProductDeal(binding.id),
            &templates,
        )
        .await
        .map_err(as_activation)?;
    }

    for product_id in product_ids {
        refresh_product_flag(conn, product_id).await.map_err(as_activation)?;
    }

    Ok(deal_row)
}

/// Deactivates a deal and reverts every product it touched back to its
/// standard plans. Shared by manual toggles, updates, deletions and the
/// expiry sweeper.
pub(crate) async fn deactivate_deal<C: ConnectionTrait>(
    conn: &C,
    deal_row: deal::Model,
) -> Result<deal::Model> {
    let bindings = ProductDeal::find()
        .filter(product_deal::Column::DealId.eq(deal_row.id))
        .filter(product_deal::Column::Active.eq(true))
        .all(conn)
        .await?;

    let mut active_row: deal::ActiveModel = deal_row.into();
    active_row.active = Set(false);
    let deal_row = active_row.update(conn).await?;

    store::revert_to_standard_plans(conn, deal_row.product_id, PlanSource::Deal(deal_row.id))
        .await?;
    for binding in &bindings {
        store::revert_to_standard_plans(
            conn,
            binding.product_id,
            PlanSource::ProductDeal(binding.id),
        )
        .await?;
    }

    refresh_product_flag(conn, deal_row.product_id).await?;
    for binding in &bindings {
        refresh_product_flag(conn, binding.product_id).await?;
    }

    Ok(deal_row)
}

/// Recomputes a product's `has_active_deal` flag: true iff an active deal
/// targets it directly or an active binding with an active parent deal
/// references it.
pub(crate) async fn refresh_product_flag<C: ConnectionTrait>(
    conn: &C,
    product_id: i32,
) -> Result<()> {
    let Some(product) = Product::find_by_id(product_id).one(conn).await? else {
        return Ok(());
    };

    let direct = Deal::find()
        .filter(deal::Column::ProductId.eq(product_id))
        .filter(deal::Column::Active.eq(true))
        .count(conn)
        .await?;
    let bound = ProductDeal::find()
        .filter(product_deal::Column::ProductId.eq(product_id))
        .filter(product_deal::Column::Active.eq(true))
        .join(JoinType::InnerJoin, product_deal::Relation::Deal.def())
        .filter(deal::Column::Active.eq(true))
        .count(conn)
        .await?;

    let has_active_deal = direct + bound > 0;
    if product.has_active_deal != has_active_deal {
        let mut active_row: product::ActiveModel = product.into();
        active_row.has_active_deal = Set(has_active_deal);
        active_row.update(conn).await?;
    }

    Ok(())
}

/// Validates explicit templates or derives them from the product's category
/// and price.
async fn resolve_templates<C: ConnectionTrait>(
    conn: &C,
    product: &product::Model,
    explicit: Option<Vec<InstallmentTemplate>>,
) -> Result<Vec<InstallmentTemplate>> {
    match explicit {
        Some(templates) => {
            validate_templates(&templates)?;
            Ok(templates)
        }
        None => {
            let category = Category::find_by_id(product.category_id)
                .one(conn)
                .await?
                .ok_or_else(|| {
                    EngineError::NotFound(format!("Category {}", product.category_id))
                })?;
            generator::generate(&category.name, product.price)
        }
    }
}

async fn insert_templates<C: ConnectionTrait>(
    conn: &C,
    source: PlanSource,
    templates: &[InstallmentTemplate],
) -> Result<Vec<deal_installment::Model>> {
    let (deal_id, product_deal_id) = match source {
        PlanSource::Deal(id) => (Some(id), None),
        PlanSource::ProductDeal(id) => (None, Some(id)),
    };

    let mut rows = Vec::with_capacity(templates.len());
    for template in templates {
        let row = deal_installment::ActiveModel {
            deal_id: Set(deal_id),
            product_deal_id: Set(product_deal_id),
            term_months: Set(template.term_months),
            advance_amount: Set(template.advance_amount),
            monthly_amount: Set(template.monthly_amount),
            total_price: Set(template.total_price),
            ..Default::default()
        }
        .insert(conn)
        .await?;
        rows.push(row);
    }
    Ok(rows)
}

pub(crate) async fn load_templates<C: ConnectionTrait>(
    conn: &C,
    source: PlanSource,
) -> Result<Vec<deal_installment::Model>> {
    let query = match source {
        PlanSource::Deal(id) => {
            DealInstallment::find().filter(deal_installment::Column::DealId.eq(id))
        }
        PlanSource::ProductDeal(id) => {
            DealInstallment::find().filter(deal_installment::Column::ProductDealId.eq(id))
        }
    };
    Ok(query
        .order_by_asc(deal_installment::Column::TermMonths)
        .all(conn)
        .await?)
}

fn templates_of(rows: &[deal_installment::Model]) -> Vec<InstallmentTemplate> {
    rows.iter()
        .map(|row| {
            InstallmentTemplate::new(
                row.term_months,
                row.advance_amount,
                row.monthly_amount,
                row.total_price,
            )
        })
        .collect()
}

fn validate_window(name: &str, start: NaiveDateTime, end: NaiveDateTime) -> Result<()> {
    if name.trim().is_empty() {
        return Err(EngineError::Validation("deal name must not be empty".into()));
    }
    if end <= start {
        return Err(EngineError::Validation(format!(
            "deal end date {end} must be after start date {start}"
        )));
    }
    Ok(())
}

fn validate_templates(templates: &[InstallmentTemplate]) -> Result<()> {
    if templates.is_empty() {
        return Err(EngineError::Validation(
            "at least one installment template is required".into(),
        ));
    }
    for template in templates {
        if template.term_months <= 0 {
            return Err(EngineError::Validation(format!(
                "term length must be positive, got {}",
                template.term_months
            )));
        }
        if template.advance_amount < Decimal::ZERO
            || template.monthly_amount < Decimal::ZERO
            || template.total_price < Decimal::ZERO
        {
            return Err(EngineError::Validation(format!(
                "installment amounts must be non-negative for the {}-month term",
                template.term_months
            )));
        }
    }
    Ok(())
}

/// Past the conflict guard, storage failures are activation failures: the
/// transaction rolls back and the caller may retry.
fn as_activation(err: EngineError) -> EngineError {
    match err {
        EngineError::Database(db_err) => EngineError::ActivationFailed(db_err),
        other => other,
    }
}

async fn find_deal<C: ConnectionTrait>(conn: &C, deal_id: i32) -> Result<deal::Model> {
    Deal::find_by_id(deal_id)
        .one(conn)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("Deal {deal_id}")))
}

async fn find_binding<C: ConnectionTrait>(conn: &C, binding_id: i32) -> Result<product_deal::Model> {
    ProductDeal::find_by_id(binding_id)
        .one(conn)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("Product deal {binding_id}")))
}

async fn find_product<C: ConnectionTrait>(conn: &C, product_id: i32) -> Result<product::Model> {
    Product::find_by_id(product_id)
        .one(conn)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("Product {product_id}")))
}
