//! DB-backed tests for the lifecycle manager, plan store, conflict guard
//! and expiry sweeper, run against an in-memory SQLite database.

use chrono::{NaiveDate, NaiveDateTime};
use common::InstallmentTemplate;
use migration::{Migrator, MigratorTrait};
use model::entities::{category, deal_installment, installment_plan, product, prelude::*};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, EntityTrait,
    QueryFilter, Set,
};

use crate::error::EngineError;
use crate::lifecycle::{self, BindingDraft, DealDraft};
use crate::store::{self, PlanSource};
use crate::{generator, sweeper};

async fn setup_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");

    db.execute_unprepared("PRAGMA foreign_keys = ON;")
        .await
        .expect("Failed to enable foreign keys");

    Migrator::up(&db, None).await.expect("Migrations failed");
    db
}

/// Inserts a product under the given category (created on first use) and
/// materializes its standard plans the way product creation does, when the
/// bracket matches.
async fn seed_product(
    db: &DatabaseConnection,
    category_name: &str,
    product_name: &str,
    price: i64,
) -> product::Model {
    let category_row = match Category::find()
        .filter(category::Column::Name.eq(category_name))
        .one(db)
        .await
        .unwrap()
    {
        Some(existing) => existing,
        None => category::ActiveModel {
            name: Set(category_name.to_string()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap(),
    };

    let product_row = product::ActiveModel {
        name: Set(product_name.to_string()),
        category_id: Set(category_row.id),
        price: Set(Decimal::new(price, 0)),
        has_active_deal: Set(false),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();

    if let Ok(templates) = generator::generate(category_name, product_row.price) {
        store::set_standard_plans(db, product_row.id, &templates)
            .await
            .unwrap();
    }

    product_row
}

fn at(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn draft(product_id: i32, active: bool) -> DealDraft {
    DealDraft {
        name: "Summer sale".to_string(),
        start_date: at(2024, 6, 1),
        end_date: at(2024, 6, 15),
        product_id,
        active,
        installments: None,
    }
}

fn template(term_months: i32) -> InstallmentTemplate {
    InstallmentTemplate::new(
        term_months,
        Decimal::new(5_000, 0),
        Decimal::new(4_000, 0),
        Decimal::new(5_000 + 4_000 * term_months as i64, 0),
    )
}

async fn plans_of(db: &DatabaseConnection, product_id: i32) -> Vec<installment_plan::Model> {
    InstallmentPlan::find()
        .filter(installment_plan::Column::ProductId.eq(product_id))
        .all(db)
        .await
        .unwrap()
}

/// Asserts the core invariant: either the standard set is fully active and
/// nothing deal-sourced is, or exactly one deal-sourced set is active and
/// the standard set is fully inactive.
async fn assert_single_active_set(db: &DatabaseConnection, product_id: i32) {
    let plans = plans_of(db, product_id).await;
    let standard: Vec<_> = plans
        .iter()
        .filter(|p| p.deal_id.is_none() && p.product_deal_id.is_none())
        .collect();
    let deal_sourced: Vec<_> = plans
        .iter()
        .filter(|p| p.deal_id.is_some() || p.product_deal_id.is_some())
        .collect();

    let active_sources: std::collections::HashSet<(Option<i32>, Option<i32>)> = deal_sourced
        .iter()
        .filter(|p| p.active)
        .map(|p| (p.deal_id, p.product_deal_id))
        .collect();

    if active_sources.is_empty() {
        assert!(
            standard.iter().all(|p| p.active),
            "standard plans must be active when no deal set is"
        );
    } else {
        assert_eq!(active_sources.len(), 1, "at most one deal set may be active");
        assert!(
            standard.iter().all(|p| !p.active),
            "standard plans must be inactive while a deal set is active"
        );
    }
}

#[tokio::test]
async fn create_active_deal_swaps_plan_sets() {
    let db = setup_db().await;
    let phone = seed_product(&db, "mobiles", "Galaxy A16", 40_000).await;

    let before = plans_of(&db, phone.id).await;
    assert_eq!(before.len(), 4);
    assert!(before.iter().all(|p| p.active && p.deal_id.is_none()));

    let (deal_row, rows) = lifecycle::create_deal(&db, draft(phone.id, true))
        .await
        .unwrap();
    assert!(deal_row.active);
    assert_eq!(rows.len(), 4, "generated templates follow the budget bracket");

    let after = plans_of(&db, phone.id).await;
    let deal_plans: Vec<_> = after
        .iter()
        .filter(|p| p.deal_id == Some(deal_row.id))
        .collect();
    assert_eq!(deal_plans.len(), 4);
    assert!(deal_plans.iter().all(|p| p.active));
    assert!(
        after
            .iter()
            .filter(|p| p.deal_id.is_none())
            .all(|p| !p.active),
        "standard plans are deactivated, not deleted"
    );
    assert_single_active_set(&db, phone.id).await;

    let product_row = Product::find_by_id(phone.id).one(&db).await.unwrap().unwrap();
    assert!(product_row.has_active_deal);
}

#[tokio::test]
async fn create_inactive_deal_mutates_no_plans() {
    let db = setup_db().await;
    let phone = seed_product(&db, "mobiles", "Redmi 13", 30_000).await;

    let (deal_row, rows) = lifecycle::create_deal(&db, draft(phone.id, false))
        .await
        .unwrap();
    assert!(!deal_row.active);
    assert_eq!(rows.len(), 4, "templates are persisted even while inactive");

    let plans = plans_of(&db, phone.id).await;
    assert!(plans.iter().all(|p| p.active && p.deal_id.is_none()));

    let product_row = Product::find_by_id(phone.id).one(&db).await.unwrap().unwrap();
    assert!(!product_row.has_active_deal);
}

#[tokio::test]
async fn explicit_templates_bypass_the_generator() {
    let db = setup_db().await;
    // "shoes" at 8,000 has no bracket, so only explicit templates work.
    let sneaker = seed_product(&db, "shoes", "Runner Pro", 8_000).await;
    assert!(plans_of(&db, sneaker.id).await.is_empty());

    let mut deal_draft = draft(sneaker.id, true);
    deal_draft.installments = Some(vec![template(3), template(6)]);

    let (deal_row, rows) = lifecycle::create_deal(&db, deal_draft).await.unwrap();
    assert_eq!(rows.len(), 2);

    let plans = plans_of(&db, sneaker.id).await;
    assert_eq!(plans.len(), 2);
    assert!(plans.iter().all(|p| p.active && p.deal_id == Some(deal_row.id)));
}

#[tokio::test]
async fn generator_failure_rejects_the_deal() {
    let db = setup_db().await;
    let sneaker = seed_product(&db, "shoes", "Walker", 40_000).await;

    let err = lifecycle::create_deal(&db, draft(sneaker.id, true))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NoPlanAvailable { .. }));

    // Nothing persisted: the transaction rolled back.
    assert_eq!(Deal::find().all(&db).await.unwrap().len(), 0);
}

#[tokio::test]
async fn invalid_window_is_rejected_before_any_write() {
    let db = setup_db().await;
    let phone = seed_product(&db, "mobiles", "Pixel 8", 90_000).await;

    let mut bad = draft(phone.id, true);
    bad.end_date = bad.start_date;
    assert!(matches!(
        lifecycle::create_deal(&db, bad).await.unwrap_err(),
        EngineError::Validation(_)
    ));

    let mut unnamed = draft(phone.id, true);
    unnamed.name = "  ".to_string();
    assert!(matches!(
        lifecycle::create_deal(&db, unnamed).await.unwrap_err(),
        EngineError::Validation(_)
    ));

    assert_eq!(Deal::find().all(&db).await.unwrap().len(), 0);
}

#[tokio::test]
async fn second_deal_on_same_product_conflicts_until_first_deactivates() {
    let db = setup_db().await;
    let phone = seed_product(&db, "mobiles", "Galaxy S24", 120_000).await;

    let (first, _) = lifecycle::create_deal(&db, draft(phone.id, true))
        .await
        .unwrap();

    let err = lifecycle::create_deal(&db, draft(phone.id, true))
        .await
        .unwrap_err();
    match err {
        EngineError::DealConflict { product_id } => assert_eq!(product_id, phone.id),
        other => panic!("expected DealConflict, got {other:?}"),
    }
    assert_eq!(
        Deal::find().all(&db).await.unwrap().len(),
        1,
        "the conflicting deal is not persisted"
    );

    lifecycle::toggle_deal(&db, first.id, false).await.unwrap();

    let (second, _) = lifecycle::create_deal(&db, draft(phone.id, true))
        .await
        .unwrap();
    assert!(second.active);
    assert_single_active_set(&db, phone.id).await;
}

#[tokio::test]
async fn toggle_to_current_state_is_a_noop() {
    let db = setup_db().await;
    let phone = seed_product(&db, "mobiles", "Nothing 2a", 45_000).await;

    let (deal_row, _) = lifecycle::create_deal(&db, draft(phone.id, true))
        .await
        .unwrap();
    let before: Vec<i32> = plans_of(&db, phone.id).await.iter().map(|p| p.id).collect();

    let (toggled, _) = lifecycle::toggle_deal(&db, deal_row.id, true).await.unwrap();
    assert!(toggled.active);

    let after: Vec<i32> = plans_of(&db, phone.id).await.iter().map(|p| p.id).collect();
    assert_eq!(before, after, "a double-activation must not re-materialize");
}

#[tokio::test]
async fn toggle_off_restores_standard_plans() {
    let db = setup_db().await;
    let phone = seed_product(&db, "mobiles", "Moto G", 25_000).await;

    let (deal_row, _) = lifecycle::create_deal(&db, draft(phone.id, true))
        .await
        .unwrap();
    lifecycle::toggle_deal(&db, deal_row.id, false).await.unwrap();

    let plans = plans_of(&db, phone.id).await;
    assert_eq!(plans.len(), 4);
    assert!(plans.iter().all(|p| p.active && p.deal_id.is_none()));

    let product_row = Product::find_by_id(phone.id).one(&db).await.unwrap().unwrap();
    assert!(!product_row.has_active_deal);

    // Template rows survive deactivation for the next activation.
    let templates = DealInstallment::find()
        .filter(deal_installment::Column::DealId.eq(deal_row.id))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(templates.len(), 4);
}

#[tokio::test]
async fn update_replaces_templates_wholesale() {
    let db = setup_db().await;
    let phone = seed_product(&db, "mobiles", "iPhone 15", 120_000).await;

    let (deal_row, rows) = lifecycle::create_deal(&db, draft(phone.id, true))
        .await
        .unwrap();
    assert_eq!(rows.len(), 5);

    let mut new_draft = draft(phone.id, true);
    new_draft.name = "Extended summer sale".to_string();
    new_draft.installments = Some(vec![template(12)]);

    let (updated, new_rows) = lifecycle::update_deal(&db, deal_row.id, new_draft)
        .await
        .unwrap();
    assert_eq!(updated.name, "Extended summer sale");
    assert_eq!(new_rows.len(), 1);

    let templates = DealInstallment::find()
        .filter(deal_installment::Column::DealId.eq(deal_row.id))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(templates.len(), 1, "old template rows are gone");

    let active: Vec<_> = plans_of(&db, phone.id)
        .await
        .into_iter()
        .filter(|p| p.active)
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].deal_id, Some(deal_row.id));
    assert_single_active_set(&db, phone.id).await;
}

#[tokio::test]
async fn deactivate_then_delete_matches_direct_delete() {
    let db = setup_db().await;
    let phone_a = seed_product(&db, "mobiles", "Phone A", 40_000).await;
    let phone_b = seed_product(&db, "mobiles", "Phone B", 40_000).await;

    let (deal_a, _) = lifecycle::create_deal(&db, draft(phone_a.id, true))
        .await
        .unwrap();
    let (deal_b, _) = lifecycle::create_deal(&db, draft(phone_b.id, true))
        .await
        .unwrap();

    // Path one: deactivate, then delete.
    lifecycle::toggle_deal(&db, deal_a.id, false).await.unwrap();
    lifecycle::delete_deal(&db, deal_a.id).await.unwrap();

    // Path two: delete while active.
    lifecycle::delete_deal(&db, deal_b.id).await.unwrap();

    for product_row in [&phone_a, &phone_b] {
        let plans = plans_of(&db, product_row.id).await;
        assert_eq!(plans.len(), 4);
        assert!(plans.iter().all(|p| p.active && p.deal_id.is_none()));

        let refreshed = Product::find_by_id(product_row.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert!(!refreshed.has_active_deal);
    }

    assert!(DealInstallment::find().all(&db).await.unwrap().is_empty());
    assert!(Deal::find().all(&db).await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_deal_surfaces_not_found() {
    let db = setup_db().await;

    assert!(matches!(
        lifecycle::toggle_deal(&db, 9_999, true).await.unwrap_err(),
        EngineError::NotFound(_)
    ));
    assert!(matches!(
        lifecycle::delete_deal(&db, 9_999).await.unwrap_err(),
        EngineError::NotFound(_)
    ));
}

#[tokio::test]
async fn binding_materializes_and_reverts_its_own_product() {
    let db = setup_db().await;
    let phone = seed_product(&db, "mobiles", "Host phone", 40_000).await;
    let tablet = seed_product(&db, "mobiles", "Tab S9", 45_000).await;

    let (deal_row, _) = lifecycle::create_deal(&db, draft(phone.id, true))
        .await
        .unwrap();

    let (binding, rows) = lifecycle::create_product_deal(
        &db,
        BindingDraft {
            deal_id: deal_row.id,
            product_id: tablet.id,
            active: true,
            installments: Some(vec![template(6)]),
        },
    )
    .await
    .unwrap();
    assert_eq!(rows.len(), 1);

    let tablet_plans = plans_of(&db, tablet.id).await;
    let materialized: Vec<_> = tablet_plans
        .iter()
        .filter(|p| p.product_deal_id == Some(binding.id))
        .collect();
    assert_eq!(materialized.len(), 1);
    assert!(materialized.iter().all(|p| p.active));
    assert_single_active_set(&db, tablet.id).await;

    let refreshed = Product::find_by_id(tablet.id).one(&db).await.unwrap().unwrap();
    assert!(refreshed.has_active_deal);

    // A second binding of the same pair violates uniqueness.
    let err = lifecycle::create_product_deal(
        &db,
        BindingDraft {
            deal_id: deal_row.id,
            product_id: tablet.id,
            active: false,
            installments: Some(vec![template(3)]),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    lifecycle::delete_product_deal(&db, binding.id).await.unwrap();

    let tablet_plans = plans_of(&db, tablet.id).await;
    assert_eq!(tablet_plans.len(), 4);
    assert!(tablet_plans.iter().all(|p| p.active && p.product_deal_id.is_none()));

    let refreshed = Product::find_by_id(tablet.id).one(&db).await.unwrap().unwrap();
    assert!(!refreshed.has_active_deal);
}

#[tokio::test]
async fn binding_conflicts_with_foreign_active_deal() {
    let db = setup_db().await;
    let phone = seed_product(&db, "mobiles", "Claimed phone", 40_000).await;
    let other = seed_product(&db, "mobiles", "Other phone", 40_000).await;

    let (_owner, _) = lifecycle::create_deal(&db, draft(phone.id, true))
        .await
        .unwrap();
    let (foreign, _) = lifecycle::create_deal(&db, draft(other.id, true))
        .await
        .unwrap();

    let err = lifecycle::create_product_deal(
        &db,
        BindingDraft {
            deal_id: foreign.id,
            product_id: phone.id,
            active: true,
            installments: Some(vec![template(3)]),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, EngineError::DealConflict { product_id } if product_id == phone.id));

    assert!(ProductDeal::find().all(&db).await.unwrap().is_empty());
}

#[tokio::test]
async fn toggling_binding_follows_parent_activity() {
    let db = setup_db().await;
    let phone = seed_product(&db, "mobiles", "Main phone", 40_000).await;
    let tablet = seed_product(&db, "mobiles", "Side tablet", 45_000).await;

    let (deal_row, _) = lifecycle::create_deal(&db, draft(phone.id, true))
        .await
        .unwrap();
    let (binding, _) = lifecycle::create_product_deal(
        &db,
        BindingDraft {
            deal_id: deal_row.id,
            product_id: tablet.id,
            active: true,
            installments: Some(vec![template(6)]),
        },
    )
    .await
    .unwrap();

    let (binding, _) = lifecycle::toggle_product_deal(&db, binding.id, false)
        .await
        .unwrap();
    assert!(!binding.active);
    let plans = plans_of(&db, tablet.id).await;
    assert!(plans.iter().all(|p| p.active && p.product_deal_id.is_none()));

    let (binding, _) = lifecycle::toggle_product_deal(&db, binding.id, true)
        .await
        .unwrap();
    assert!(binding.active);
    assert_single_active_set(&db, tablet.id).await;
    assert!(
        plans_of(&db, tablet.id)
            .await
            .iter()
            .any(|p| p.product_deal_id == Some(binding.id) && p.active)
    );
}

#[tokio::test]
async fn deactivating_deal_reverts_its_bindings_too() {
    let db = setup_db().await;
    let phone = seed_product(&db, "mobiles", "Bundle phone", 40_000).await;
    let tablet = seed_product(&db, "mobiles", "Bundle tablet", 45_000).await;

    let (deal_row, _) = lifecycle::create_deal(&db, draft(phone.id, true))
        .await
        .unwrap();
    lifecycle::create_product_deal(
        &db,
        BindingDraft {
            deal_id: deal_row.id,
            product_id: tablet.id,
            active: true,
            installments: Some(vec![template(6)]),
        },
    )
    .await
    .unwrap();

    lifecycle::toggle_deal(&db, deal_row.id, false).await.unwrap();

    for product_id in [phone.id, tablet.id] {
        let plans = plans_of(&db, product_id).await;
        assert!(
            plans
                .iter()
                .all(|p| p.active && p.deal_id.is_none() && p.product_deal_id.is_none()),
            "product {product_id} must be back on standard plans"
        );
        let refreshed = Product::find_by_id(product_id).one(&db).await.unwrap().unwrap();
        assert!(!refreshed.has_active_deal);
    }
}

#[tokio::test]
async fn revert_without_standard_plans_reports_zero_active() {
    let db = setup_db().await;
    let sneaker = seed_product(&db, "shoes", "No-plan shoe", 5_000).await;

    let mut deal_draft = draft(sneaker.id, true);
    deal_draft.installments = Some(vec![template(3)]);
    let (deal_row, _) = lifecycle::create_deal(&db, deal_draft).await.unwrap();

    lifecycle::toggle_deal(&db, deal_row.id, false).await.unwrap();

    // The edge case of 4.2: nothing to reactivate, nothing invented.
    assert!(plans_of(&db, sneaker.id).await.is_empty());
}

#[tokio::test]
async fn double_revert_is_harmless() {
    let db = setup_db().await;
    let phone = seed_product(&db, "mobiles", "Race phone", 40_000).await;

    let (deal_row, _) = lifecycle::create_deal(&db, draft(phone.id, true))
        .await
        .unwrap();
    lifecycle::toggle_deal(&db, deal_row.id, false).await.unwrap();

    // A racing second revert finds nothing tagged and leaves the standard
    // set alone.
    store::revert_to_standard_plans(&db, phone.id, PlanSource::Deal(deal_row.id))
        .await
        .unwrap();

    let plans = plans_of(&db, phone.id).await;
    assert_eq!(plans.len(), 4);
    assert!(plans.iter().all(|p| p.active));
}

#[tokio::test]
async fn sweep_reverts_expired_deals_exactly_once() {
    let db = setup_db().await;
    let phone = seed_product(&db, "mobiles", "Expiring phone", 40_000).await;
    let other = seed_product(&db, "mobiles", "Running phone", 40_000).await;

    let (expired, _) = lifecycle::create_deal(&db, draft(phone.id, true))
        .await
        .unwrap();
    // This one's window is still open at sweep time.
    let mut open_draft = draft(other.id, true);
    open_draft.end_date = at(2024, 7, 31);
    lifecycle::create_deal(&db, open_draft).await.unwrap();

    let now = at(2024, 6, 16);
    assert_eq!(sweeper::sweep(&db, now).await.unwrap(), 1);

    let refreshed = Deal::find_by_id(expired.id).one(&db).await.unwrap().unwrap();
    assert!(!refreshed.active);

    let plans = plans_of(&db, phone.id).await;
    assert!(plans.iter().all(|p| p.active && p.deal_id.is_none()));
    let product_row = Product::find_by_id(phone.id).one(&db).await.unwrap().unwrap();
    assert!(!product_row.has_active_deal);

    // The open-window deal is untouched.
    assert_single_active_set(&db, other.id).await;
    let other_row = Product::find_by_id(other.id).one(&db).await.unwrap().unwrap();
    assert!(other_row.has_active_deal);

    // Second sweep finds nothing.
    assert_eq!(sweeper::sweep(&db, now).await.unwrap(), 0);
}

#[tokio::test]
async fn sweep_with_no_expired_deals_mutates_nothing() {
    let db = setup_db().await;
    let phone = seed_product(&db, "mobiles", "Fresh phone", 40_000).await;
    let (deal_row, _) = lifecycle::create_deal(&db, draft(phone.id, true))
        .await
        .unwrap();

    // Before the end date, nothing qualifies.
    assert_eq!(sweeper::sweep(&db, at(2024, 6, 10)).await.unwrap(), 0);

    let refreshed = Deal::find_by_id(deal_row.id).one(&db).await.unwrap().unwrap();
    assert!(refreshed.active);
    assert_single_active_set(&db, phone.id).await;
}

#[tokio::test]
async fn sweep_reverts_bindings_of_expired_deals() {
    let db = setup_db().await;
    let phone = seed_product(&db, "mobiles", "Expired host", 40_000).await;
    let tablet = seed_product(&db, "mobiles", "Expired side", 45_000).await;

    let (deal_row, _) = lifecycle::create_deal(&db, draft(phone.id, true))
        .await
        .unwrap();
    lifecycle::create_product_deal(
        &db,
        BindingDraft {
            deal_id: deal_row.id,
            product_id: tablet.id,
            active: true,
            installments: None,
        },
    )
    .await
    .unwrap();

    assert_eq!(sweeper::sweep(&db, at(2024, 6, 16)).await.unwrap(), 1);

    for product_id in [phone.id, tablet.id] {
        let plans = plans_of(&db, product_id).await;
        assert!(
            plans
                .iter()
                .all(|p| p.active && p.deal_id.is_none() && p.product_deal_id.is_none())
        );
    }
}
