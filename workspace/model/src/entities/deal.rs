use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;

use super::{deal_installment, installment_plan, product, product_deal};

/// A time-boxed promotional override of a product's installment plans.
///
/// `active` is controlled by administrators and the expiry sweeper and is
/// independent of the time window: creation enforces `end_date > start_date`,
/// the sweeper only ever moves a deal towards inactive once `end_date` has
/// passed. While active, the deal's template rows are materialized as the
/// product's installment plans and the standard set is deactivated.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "deals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    /// The single product this deal targets directly. Multi-product deals
    /// attach further products through `product_deal` bindings.
    pub product_id: i32,
    #[sea_orm(default_value = "true")]
    pub active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "product::Entity",
        from = "Column::ProductId",
        to = "product::Column::Id",
        on_delete = "Cascade"
    )]
    Product,
    #[sea_orm(has_many = "deal_installment::Entity")]
    DealInstallments,
    #[sea_orm(has_many = "product_deal::Entity")]
    ProductDeals,
    #[sea_orm(has_many = "installment_plan::Entity")]
    InstallmentPlans,
}

impl Related<product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<deal_installment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DealInstallments.def()
    }
}

impl Related<product_deal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductDeals.def()
    }
}

impl Related<installment_plan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InstallmentPlans.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
