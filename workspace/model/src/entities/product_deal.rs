use sea_orm::entity::prelude::*;

use super::{deal, deal_installment, installment_plan, product};

/// Binds a deal to an additional product, with per-product installment
/// template overrides in its own `deal_installment` rows.
///
/// `(deal_id, product_id)` is unique: a deal claims a product at most once.
/// The binding carries its own `active` flag so individual products can be
/// pulled out of a running deal; a binding only counts as live while its
/// parent deal is active too.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "product_deals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub deal_id: i32,
    pub product_id: i32,
    #[sea_orm(default_value = "true")]
    pub active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "deal::Entity",
        from = "Column::DealId",
        to = "deal::Column::Id",
        on_delete = "Cascade"
    )]
    Deal,
    #[sea_orm(
        belongs_to = "product::Entity",
        from = "Column::ProductId",
        to = "product::Column::Id",
        on_delete = "Cascade"
    )]
    Product,
    #[sea_orm(has_many = "deal_installment::Entity")]
    DealInstallments,
    #[sea_orm(has_many = "installment_plan::Entity")]
    InstallmentPlans,
}

impl Related<deal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deal.def()
    }
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

impl Related<installment_plan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InstallmentPlans.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
