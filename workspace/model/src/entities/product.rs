use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

use super::{category, deal, installment_plan, product_deal};

/// A catalog product. The price drives installment-plan derivation; the
/// `has_active_deal` flag is denormalized so listings can badge promoted
/// products without joining the deal tables. Only the deal lifecycle flips
/// that flag.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub category_id: i32,
    /// Listed cash price. Non-negative.
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub price: Decimal,
    #[sea_orm(default_value = "false")]
    pub has_active_deal: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "category::Entity",
        from = "Column::CategoryId",
        to = "category::Column::Id",
        on_delete = "Cascade"
    )]
    Category,
    #[sea_orm(has_many = "installment_plan::Entity")]
    InstallmentPlans,
    #[sea_orm(has_many = "deal::Entity")]
    Deals,
    #[sea_orm(has_many = "product_deal::Entity")]
    ProductDeals,
}

impl Related<category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<installment_plan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InstallmentPlans.def()
    }
}

impl Related<deal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deals.def()
    }
}

impl Related<product_deal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductDeals.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
