use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

use super::{deal, product, product_deal};

/// A materialized installment plan for a product.
///
/// Both `deal_id` and `product_deal_id` null means this is a standard
/// (non-promotional) plan. Per product, at most one set of plans is active
/// at a time: either the standard set or the set belonging to exactly one
/// deal or product-deal binding. The plan store is the only writer of the
/// `active` flag.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "installment_plans")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub product_id: i32,
    /// Term length in months. Positive.
    pub term_months: i32,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub advance_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub monthly_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total_price: Decimal,
    #[sea_orm(default_value = "true")]
    pub active: bool,
    /// The deal this plan was materialized from, if any.
    pub deal_id: Option<i32>,
    /// The product-deal binding this plan was materialized from, if any.
    pub product_deal_id: Option<i32>,
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
    #[sea_orm(
        belongs_to = "deal::Entity",
        from = "Column::DealId",
        to = "deal::Column::Id",
        on_delete = "Cascade"
    )]
    Deal,
    #[sea_orm(
        belongs_to = "product_deal::Entity",
        from = "Column::ProductDealId",
        to = "product_deal::Column::Id",
        on_delete = "Cascade"
    )]
    ProductDeal,
}

impl Related<product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<deal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deal.def()
    }
}

impl Related<product_deal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductDeal.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
