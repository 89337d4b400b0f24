use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

use super::{deal, product_deal};

/// An installment template row owned by a deal or a product-deal binding.
///
/// These rows are the source of truth for a deal's plan shape. They are
/// distinct from the `installment_plan` rows materialized onto a product
/// while the deal is active. Exactly one of `deal_id` / `product_deal_id`
/// is set.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "deal_installments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub deal_id: Option<i32>,
    pub product_deal_id: Option<i32>,
    pub term_months: i32,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub advance_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub monthly_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total_price: Decimal,
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
        belongs_to = "product_deal::Entity",
        from = "Column::ProductDealId",
        to = "product_deal::Column::Id",
        on_delete = "Cascade"
    )]
    ProductDeal,
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
