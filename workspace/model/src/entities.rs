//! This file serves as the root for all SeaORM entity modules.
//! We define the data models for the deal and installment engine here:
//! the catalog side (categories, products), the materialized installment
//! plans, and the promotional side (deals, per-product bindings and their
//! owned template rows).

pub mod category;
pub mod deal;
pub mod deal_installment;
pub mod installment_plan;
pub mod product;
pub mod product_deal;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::category::Entity as Category;
    pub use super::deal::Entity as Deal;
    pub use super::deal_installment::Entity as DealInstallment;
    pub use super::installment_plan::Entity as InstallmentPlan;
    pub use super::product::Entity as Product;
    pub use super::product_deal::Entity as ProductDeal;
}
