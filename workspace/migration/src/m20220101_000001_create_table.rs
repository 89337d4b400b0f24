use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create categories table
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(pk_auto(Categories::Id))
                    .col(string(Categories::Name).unique_key())
                    .to_owned(),
            )
            .await?;

        // Create products table
        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(pk_auto(Products::Id))
                    .col(string(Products::Name))
                    .col(integer(Products::CategoryId))
                    .col(decimal_len(Products::Price, 19, 4))
                    .col(boolean(Products::HasActiveDeal).default(false))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_category")
                            .from(Products::Table, Products::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create deals table
        manager
            .create_table(
                Table::create()
                    .table(Deals::Table)
                    .if_not_exists()
                    .col(pk_auto(Deals::Id))
                    .col(string(Deals::Name))
                    .col(date_time(Deals::StartDate))
                    .col(date_time(Deals::EndDate))
                    .col(integer(Deals::ProductId))
                    .col(boolean(Deals::Active).default(true))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deal_product")
                            .from(Deals::Table, Deals::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create product_deals table (per-product deal bindings)
        manager
            .create_table(
                Table::create()
                    .table(ProductDeals::Table)
                    .if_not_exists()
                    .col(pk_auto(ProductDeals::Id))
                    .col(integer(ProductDeals::DealId))
                    .col(integer(ProductDeals::ProductId))
                    .col(boolean(ProductDeals::Active).default(true))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_deal_deal")
                            .from(ProductDeals::Table, ProductDeals::DealId)
                            .to(Deals::Table, Deals::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_deal_product")
                            .from(ProductDeals::Table, ProductDeals::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // A deal may claim a product at most once
        manager
            .create_index(
                Index::create()
                    .name("uq_product_deals_deal_product")
                    .table(ProductDeals::Table)
                    .col(ProductDeals::DealId)
                    .col(ProductDeals::ProductId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Create deal_installments table (template rows owned by a deal or binding)
        manager
            .create_table(
                Table::create()
                    .table(DealInstallments::Table)
                    .if_not_exists()
                    .col(pk_auto(DealInstallments::Id))
                    .col(integer_null(DealInstallments::DealId))
                    .col(integer_null(DealInstallments::ProductDealId))
                    .col(integer(DealInstallments::TermMonths))
                    .col(decimal_len(DealInstallments::AdvanceAmount, 19, 4))
                    .col(decimal_len(DealInstallments::MonthlyAmount, 19, 4))
                    .col(decimal_len(DealInstallments::TotalPrice, 19, 4))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deal_installment_deal")
                            .from(DealInstallments::Table, DealInstallments::DealId)
                            .to(Deals::Table, Deals::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deal_installment_product_deal")
                            .from(DealInstallments::Table, DealInstallments::ProductDealId)
                            .to(ProductDeals::Table, ProductDeals::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create installment_plans table (materialized plans per product)
        manager
            .create_table(
                Table::create()
                    .table(InstallmentPlans::Table)
                    .if_not_exists()
                    .col(pk_auto(InstallmentPlans::Id))
                    .col(integer(InstallmentPlans::ProductId))
                    .col(integer(InstallmentPlans::TermMonths))
                    .col(decimal_len(InstallmentPlans::AdvanceAmount, 19, 4))
                    .col(decimal_len(InstallmentPlans::MonthlyAmount, 19, 4))
                    .col(decimal_len(InstallmentPlans::TotalPrice, 19, 4))
                    .col(boolean(InstallmentPlans::Active).default(true))
                    .col(integer_null(InstallmentPlans::DealId))
                    .col(integer_null(InstallmentPlans::ProductDealId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_installment_plan_product")
                            .from(InstallmentPlans::Table, InstallmentPlans::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_installment_plan_deal")
                            .from(InstallmentPlans::Table, InstallmentPlans::DealId)
                            .to(Deals::Table, Deals::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_installment_plan_product_deal")
                            .from(InstallmentPlans::Table, InstallmentPlans::ProductDealId)
                            .to(ProductDeals::Table, ProductDeals::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InstallmentPlans::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DealInstallments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProductDeals::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Deals::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Categories {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
    Name,
    CategoryId,
    Price,
    HasActiveDeal,
}

#[derive(DeriveIden)]
enum Deals {
    Table,
    Id,
    Name,
    StartDate,
    EndDate,
    ProductId,
    Active,
}

#[derive(DeriveIden)]
enum ProductDeals {
    Table,
    Id,
    DealId,
    ProductId,
    Active,
}

#[derive(DeriveIden)]
enum DealInstallments {
    Table,
    Id,
    DealId,
    ProductDealId,
    TermMonths,
    AdvanceAmount,
    MonthlyAmount,
    TotalPrice,
}

#[derive(DeriveIden)]
enum InstallmentPlans {
    Table,
    Id,
    ProductId,
    TermMonths,
    AdvanceAmount,
    MonthlyAmount,
    TotalPrice,
    Active,
    DealId,
    ProductDealId,
}
