use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One installment option for a product: a term length plus the three
/// derived amounts. This is the shape the plan generator produces, the shape
/// callers may supply explicitly when creating a deal, and the template shape
/// stored on a deal before it is materialized against a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct InstallmentTemplate {
    /// Term length in months.
    pub term_months: i32,
    /// Up-front payment.
    pub advance_amount: Decimal,
    /// Payment due each month of the term.
    pub monthly_amount: Decimal,
    /// Total financed price (advance + monthly * term, after rounding).
    pub total_price: Decimal,
}

impl InstallmentTemplate {
    pub fn new(
        term_months: i32,
        advance_amount: Decimal,
        monthly_amount: Decimal,
        total_price: Decimal,
    ) -> Self {
        Self {
            term_months,
            advance_amount,
            monthly_amount,
            total_price,
        }
    }
}

/// A materialized installment plan row as exposed by the product plan listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct InstallmentPlanDto {
    pub id: i32,
    pub product_id: i32,
    pub term_months: i32,
    pub advance_amount: Decimal,
    pub monthly_amount: Decimal,
    pub total_price: Decimal,
    pub active: bool,
    /// Deal that produced this plan; `None` for a standard plan.
    pub deal_id: Option<i32>,
    /// Product-deal binding that produced this plan; `None` for a standard plan.
    pub product_deal_id: Option<i32>,
}

/// A deal-owned installment template row as returned with deal responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DealInstallmentDto {
    pub id: i32,
    pub term_months: i32,
    pub advance_amount: Decimal,
    pub monthly_amount: Decimal,
    pub total_price: Decimal,
}
