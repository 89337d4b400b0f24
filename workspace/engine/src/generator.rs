//! Pure derivation of installment plans from a category name and a price.
//!
//! The bracket tables are fixed business policy, not configuration. Every
//! derived amount is rounded up to the next multiple of 50 independently, so
//! the quoted total is not simply `advance + monthly * months` of the
//! unrounded figures.

use common::InstallmentTemplate;
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{EngineError, Result};

/// One row of a bracket's term table. Fractions are stored in hundredths.
#[derive(Debug, Clone, Copy)]
struct TermRate {
    months: i32,
    profit_pct: i64,
    advance_pct: i64,
}

const fn rate(months: i32, profit_pct: i64, advance_pct: i64) -> TermRate {
    TermRate {
        months,
        profit_pct,
        advance_pct,
    }
}

/// "mobiles" priced up to 50,000.
const BUDGET_TERMS: &[TermRate] = &[
    rate(3, 20, 35),
    rate(6, 25, 35),
    rate(9, 30, 35),
    rate(12, 35, 35),
];

/// "mobiles" priced above 50,000 up to 100,000. Same profit ladder, a
/// heavier advance.
const MID_TERMS: &[TermRate] = &[
    rate(3, 20, 40),
    rate(6, 25, 40),
    rate(9, 30, 40),
    rate(12, 35, 40),
];

/// Anything priced above 100,000, regardless of category. Adds a 24-month
/// option.
const EXTENDED_TERMS: &[TermRate] = &[
    rate(3, 20, 40),
    rate(6, 25, 40),
    rate(9, 30, 40),
    rate(12, 35, 40),
    rate(24, 50, 40),
];

/// Rounds up to the next multiple of 50, the smallest unit the business
/// quotes.
pub fn round_up_50(value: Decimal) -> Decimal {
    let step = Decimal::new(50, 0);
    (value / step).ceil() * step
}

/// Derives the ordered installment plans for a category and price.
///
/// Plans come back ordered by ascending term length, exactly as the bracket
/// table lists them. Fails with [`EngineError::NoPlanAvailable`] when no
/// bracket covers the pair.
pub fn generate(category: &str, price: Decimal) -> Result<Vec<InstallmentTemplate>> {
    if price < Decimal::ZERO {
        return Err(EngineError::Validation(format!(
            "price must be non-negative, got {price}"
        )));
    }

    let table = bracket_for(category, price).ok_or_else(|| EngineError::NoPlanAvailable {
        category: category.to_string(),
        price,
    })?;

    debug!(
        "Generating {} installment plans for category '{}' at price {}",
        table.len(),
        category,
        price
    );

    Ok(table.iter().map(|term| derive(price, term)).collect())
}

fn bracket_for(category: &str, price: Decimal) -> Option<&'static [TermRate]> {
    // Above 100,000 the bracket is price-driven for every category.
    if price > Decimal::new(100_000, 0) {
        return Some(EXTENDED_TERMS);
    }
    if category.eq_ignore_ascii_case("mobiles") {
        if price <= Decimal::new(50_000, 0) {
            return Some(BUDGET_TERMS);
        }
        return Some(MID_TERMS);
    }
    None
}

fn derive(price: Decimal, term: &TermRate) -> InstallmentTemplate {
    let months = Decimal::from(term.months);
    let profit_amount = round_up_50(price * Decimal::new(term.profit_pct, 2));
    let advance_amount = round_up_50(price * Decimal::new(term.advance_pct, 2));
    let monthly_amount = round_up_50((price + profit_amount - advance_amount) / months);
    let total_price = round_up_50(advance_amount + monthly_amount * months);

    InstallmentTemplate::new(term.months, advance_amount, monthly_amount, total_price)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(value: i64) -> Decimal {
        Decimal::new(value, 0)
    }

    #[test]
    fn reference_numbers_for_small_price() {
        // 3 months at 20% profit / 35% advance over a price of 1,000:
        // advance 350, profit 200, monthly ceil(283.33) -> 300, total 1,250.
        let plans = generate("mobiles", price(1_000)).unwrap();
        let three_month = &plans[0];

        assert_eq!(three_month.term_months, 3);
        assert_eq!(three_month.advance_amount, price(350));
        assert_eq!(three_month.monthly_amount, price(300));
        assert_eq!(three_month.total_price, price(1_250));
    }

    #[test]
    fn budget_bracket_has_four_ascending_terms() {
        let plans = generate("mobiles", price(40_000)).unwrap();
        let terms: Vec<i32> = plans.iter().map(|p| p.term_months).collect();
        assert_eq!(terms, vec![3, 6, 9, 12]);
    }

    #[test]
    fn mid_bracket_uses_heavier_advance() {
        let budget = generate("mobiles", price(50_000)).unwrap();
        let mid = generate("mobiles", price(50_001)).unwrap();

        // 35% vs 40% of roughly the same price
        assert!(mid[0].advance_amount > budget[0].advance_amount);
        assert_eq!(mid.len(), 4);
    }

    #[test]
    fn extended_bracket_applies_to_any_category() {
        for category in ["mobiles", "laptops"] {
            let plans = generate(category, price(120_000)).unwrap();
            let terms: Vec<i32> = plans.iter().map(|p| p.term_months).collect();
            assert_eq!(terms, vec![3, 6, 9, 12, 24]);
        }
    }

    #[test]
    fn unsupported_pair_is_rejected_not_empty() {
        let err = generate("shoes", price(40_000)).unwrap_err();
        match err {
            EngineError::NoPlanAvailable { category, price } => {
                assert_eq!(category, "shoes");
                assert_eq!(price, Decimal::new(40_000, 0));
            }
            other => panic!("expected NoPlanAvailable, got {other:?}"),
        }
    }

    #[test]
    fn negative_price_is_a_validation_error() {
        assert!(matches!(
            generate("mobiles", price(-1)),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn amounts_are_multiples_of_fifty_and_cover_principal() {
        let fifty = price(50);
        for p in [999, 1_000, 33_333, 50_000, 77_777, 100_000, 123_456] {
            let p = price(p);
            let Ok(plans) = generate("mobiles", p) else {
                panic!("expected a bracket for mobiles at {p}");
            };
            for plan in plans {
                assert_eq!(plan.advance_amount % fifty, Decimal::ZERO);
                assert_eq!(plan.monthly_amount % fifty, Decimal::ZERO);
                assert_eq!(plan.total_price % fifty, Decimal::ZERO);
                // Financing covers principal plus profit.
                let paid = plan.advance_amount
                    + plan.monthly_amount * Decimal::from(plan.term_months);
                assert!(paid >= p, "plan {plan:?} pays {paid} < price {p}");
            }
        }
    }

    #[test]
    fn round_up_50_rounds_toward_positive_multiples() {
        assert_eq!(round_up_50(price(0)), price(0));
        assert_eq!(round_up_50(price(1)), price(50));
        assert_eq!(round_up_50(price(50)), price(50));
        assert_eq!(round_up_50(Decimal::new(28_333, 2)), price(300));
    }
}
