//! Sale pricing
//!
//! Selling prices are VAT inclusive. A document's gross is the sum of its
//! rounded line amounts; the discount comes off the gross and VAT is then
//! split out of what remains, so `total + discount == revenue + vat` holds
//! to the cent for every document.

use core_kernel::{Money, MoneyError, Rate};
use domain_inventory::InventoryError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::documents::{Discount, SaleRequest};
use crate::error::WorkflowError;

/// The amounts a sale posts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SaleTotals {
    /// Sum of the line amounts, VAT inclusive
    pub gross: Money,
    pub discount: Money,
    /// Taxable amount after the discount, VAT exclusive
    pub net: Money,
    pub vat: Money,
    /// Amount due from the customer
    pub total: Money,
}

impl SaleTotals {
    /// Sales revenue credited; the discount is booked separately as an expense
    pub fn revenue(&self) -> Money {
        self.net + self.discount
    }
}

/// Computes the totals of a sale or AR invoice
///
/// # Errors
///
/// Rejects documents without lines, non-positive quantities, negative
/// prices and out-of-range discounts.
pub fn price_sale(request: &SaleRequest, vat_rate: Rate) -> Result<SaleTotals, WorkflowError> {
    if request.lines.is_empty() {
        return Err(WorkflowError::validation("a sale needs at least one line"));
    }

    let mut gross = Money::zero();
    for (index, line) in request.lines.iter().enumerate() {
        if line.quantity <= 0 {
            return Err(InventoryError::InvalidQuantity(format!(
                "line {} quantity must be positive, got {}",
                index + 1,
                line.quantity
            ))
            .into());
        }
        if line.unit_price < Decimal::ZERO {
            return Err(WorkflowError::validation(format!(
                "line {} unit price cannot be negative",
                index + 1
            )));
        }
        let amount = line
            .unit_price
            .checked_mul(Decimal::from(line.quantity))
            .ok_or(MoneyError::Overflow)?;
        gross += Money::new(amount);
    }

    let split = |amount: Money| {
        if request.vatable {
            vat_rate.split_inclusive(amount)
        } else {
            (amount, Money::zero())
        }
    };

    let totals = match request.discount {
        None => {
            let (net, vat) = split(gross);
            SaleTotals {
                gross,
                discount: Money::zero(),
                net,
                vat,
                total: gross,
            }
        }
        Some(Discount::Percent(percent)) => {
            let discount = Money::new(gross.amount() * checked_percent(percent)?);
            taxed_after_discount(gross, discount, split)
        }
        Some(Discount::Fixed(amount)) => {
            if amount < Decimal::ZERO {
                return Err(WorkflowError::validation("fixed discount cannot be negative"));
            }
            taxed_after_discount(gross, Money::new(amount).min(gross), split)
        }
        Some(Discount::VatExempt(percent)) => {
            let (base, _) = split(gross);
            let discount = Money::new(base.amount() * checked_percent(percent)?);
            let net = base - discount;
            SaleTotals {
                gross,
                discount,
                net,
                vat: Money::zero(),
                total: net,
            }
        }
    };

    Ok(totals)
}

fn taxed_after_discount(
    gross: Money,
    discount: Money,
    split: impl Fn(Money) -> (Money, Money),
) -> SaleTotals {
    let total = gross - discount;
    let (net, vat) = split(total);
    SaleTotals {
        gross,
        discount,
        net,
        vat,
        total,
    }
}

fn checked_percent(percent: Decimal) -> Result<Decimal, WorkflowError> {
    if percent < Decimal::ZERO || percent > dec!(100) {
        return Err(WorkflowError::validation(format!(
            "discount percentage must be between 0 and 100, got {percent}"
        )));
    }
    Ok(percent / dec!(100))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::ProductId;
    use proptest::prelude::*;

    fn twelve() -> Rate {
        Rate::from_percentage(dec!(12))
    }

    fn one_line(price: Decimal) -> SaleRequest {
        SaleRequest::new().line(ProductId::new(1), 1, price)
    }

    fn money(amount: Decimal) -> Money {
        Money::new(amount)
    }

    #[test]
    fn test_vat_is_split_out_of_gross() {
        let totals = price_sale(&one_line(dec!(112.00)), twelve()).unwrap();
        assert_eq!(totals.net, money(dec!(100.00)));
        assert_eq!(totals.vat, money(dec!(12.00)));
        assert_eq!(totals.total, money(dec!(112.00)));
        assert_eq!(totals.revenue(), money(dec!(100.00)));
    }

    #[test]
    fn test_percent_discount_comes_off_before_vat() {
        let request = one_line(dec!(112.00)).discount(Discount::Percent(dec!(10)));
        let totals = price_sale(&request, twelve()).unwrap();

        assert_eq!(totals.discount, money(dec!(11.20)));
        assert_eq!(totals.total, money(dec!(100.80)));
        assert_eq!(totals.net, money(dec!(90.00)));
        assert_eq!(totals.vat, money(dec!(10.80)));
    }

    #[test]
    fn test_fixed_discount_is_capped_at_gross() {
        let request = one_line(dec!(112.00)).discount(Discount::Fixed(dec!(200)));
        let totals = price_sale(&request, twelve()).unwrap();

        assert_eq!(totals.discount, money(dec!(112.00)));
        assert!(totals.total.is_zero());
        assert!(totals.vat.is_zero());
    }

    #[test]
    fn test_vat_exempt_discount_applies_to_net() {
        let request = one_line(dec!(112.00)).discount(Discount::VatExempt(dec!(20)));
        let totals = price_sale(&request, twelve()).unwrap();

        assert_eq!(totals.discount, money(dec!(20.00)));
        assert_eq!(totals.total, money(dec!(80.00)));
        assert!(totals.vat.is_zero());
        assert_eq!(totals.revenue(), money(dec!(100.00)));
    }

    #[test]
    fn test_non_vatable_sale_has_no_vat() {
        let totals = price_sale(&one_line(dec!(112.00)).non_vatable(), twelve()).unwrap();
        assert_eq!(totals.net, money(dec!(112.00)));
        assert!(totals.vat.is_zero());
    }

    #[test]
    fn test_line_amounts_are_rounded_before_summing() {
        let request = SaleRequest::new()
            .line(ProductId::new(1), 3, dec!(0.335))
            .line(ProductId::new(2), 1, dec!(0.005))
            .non_vatable();
        let totals = price_sale(&request, twelve()).unwrap();
        // 1.005 -> 1.01 and 0.005 -> 0.01
        assert_eq!(totals.gross, money(dec!(1.02)));
    }

    #[test]
    fn test_rejects_bad_documents() {
        assert!(matches!(
            price_sale(&SaleRequest::new(), twelve()),
            Err(WorkflowError::Validation(_))
        ));
        assert!(matches!(
            price_sale(&SaleRequest::new().line(ProductId::new(1), 0, dec!(1)), twelve()),
            Err(WorkflowError::Inventory(InventoryError::InvalidQuantity(_)))
        ));
        assert!(matches!(
            price_sale(&one_line(dec!(-1)), twelve()),
            Err(WorkflowError::Validation(_))
        ));
        assert!(matches!(
            price_sale(&one_line(dec!(10)).discount(Discount::Percent(dec!(101))), twelve()),
            Err(WorkflowError::Validation(_))
        ));
    }

    fn discount_strategy() -> impl Strategy<Value = Option<Discount>> {
        let percent = (0u32..=10_000u32).prop_map(|n| Decimal::new(i64::from(n), 2));
        prop_oneof![
            Just(None),
            percent.clone().prop_map(|p| Some(Discount::Percent(p))),
            (0i64..2_000_000i64).prop_map(|c| Some(Discount::Fixed(Decimal::new(c, 2)))),
            percent.prop_map(|p| Some(Discount::VatExempt(p))),
        ]
    }

    proptest! {
        #[test]
        fn posted_sides_always_balance(
            lines in prop::collection::vec((1i64..50i64, 0i64..100_000i64), 1..6),
            discount in discount_strategy(),
            vatable in any::<bool>(),
        ) {
            let mut request = SaleRequest::new();
            for (index, (quantity, cents)) in lines.into_iter().enumerate() {
                request = request.line(ProductId::new(index as i64 + 1), quantity, Decimal::new(cents, 2));
            }
            request.discount = discount;
            request.vatable = vatable;

            let totals = price_sale(&request, twelve()).unwrap();
            prop_assert_eq!(totals.total + totals.discount, totals.revenue() + totals.vat);
            prop_assert!(!totals.total.is_negative());
            prop_assert!(totals.discount <= totals.gross);
        }
    }
}
