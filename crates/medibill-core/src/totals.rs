//! # Totals Calculator
//!
//! Line items → subtotal, tax amount, grand total.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  for each item:  amount = item.amount ?? quantity × unit_price         │
//! │  subtotal        = Σ amount                                            │
//! │  tax_amount      = round_half_up(subtotal × bps / 10000)               │
//! │  total_amount    = subtotal + tax_amount                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tax is computed once on the subtotal, not per line, so the per-line
//! rounding error never accumulates.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::invoice::{LineItem, LineItemInput};
use crate::money::Money;
use crate::types::TaxRate;
use crate::validation::validate_line_items;

/// Result of a totals calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub items: Vec<LineItem>,
    pub subtotal: Money,
    pub tax_rate: TaxRate,
    pub tax_amount: Money,
    pub total_amount: Money,
}

/// Computes line amounts and invoice totals.
///
/// ## Errors
/// - [`CoreError::EmptyInvoice`] when there are no items
/// - [`CoreError::Validation`] for negative prices, bad quantities, blank descriptions
/// - [`CoreError::NothingToBill`] when every amount is zero
/// - [`CoreError::Overflow`] when a line or the subtotal leaves the i64 range
///
/// ```rust
/// use medibill_core::invoice::LineItemInput;
/// use medibill_core::money::Money;
/// use medibill_core::totals::calculate;
/// use medibill_core::types::TaxRate;
///
/// let items = vec![
///     LineItemInput::new("Dressing", 2, Money::from_major(500)),
///     LineItemInput::new("X-Ray", 1, Money::from_major(1000)),
/// ];
/// let totals = calculate(&items, TaxRate::from_percent(18)).unwrap();
/// assert_eq!(totals.subtotal, Money::from_major(2000));
/// assert_eq!(totals.tax_amount, Money::from_major(360));
/// assert_eq!(totals.total_amount, Money::from_major(2360));
/// ```
pub fn calculate(items: &[LineItemInput], tax_rate: TaxRate) -> CoreResult<Totals> {
    if items.is_empty() {
        return Err(CoreError::EmptyInvoice);
    }
    validate_line_items(items)?;
    crate::validation::validate_tax_rate(tax_rate)?;

    let mut lines = Vec::with_capacity(items.len());
    let mut subtotal = Money::zero();

    for (index, item) in items.iter().enumerate() {
        let amount = match item.amount {
            Some(amount) => amount,
            None => item
                .unit_price
                .checked_mul_quantity(item.quantity)
                .ok_or_else(|| CoreError::Overflow {
                    context: format!("items[{}].amount", index),
                })?,
        };

        subtotal = subtotal.checked_add(amount).ok_or_else(|| CoreError::Overflow {
            context: "subtotal".to_string(),
        })?;

        lines.push(LineItem {
            description: item.description.trim().to_string(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            amount,
            tax_code: item.tax_code.clone(),
            tax_rate,
            medication_id: item.medication_id.clone(),
        });
    }

    if !subtotal.is_positive() {
        return Err(CoreError::NothingToBill);
    }

    let tax_amount = subtotal.calculate_tax(tax_rate);
    let total_amount = subtotal
        .checked_add(tax_amount)
        .ok_or_else(|| CoreError::Overflow {
            context: "total".to_string(),
        })?;

    Ok(Totals {
        items: lines,
        subtotal,
        tax_rate,
        tax_amount,
        total_amount,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn item(qty: i64, minor: i64) -> LineItemInput {
        LineItemInput::new("Service", qty, Money::from_minor(minor))
    }

    #[test]
    fn test_manual_invoice_with_tax() {
        let items = vec![item(2, 50_000), item(1, 100_000)];
        let totals = calculate(&items, TaxRate::from_percent(18)).unwrap();

        assert_eq!(totals.subtotal.minor(), 200_000);
        assert_eq!(totals.tax_amount.minor(), 36_000);
        assert_eq!(totals.total_amount.minor(), 236_000);
        assert_eq!(totals.items[0].amount.minor(), 100_000);
        assert_eq!(totals.items[0].tax_rate, TaxRate::from_percent(18));
    }

    #[test]
    fn test_caller_amount_is_preserved() {
        // Discounted line: 3 × 100.00 billed at 250.00
        let items = vec![item(3, 10_000).with_amount(Money::from_minor(25_000))];
        let totals = calculate(&items, TaxRate::zero()).unwrap();

        assert_eq!(totals.items[0].amount.minor(), 25_000);
        assert_eq!(totals.subtotal.minor(), 25_000);
        assert_eq!(totals.total_amount.minor(), 25_000);
    }

    #[test]
    fn test_many_fractional_items_have_no_drift() {
        // 150 lines at 0.10, 0.20 ... each with quantity 3
        let items: Vec<LineItemInput> = (1..=150).map(|i| item(3, i * 10 + 7)).collect();
        let totals = calculate(&items, TaxRate::from_bps(1250)).unwrap();

        let expected_subtotal: i64 = (1..=150).map(|i| (i * 10 + 7) * 3).sum();
        let line_sum: Money = totals.items.iter().map(|l| l.amount).sum();

        assert_eq!(totals.subtotal.minor(), expected_subtotal);
        assert_eq!(line_sum, totals.subtotal);
        assert_eq!(totals.total_amount, totals.subtotal + totals.tax_amount);
    }

    #[test]
    fn test_tax_rounding_on_subtotal() {
        // 0.99 × 18% = 0.1782 → 0.18
        let totals = calculate(&[item(1, 99)], TaxRate::from_percent(18)).unwrap();
        assert_eq!(totals.tax_amount.minor(), 18);
        assert_eq!(totals.total_amount.minor(), 117);
    }

    #[test]
    fn test_rejects_empty_and_zero_totals() {
        assert!(matches!(calculate(&[], TaxRate::zero()), Err(CoreError::EmptyInvoice)));
        assert!(matches!(
            calculate(&[item(1, 0), item(2, 0)], TaxRate::zero()),
            Err(CoreError::NothingToBill)
        ));
    }

    #[test]
    fn test_rejects_negative_input() {
        assert!(matches!(
            calculate(&[item(1, -100)], TaxRate::zero()),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            calculate(&[item(-1, 100)], TaxRate::zero()),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_overflow_is_reported() {
        let huge = vec![item(2, i64::MAX / 2 + 1)];
        assert!(matches!(calculate(&huge, TaxRate::zero()), Err(CoreError::Overflow { .. })));
    }
}
