//! # Payment State Machine
//!
//! Payment status, balance and payment date are never stored independently of
//! the amounts they derive from; they are recomputed on creation and on every
//! payment update.
//!
//! ```text
//!            paid ≤ 0                0 < paid < total            paid ≥ total
//!   ┌──────────────────┐      ┌──────────────────────┐      ┌──────────────────┐
//!   │      UNPAID      │ ───► │       PARTIAL        │ ───► │       PAID       │
//!   │ payment_date: ∅  │      │ payment_date: kept   │      │ payment_date:    │
//!   └──────────────────┘      └──────────────────────┘      │ kept or now      │
//!                                                           └──────────────────┘
//!   balance_due = total − paid   (negative on overpayment, never clamped)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::PaymentStatus;

/// Derived payment fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentState {
    pub status: PaymentStatus,
    pub balance_due: Money,
    pub payment_date: Option<DateTime<Utc>>,
}

impl PaymentState {
    /// Amount the customer has overpaid, if any.
    pub fn overpayment(&self) -> Option<Money> {
        if self.balance_due.is_negative() {
            Some(-self.balance_due)
        } else {
            None
        }
    }
}

/// Derives status, balance and payment date from total vs. paid.
///
/// `now` is supplied by the caller so the derivation stays deterministic.
pub fn derive(
    total: Money,
    paid: Money,
    existing_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> PaymentState {
    let balance_due = total - paid;

    let (status, payment_date) = if !paid.is_positive() {
        (PaymentStatus::Unpaid, None)
    } else if paid < total {
        (PaymentStatus::Partial, existing_date)
    } else {
        (PaymentStatus::Paid, Some(existing_date.unwrap_or(now)))
    };

    PaymentState {
        status,
        balance_due,
        payment_date,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_unpaid_clears_date() {
        let earlier = Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap();
        let state = derive(Money::from_major(354), Money::zero(), Some(earlier), now());

        assert_eq!(state.status, PaymentStatus::Unpaid);
        assert_eq!(state.payment_date, None);
        assert_eq!(state.balance_due, Money::from_major(354));
    }

    #[test]
    fn test_partial_payment() {
        let state = derive(Money::from_major(2360), Money::from_major(1000), None, now());

        assert_eq!(state.status, PaymentStatus::Partial);
        assert_eq!(state.balance_due, Money::from_major(1360));
        assert_eq!(state.payment_date, None);
    }

    #[test]
    fn test_full_payment_sets_date_once() {
        let state = derive(Money::from_major(354), Money::from_major(354), None, now());
        assert_eq!(state.status, PaymentStatus::Paid);
        assert_eq!(state.payment_date, Some(now()));
        assert!(state.balance_due.is_zero());

        let earlier = Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap();
        let again = derive(Money::from_major(354), Money::from_major(354), Some(earlier), now());
        assert_eq!(again.payment_date, Some(earlier));
    }

    #[test]
    fn test_overpayment_is_surfaced() {
        let state = derive(Money::from_major(100), Money::from_major(150), None, now());
        assert_eq!(state.status, PaymentStatus::Paid);
        assert_eq!(state.balance_due, Money::from_major(-50));
        assert_eq!(state.overpayment(), Some(Money::from_major(50)));
    }

    #[test]
    fn test_status_matches_amounts_for_all_pairs() {
        let total = Money::from_minor(1000);
        for paid in [-10, 0, 1, 500, 999, 1000, 1001, 5000] {
            let paid = Money::from_minor(paid);
            let state = derive(total, paid, None, now());
            let expected = if paid.minor() <= 0 {
                PaymentStatus::Unpaid
            } else if paid >= total {
                PaymentStatus::Paid
            } else {
                PaymentStatus::Partial
            };
            assert_eq!(state.status, expected, "paid = {}", paid);
            assert_eq!(state.balance_due, total - paid);
        }
    }
}
