//! Billing statistics report shapes.
//!
//! Group keys with no invoices in range are absent from the maps, not zero.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::money::Money;
use crate::period::{DateRange, StatsPeriod};
use crate::types::{InvoiceType, PaymentStatus};

/// Count plus the three money metrics, used for the overall summary and per
/// invoice type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmountBreakdown {
    pub count: i64,
    pub total_amount: Money,
    pub paid_amount: Money,
    /// Σ balance_due. Overpayments reduce it.
    pub pending_amount: Money,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_invoices: i64,
    pub total_amount: Money,
    pub paid_amount: Money,
    pub pending_amount: Money,
}

impl From<AmountBreakdown> for Summary {
    fn from(b: AmountBreakdown) -> Self {
        Summary {
            total_invoices: b.count,
            total_amount: b.total_amount,
            paid_amount: b.paid_amount,
            pending_amount: b.pending_amount,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBreakdown {
    pub count: i64,
    pub total_amount: Money,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodBreakdown {
    pub count: i64,
    pub paid_amount: Money,
}

/// Full statistics report for one tenant and one window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingStatistics {
    pub period: StatsPeriod,
    pub range: DateRange,
    pub summary: Summary,
    pub by_type: BTreeMap<InvoiceType, AmountBreakdown>,
    pub by_status: BTreeMap<PaymentStatus, StatusBreakdown>,
    pub by_payment_method: BTreeMap<String, MethodBreakdown>,
}

impl BillingStatistics {
    pub fn empty(period: StatsPeriod, range: DateRange) -> Self {
        BillingStatistics {
            period,
            range,
            summary: Summary::default(),
            by_type: BTreeMap::new(),
            by_status: BTreeMap::new(),
            by_payment_method: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_report_wire_shape() {
        let range = DateRange::new(
            Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap(),
        );
        let mut report = BillingStatistics::empty(StatsPeriod::ThisMonth, range);
        report.by_type.insert(
            InvoiceType::Consultation,
            AmountBreakdown {
                count: 1,
                total_amount: Money::from_major(354),
                ..Default::default()
            },
        );
        report.summary = Summary::from(report.by_type[&InvoiceType::Consultation]);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["period"], "this_month");
        assert_eq!(json["summary"]["totalInvoices"], 1);
        assert_eq!(json["byType"]["consultation"]["count"], 1);
        assert_eq!(json["byType"]["consultation"]["totalAmount"], 35400);
        // Absent groups are omitted, not zero-filled
        assert!(json["byType"].get("pharmacy").is_none());
        assert!(json["byStatus"].as_object().unwrap().is_empty());
    }
}
