//! # Statistics Repository
//!
//! Grouped aggregates over a hospital's invoices within a date range.
//!
//! All three GROUP BY queries run inside one read transaction, so under WAL
//! they see the same snapshot and the breakdowns always agree with each
//! other and with the summary.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use medibill_core::period::{DateRange, StatsPeriod};
use medibill_core::statistics::{
    AmountBreakdown, BillingStatistics, MethodBreakdown, StatusBreakdown, Summary,
};
use medibill_core::{InvoiceType, Money, PaymentStatus};

/// Repository for billing statistics.
#[derive(Debug, Clone)]
pub struct StatisticsRepository {
    pool: SqlitePool,
}

impl StatisticsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StatisticsRepository { pool }
    }

    /// Aggregates invoices whose `invoice_date` falls in `range` (inclusive).
    pub async fn aggregate(
        &self,
        hospital_id: &str,
        period: StatsPeriod,
        range: DateRange,
    ) -> DbResult<BillingStatistics> {
        let mut tx = self.pool.begin().await?;

        let by_type: Vec<(InvoiceType, i64, i64, i64, i64)> = sqlx::query_as(
            r#"
            SELECT invoice_type,
                   COUNT(*),
                   COALESCE(SUM(total_amount), 0),
                   COALESCE(SUM(paid_amount), 0),
                   COALESCE(SUM(balance_due), 0)
            FROM invoices
            WHERE hospital_id = ?1 AND invoice_date >= ?2 AND invoice_date <= ?3
            GROUP BY invoice_type
            "#,
        )
        .bind(hospital_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&mut *tx)
        .await?;

        let by_status: Vec<(PaymentStatus, i64, i64)> = sqlx::query_as(
            r#"
            SELECT payment_status, COUNT(*), COALESCE(SUM(total_amount), 0)
            FROM invoices
            WHERE hospital_id = ?1 AND invoice_date >= ?2 AND invoice_date <= ?3
            GROUP BY payment_status
            "#,
        )
        .bind(hospital_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&mut *tx)
        .await?;

        let by_method: Vec<(String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT payment_method, COUNT(*), COALESCE(SUM(paid_amount), 0)
            FROM invoices
            WHERE hospital_id = ?1 AND invoice_date >= ?2 AND invoice_date <= ?3
            GROUP BY payment_method
            "#,
        )
        .bind(hospital_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut report = BillingStatistics::empty(period, range);
        let mut totals = AmountBreakdown::default();

        for (invoice_type, count, total, paid, pending) in by_type {
            let group = AmountBreakdown {
                count,
                total_amount: Money::from_minor(total),
                paid_amount: Money::from_minor(paid),
                pending_amount: Money::from_minor(pending),
            };
            totals.count += group.count;
            totals.total_amount += group.total_amount;
            totals.paid_amount += group.paid_amount;
            totals.pending_amount += group.pending_amount;
            report.by_type.insert(invoice_type, group);
        }
        report.summary = Summary::from(totals);

        for (status, count, total) in by_status {
            report.by_status.insert(
                status,
                StatusBreakdown {
                    count,
                    total_amount: Money::from_minor(total),
                },
            );
        }

        for (method, count, paid) in by_method {
            report.by_payment_method.insert(
                method,
                MethodBreakdown {
                    count,
                    paid_amount: Money::from_minor(paid),
                },
            );
        }

        debug!(
            hospital_id = %hospital_id,
            period = %period,
            invoices = report.summary.total_invoices,
            "Aggregated billing statistics"
        );

        Ok(report)
    }
}
