//! # Invoice Counter Repository
//!
//! Atomic per-(hospital, prefix, YYMM) sequence for invoice numbers.
//!
//! ## Increment-and-Fetch
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  INSERT INTO invoice_counters (..., last_seq) VALUES (..., 1)          │
//! │  ON CONFLICT (hospital_id, prefix, period)                             │
//! │      DO UPDATE SET last_seq = last_seq + 1                             │
//! │  RETURNING last_seq                                                    │
//! │                                                                         │
//! │  One statement, one write lock: two writers can never read the same   │
//! │  value. First call in a month returns 1.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Invoice creation calls [`next_sequence`] inside its own transaction, so a
//! failed creation rolls the counter back with it.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use medibill_core::numbering::{format_invoice_number, InvoicePeriod};

/// Increments and returns the counter on an existing connection or
/// transaction.
pub(crate) async fn next_sequence(
    conn: &mut SqliteConnection,
    hospital_id: &str,
    prefix: &str,
    period: InvoicePeriod,
) -> DbResult<u32> {
    let seq: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO invoice_counters (hospital_id, prefix, period, last_seq)
        VALUES (?1, ?2, ?3, 1)
        ON CONFLICT (hospital_id, prefix, period)
        DO UPDATE SET last_seq = last_seq + 1
        RETURNING last_seq
        "#,
    )
    .bind(hospital_id)
    .bind(prefix)
    .bind(period.key())
    .fetch_one(&mut *conn)
    .await?;

    u32::try_from(seq).map_err(|_| DbError::Internal(format!("invoice counter overflow: {}", seq)))
}

/// Repository for invoice number counters.
#[derive(Debug, Clone)]
pub struct InvoiceCounterRepository {
    pool: SqlitePool,
}

impl InvoiceCounterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceCounterRepository { pool }
    }

    /// Issues the next invoice number for `(hospital, prefix)` in the month
    /// of `at`.
    ///
    /// Commits immediately. Invoice creation does not use this; it bumps the
    /// counter inside its own transaction instead.
    pub async fn next(&self, hospital_id: &str, prefix: &str, at: DateTime<Utc>) -> DbResult<String> {
        let period = InvoicePeriod::from_date(at);
        let mut conn = self.pool.acquire().await?;
        let seq = next_sequence(&mut conn, hospital_id, prefix, period).await?;
        let number = format_invoice_number(prefix, period, seq);

        debug!(hospital_id = %hospital_id, invoice_number = %number, "Issued invoice number");
        Ok(number)
    }

    /// Last issued sequence for the period, or 0 if none was issued yet.
    pub async fn current(
        &self,
        hospital_id: &str,
        prefix: &str,
        period: InvoicePeriod,
    ) -> DbResult<u32> {
        let seq: Option<i64> = sqlx::query_scalar(
            "SELECT last_seq FROM invoice_counters WHERE hospital_id = ?1 AND prefix = ?2 AND period = ?3",
        )
        .bind(hospital_id)
        .bind(prefix)
        .bind(period.key())
        .fetch_optional(&self.pool)
        .await?;

        Ok(seq.unwrap_or(0) as u32)
    }
}
