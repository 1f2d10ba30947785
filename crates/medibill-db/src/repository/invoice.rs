//! # Invoice Repository
//!
//! Database operations for invoices and their line items.
//!
//! ## Creation Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │   1. invoice_counters upsert ... RETURNING last_seq                    │
//! │      (first statement: takes the write lock before anything is read)  │
//! │   2. source already invoiced?  ──yes──►  ROLLBACK, AlreadyInvoiced     │
//! │   3. number held by another hospital?  ──yes──►  bump counter again    │
//! │   4. INSERT invoices                                                   │
//! │   5. INSERT invoice_items (one per line, in order)                     │
//! │   6. pharmacy walk-in only:                                            │
//! │      UPDATE medications SET stock = stock - qty WHERE stock >= qty     │
//! │      0 rows ──► ROLLBACK, InsufficientStock / NotFound                 │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing is visible unless the whole invoice commits; a rolled back
//! creation also rolls back its counter bump. Invoice numbers are unique
//! across hospitals, so a hospital sharing its prefix with another skips the
//! numbers the other already issued; otherwise its sequence has no gaps.
//!
//! ## Payment Updates
//! Payment fields are written with a compare-and-swap on `version`. A
//! mismatch is reported as [`DbError::VersionConflict`] and the caller
//! re-reads and retries.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::counter::next_sequence;
use medibill_core::numbering::{format_invoice_number, InvoicePeriod};
use medibill_core::{
    CustomerKind, CustomerRef, Invoice, InvoiceDraft, InvoiceType, LineItem, Money,
    PaymentStatus, SourceKind, SourceRef, TaxRate, WalkInCustomer,
};

const INVOICE_COLUMNS: &str = r#"
    id, hospital_id, invoice_number, invoice_date, due_date,
    customer_kind, patient_id, customer_name, customer_contact, customer_email, customer_address,
    doctor_id, source_kind, source_id, invoice_type,
    subtotal, tax_rate_bps, tax_amount, total_amount,
    paid_amount, balance_due, payment_method, payment_status, payment_date,
    notes, created_by, version, created_at, updated_at
"#;

// =============================================================================
// Query Types
// =============================================================================

/// Whether creating the invoice also deducts medication stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockDeduction {
    None,
    /// Deduct `quantity` for every line that names a medication.
    FromLineItems,
}

/// Filters for [`InvoiceRepository::list`]. All fields are optional and
/// combined with AND; the date bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    pub patient_id: Option<String>,
    pub doctor_id: Option<String>,
    pub customer_kind: Option<CustomerKind>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub status: Option<PaymentStatus>,
    pub invoice_type: Option<InvoiceType>,
}

/// One page of invoices, newest first.
#[derive(Debug, Clone)]
pub struct InvoicePage {
    pub invoices: Vec<Invoice>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

/// New payment fields plus the version they were computed from.
#[derive(Debug, Clone)]
pub struct PaymentUpdate {
    pub expected_version: i64,
    pub paid_amount: Money,
    pub balance_due: Money,
    pub payment_status: PaymentStatus,
    pub payment_method: String,
    pub payment_date: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    id: String,
    hospital_id: String,
    invoice_number: String,
    invoice_date: DateTime<Utc>,
    due_date: Option<NaiveDate>,
    customer_kind: CustomerKind,
    patient_id: Option<String>,
    customer_name: Option<String>,
    customer_contact: Option<String>,
    customer_email: Option<String>,
    customer_address: Option<String>,
    doctor_id: Option<String>,
    source_kind: Option<SourceKind>,
    source_id: Option<String>,
    invoice_type: InvoiceType,
    subtotal: i64,
    tax_rate_bps: i64,
    tax_amount: i64,
    total_amount: i64,
    paid_amount: i64,
    balance_due: i64,
    payment_method: String,
    payment_status: PaymentStatus,
    payment_date: Option<DateTime<Utc>>,
    notes: Option<String>,
    created_by: String,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    invoice_id: String,
    description: String,
    quantity: i64,
    unit_price: i64,
    amount: i64,
    tax_code: Option<String>,
    tax_rate_bps: i64,
    medication_id: Option<String>,
}

fn tax_rate(entity: &str, id: &str, bps: i64) -> DbResult<TaxRate> {
    u32::try_from(bps)
        .map(TaxRate::from_bps)
        .map_err(|e| DbError::corrupt(entity, id, e))
}

impl ItemRow {
    fn into_line_item(self) -> DbResult<LineItem> {
        Ok(LineItem {
            tax_rate: tax_rate("invoice_items", &self.invoice_id, self.tax_rate_bps)?,
            description: self.description,
            quantity: self.quantity,
            unit_price: Money::from_minor(self.unit_price),
            amount: Money::from_minor(self.amount),
            tax_code: self.tax_code,
            medication_id: self.medication_id,
        })
    }
}

impl InvoiceRow {
    fn into_invoice(self, items: Vec<LineItem>) -> DbResult<Invoice> {
        let customer = match self.customer_kind {
            CustomerKind::Registered => CustomerRef::Registered {
                patient_id: self
                    .patient_id
                    .ok_or_else(|| DbError::corrupt("invoices", &self.id, "registered without patient_id"))?,
            },
            CustomerKind::WalkIn => CustomerRef::WalkIn(
                WalkInCustomer::new(
                    self.customer_name.unwrap_or_default(),
                    self.customer_contact.unwrap_or_default(),
                    self.customer_email,
                    self.customer_address,
                )
                .map_err(|e| DbError::corrupt("invoices", &self.id, e))?,
            ),
        };

        let source = match (self.source_kind, self.source_id) {
            (Some(kind), Some(id)) => Some(SourceRef::from_parts(kind, id)),
            (None, None) => None,
            _ => return Err(DbError::corrupt("invoices", &self.id, "half-set source reference")),
        };

        Ok(Invoice {
            tax_rate: tax_rate("invoices", &self.id, self.tax_rate_bps)?,
            id: self.id,
            hospital_id: self.hospital_id,
            invoice_number: self.invoice_number,
            invoice_date: self.invoice_date,
            due_date: self.due_date,
            customer,
            doctor_id: self.doctor_id,
            source,
            invoice_type: self.invoice_type,
            items,
            subtotal: Money::from_minor(self.subtotal),
            tax_amount: Money::from_minor(self.tax_amount),
            total_amount: Money::from_minor(self.total_amount),
            paid_amount: Money::from_minor(self.paid_amount),
            balance_due: Money::from_minor(self.balance_due),
            payment_method: self.payment_method,
            payment_status: self.payment_status,
            payment_date: self.payment_date,
            notes: self.notes,
            created_by: self.created_by,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for invoice database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = InvoiceRepository::new(pool);
///
/// let invoice = repo.create(draft, StockDeduction::None).await?;
/// let same = repo.get_by_id(&invoice.hospital_id, &invoice.id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Numbers and stores a draft, all in one transaction.
    ///
    /// ## Errors
    /// - [`DbError::AlreadyInvoiced`] if the draft's source already has an invoice
    /// - [`DbError::InsufficientStock`] / [`DbError::NotFound`] from stock deduction
    pub async fn create(&self, draft: InvoiceDraft, stock: StockDeduction) -> DbResult<Invoice> {
        let period = InvoicePeriod::from_date(draft.invoice_date);
        let mut tx = self.pool.begin().await?;

        let mut seq = next_sequence(&mut tx, &draft.hospital_id, &draft.invoice_prefix, period).await?;

        if let Some(source) = &draft.source {
            if let Some((invoice_id, invoice_number)) =
                find_source_in(&mut tx, &draft.hospital_id, source).await?
            {
                tx.rollback().await?;
                debug!(
                    hospital_id = %draft.hospital_id,
                    source_kind = %source.kind(),
                    source_id = %source.id(),
                    invoice_number = %invoice_number,
                    "Source already invoiced"
                );
                return Err(DbError::AlreadyInvoiced {
                    source_kind: source.kind().to_string(),
                    source_id: source.id().to_string(),
                    invoice_id,
                    invoice_number,
                });
            }
        }

        // Another hospital on the same prefix may already hold this number.
        let mut invoice_number = format_invoice_number(&draft.invoice_prefix, period, seq);
        while invoice_number_taken(&mut tx, &invoice_number).await? {
            debug!(
                hospital_id = %draft.hospital_id,
                invoice_number = %invoice_number,
                "Invoice number held by another hospital, skipping"
            );
            seq = next_sequence(&mut tx, &draft.hospital_id, &draft.invoice_prefix, period).await?;
            invoice_number = format_invoice_number(&draft.invoice_prefix, period, seq);
        }

        let id = Uuid::new_v4().to_string();
        let created_at = draft.invoice_date;

        debug!(id = %id, invoice_number = %invoice_number, "Inserting invoice");
        insert_invoice(&mut tx, &id, &invoice_number, &draft, created_at).await?;

        for (line_no, item) in draft.items.iter().enumerate() {
            insert_item(&mut tx, &id, line_no, item).await?;
        }

        if stock == StockDeduction::FromLineItems {
            for item in &draft.items {
                if let Some(medication_id) = &item.medication_id {
                    deduct_stock(&mut tx, &draft.hospital_id, medication_id, item.quantity).await?;
                }
            }
        }

        tx.commit().await?;

        info!(
            hospital_id = %draft.hospital_id,
            invoice_number = %invoice_number,
            invoice_type = %draft.invoice_type,
            total = %draft.total_amount,
            "Invoice created"
        );

        Ok(Invoice::from_draft(draft, id, invoice_number, created_at))
    }

    /// Gets an invoice with its items.
    pub async fn get_by_id(&self, hospital_id: &str, id: &str) -> DbResult<Option<Invoice>> {
        let row = sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {} FROM invoices WHERE id = ?1 AND hospital_id = ?2",
            INVOICE_COLUMNS
        ))
        .bind(id)
        .bind(hospital_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let mut items = self.load_items(&[row.id.clone()]).await?;
                let lines = items.remove(&row.id).unwrap_or_default();
                row.into_invoice(lines).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Finds the invoice generated from a clinical source document.
    pub async fn find_by_source(
        &self,
        hospital_id: &str,
        source: &SourceRef,
    ) -> DbResult<Option<Invoice>> {
        let mut conn = self.pool.acquire().await?;
        let found = find_source_in(&mut conn, hospital_id, source).await?;
        drop(conn);

        match found {
            Some((id, _)) => self.get_by_id(hospital_id, &id).await,
            None => Ok(None),
        }
    }

    /// Lists invoices matching `filter`, newest first.
    ///
    /// `page` starts at 1; bounds are validated by the caller.
    pub async fn list(
        &self,
        hospital_id: &str,
        filter: &InvoiceFilter,
        page: u32,
        limit: u32,
    ) -> DbResult<InvoicePage> {
        let offset = (page.saturating_sub(1) as i64) * limit as i64;

        let mut count_query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM invoices");
        push_filters(&mut count_query, hospital_id, filter);
        let total: i64 = count_query.build_query_scalar().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM invoices", INVOICE_COLUMNS));
        push_filters(&mut query, hospital_id, filter);
        query
            .push(" ORDER BY invoice_date DESC, invoice_number DESC LIMIT ")
            .push_bind(limit as i64)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows: Vec<InvoiceRow> = query.build_query_as().fetch_all(&self.pool).await?;

        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let mut items = self.load_items(&ids).await?;

        let invoices = rows
            .into_iter()
            .map(|row| {
                let lines = items.remove(&row.id).unwrap_or_default();
                row.into_invoice(lines)
            })
            .collect::<DbResult<Vec<_>>>()?;

        debug!(hospital_id = %hospital_id, total, returned = invoices.len(), "Listed invoices");

        Ok(InvoicePage {
            invoices,
            total,
            page,
            limit,
        })
    }

    /// Writes new payment fields if the row is still at `expected_version`.
    ///
    /// ## Errors
    /// - [`DbError::NotFound`] if the invoice does not exist for this hospital
    /// - [`DbError::VersionConflict`] if another update got there first
    pub async fn apply_payment(
        &self,
        hospital_id: &str,
        id: &str,
        update: &PaymentUpdate,
    ) -> DbResult<Invoice> {
        debug!(
            id = %id,
            expected_version = update.expected_version,
            paid = %update.paid_amount,
            "Applying payment"
        );

        let result = sqlx::query(
            r#"
            UPDATE invoices SET
                paid_amount = ?1,
                balance_due = ?2,
                payment_status = ?3,
                payment_method = ?4,
                payment_date = ?5,
                updated_at = ?6,
                version = version + 1
            WHERE id = ?7 AND hospital_id = ?8 AND version = ?9
            "#,
        )
        .bind(update.paid_amount.minor())
        .bind(update.balance_due.minor())
        .bind(update.payment_status)
        .bind(&update.payment_method)
        .bind(update.payment_date)
        .bind(update.updated_at)
        .bind(id)
        .bind(hospital_id)
        .bind(update.expected_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let exists: Option<i64> =
                sqlx::query_scalar("SELECT version FROM invoices WHERE id = ?1 AND hospital_id = ?2")
                    .bind(id)
                    .bind(hospital_id)
                    .fetch_optional(&self.pool)
                    .await?;

            return Err(match exists {
                Some(_) => DbError::VersionConflict {
                    entity: "Invoice".to_string(),
                    id: id.to_string(),
                },
                None => DbError::not_found("Invoice", id),
            });
        }

        self.get_by_id(hospital_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", id))
    }

    async fn load_items(&self, invoice_ids: &[String]) -> DbResult<HashMap<String, Vec<LineItem>>> {
        let mut grouped: HashMap<String, Vec<LineItem>> = HashMap::new();
        if invoice_ids.is_empty() {
            return Ok(grouped);
        }

        let mut query = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT invoice_id, description, quantity, unit_price, amount,
                   tax_code, tax_rate_bps, medication_id
            FROM invoice_items
            WHERE invoice_id IN ("#,
        );
        let mut ids = query.separated(", ");
        for id in invoice_ids {
            ids.push_bind(id.clone());
        }
        ids.push_unseparated(") ORDER BY invoice_id, line_no");

        let rows: Vec<ItemRow> = query.build_query_as().fetch_all(&self.pool).await?;
        for row in rows {
            let invoice_id = row.invoice_id.clone();
            grouped.entry(invoice_id).or_default().push(row.into_line_item()?);
        }
        Ok(grouped)
    }
}

// =============================================================================
// Transaction Steps
// =============================================================================

async fn find_source_in(
    conn: &mut SqliteConnection,
    hospital_id: &str,
    source: &SourceRef,
) -> DbResult<Option<(String, String)>> {
    let found: Option<(String, String)> = sqlx::query_as(
        "SELECT id, invoice_number FROM invoices WHERE hospital_id = ?1 AND source_kind = ?2 AND source_id = ?3",
    )
    .bind(hospital_id)
    .bind(source.kind())
    .bind(source.id())
    .fetch_optional(&mut *conn)
    .await?;
    Ok(found)
}

async fn invoice_number_taken(conn: &mut SqliteConnection, invoice_number: &str) -> DbResult<bool> {
    let taken: Option<i64> = sqlx::query_scalar("SELECT 1 FROM invoices WHERE invoice_number = ?1")
        .bind(invoice_number)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(taken.is_some())
}

async fn insert_invoice(
    conn: &mut SqliteConnection,
    id: &str,
    invoice_number: &str,
    draft: &InvoiceDraft,
    created_at: DateTime<Utc>,
) -> DbResult<()> {
    let walk_in = draft.customer.walk_in_details();

    sqlx::query(
        r#"
        INSERT INTO invoices (
            id, hospital_id, invoice_number, invoice_date, due_date,
            customer_kind, patient_id, customer_name, customer_contact, customer_email, customer_address,
            doctor_id, source_kind, source_id, invoice_type,
            subtotal, tax_rate_bps, tax_amount, total_amount,
            paid_amount, balance_due, payment_method, payment_status, payment_date,
            notes, created_by, version, created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5,
            ?6, ?7, ?8, ?9, ?10, ?11,
            ?12, ?13, ?14, ?15,
            ?16, ?17, ?18, ?19,
            ?20, ?21, ?22, ?23, ?24,
            ?25, ?26, 1, ?27, ?27
        )
        "#,
    )
    .bind(id)
    .bind(&draft.hospital_id)
    .bind(invoice_number)
    .bind(draft.invoice_date)
    .bind(draft.due_date)
    .bind(draft.customer.kind())
    .bind(draft.customer.patient_id())
    .bind(walk_in.map(|c| c.name()))
    .bind(walk_in.map(|c| c.contact()))
    .bind(walk_in.and_then(|c| c.email()))
    .bind(walk_in.and_then(|c| c.address()))
    .bind(&draft.doctor_id)
    .bind(draft.source.as_ref().map(|s| s.kind()))
    .bind(draft.source.as_ref().map(|s| s.id()))
    .bind(draft.invoice_type)
    .bind(draft.subtotal.minor())
    .bind(draft.tax_rate.bps() as i64)
    .bind(draft.tax_amount.minor())
    .bind(draft.total_amount.minor())
    .bind(draft.paid_amount.minor())
    .bind(draft.balance_due.minor())
    .bind(&draft.payment_method)
    .bind(draft.payment_status)
    .bind(draft.payment_date)
    .bind(&draft.notes)
    .bind(&draft.created_by)
    .bind(created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn insert_item(
    conn: &mut SqliteConnection,
    invoice_id: &str,
    line_no: usize,
    item: &LineItem,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO invoice_items (
            id, invoice_id, line_no, description, quantity,
            unit_price, amount, tax_code, tax_rate_bps, medication_id
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(invoice_id)
    .bind(line_no as i64)
    .bind(&item.description)
    .bind(item.quantity)
    .bind(item.unit_price.minor())
    .bind(item.amount.minor())
    .bind(&item.tax_code)
    .bind(item.tax_rate.bps() as i64)
    .bind(&item.medication_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn deduct_stock(
    conn: &mut SqliteConnection,
    hospital_id: &str,
    medication_id: &str,
    quantity: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE medications
        SET stock = stock - ?1, updated_at = ?2
        WHERE id = ?3 AND hospital_id = ?4 AND stock >= ?5
        "#,
    )
    .bind(quantity)
    .bind(Utc::now())
    .bind(medication_id)
    .bind(hospital_id)
    .bind(quantity)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 1 {
        debug!(medication_id = %medication_id, quantity, "Stock deducted");
        return Ok(());
    }

    let available: Option<i64> =
        sqlx::query_scalar("SELECT stock FROM medications WHERE id = ?1 AND hospital_id = ?2")
            .bind(medication_id)
            .bind(hospital_id)
            .fetch_optional(&mut *conn)
            .await?;

    Err(match available {
        Some(available) => DbError::InsufficientStock {
            medication_id: medication_id.to_string(),
            requested: quantity,
            available,
        },
        None => DbError::not_found("Medication", medication_id),
    })
}

fn push_filters(query: &mut QueryBuilder<'_, Sqlite>, hospital_id: &str, filter: &InvoiceFilter) {
    query.push(" WHERE hospital_id = ").push_bind(hospital_id.to_string());

    if let Some(patient_id) = &filter.patient_id {
        query.push(" AND patient_id = ").push_bind(patient_id.clone());
    }
    if let Some(doctor_id) = &filter.doctor_id {
        query.push(" AND doctor_id = ").push_bind(doctor_id.clone());
    }
    if let Some(kind) = filter.customer_kind {
        query.push(" AND customer_kind = ").push_bind(kind);
    }
    if let Some(from) = filter.from {
        query.push(" AND invoice_date >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        query.push(" AND invoice_date <= ").push_bind(to);
    }
    if let Some(status) = filter.status {
        query.push(" AND payment_status = ").push_bind(status);
    }
    if let Some(invoice_type) = filter.invoice_type {
        query.push(" AND invoice_type = ").push_bind(invoice_type);
    }
}
