//! # Billing Settings Repository
//!
//! One row per hospital, created lazily with system defaults.
//!
//! ## Lazy Creation Without Races
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Request A                         Request B                           │
//! │  INSERT defaults                   INSERT defaults                      │
//! │  ON CONFLICT DO NOTHING  (1 row)   ON CONFLICT DO NOTHING  (0 rows)    │
//! │  SELECT ─► row                     SELECT ─► same row                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use medibill_core::{BillingSettings, ConsultationFees, Money, TaxRate};

#[derive(Debug, sqlx::FromRow)]
struct SettingsRow {
    hospital_id: String,
    fee_standard: i64,
    fee_follow_up: i64,
    fee_specialist: i64,
    fee_emergency: i64,
    tax_registration_number: String,
    tax_rate_bps: i64,
    currency_symbol: String,
    accepted_payment_methods: String,
    invoice_prefix: String,
    terms_text: String,
    updated_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SettingsRow> for BillingSettings {
    type Error = DbError;

    fn try_from(row: SettingsRow) -> Result<Self, Self::Error> {
        let methods: Vec<String> = serde_json::from_str(&row.accepted_payment_methods)
            .map_err(|e| DbError::corrupt("billing_settings", &row.hospital_id, e))?;
        let bps = u32::try_from(row.tax_rate_bps)
            .map_err(|e| DbError::corrupt("billing_settings", &row.hospital_id, e))?;

        Ok(BillingSettings {
            hospital_id: row.hospital_id,
            consultation_fees: ConsultationFees {
                standard: Money::from_minor(row.fee_standard),
                follow_up: Money::from_minor(row.fee_follow_up),
                specialist: Money::from_minor(row.fee_specialist),
                emergency: Money::from_minor(row.fee_emergency),
            },
            tax_registration_number: row.tax_registration_number,
            tax_rate_bps: TaxRate::from_bps(bps),
            currency_symbol: row.currency_symbol,
            accepted_payment_methods: methods,
            invoice_prefix: row.invoice_prefix,
            terms_text: row.terms_text,
            updated_by: row.updated_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for per-hospital billing settings.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// Gets the settings row for a hospital, if one exists.
    pub async fn get(&self, hospital_id: &str) -> DbResult<Option<BillingSettings>> {
        let row = sqlx::query_as::<_, SettingsRow>(
            r#"
            SELECT
                hospital_id,
                fee_standard, fee_follow_up, fee_specialist, fee_emergency,
                tax_registration_number, tax_rate_bps, currency_symbol,
                accepted_payment_methods, invoice_prefix, terms_text,
                updated_by, created_at, updated_at
            FROM billing_settings
            WHERE hospital_id = ?1
            "#,
        )
        .bind(hospital_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(BillingSettings::try_from).transpose()
    }

    /// Returns the hospital's settings, creating the default row first if
    /// there is none. `updated_by` is recorded only when the row is created.
    pub async fn get_or_create(
        &self,
        hospital_id: &str,
        updated_by: Option<&str>,
    ) -> DbResult<BillingSettings> {
        let defaults =
            BillingSettings::defaults(hospital_id, updated_by.map(str::to_string), Utc::now());
        let methods = serde_json::to_string(&defaults.accepted_payment_methods)
            .map_err(|e| DbError::Internal(e.to_string()))?;

        let result = sqlx::query(
            r#"
            INSERT INTO billing_settings (
                hospital_id,
                fee_standard, fee_follow_up, fee_specialist, fee_emergency,
                tax_registration_number, tax_rate_bps, currency_symbol,
                accepted_payment_methods, invoice_prefix, terms_text,
                updated_by, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            ON CONFLICT (hospital_id) DO NOTHING
            "#,
        )
        .bind(&defaults.hospital_id)
        .bind(defaults.consultation_fees.standard.minor())
        .bind(defaults.consultation_fees.follow_up.minor())
        .bind(defaults.consultation_fees.specialist.minor())
        .bind(defaults.consultation_fees.emergency.minor())
        .bind(&defaults.tax_registration_number)
        .bind(defaults.tax_rate_bps.bps() as i64)
        .bind(&defaults.currency_symbol)
        .bind(&methods)
        .bind(&defaults.invoice_prefix)
        .bind(&defaults.terms_text)
        .bind(&defaults.updated_by)
        .bind(defaults.created_at)
        .bind(defaults.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            info!(hospital_id = %hospital_id, "Created default billing settings");
        }

        self.get(hospital_id)
            .await?
            .ok_or_else(|| DbError::not_found("BillingSettings", hospital_id))
    }

    /// Persists every field of an existing settings row.
    pub async fn save(&self, settings: &BillingSettings) -> DbResult<()> {
        debug!(hospital_id = %settings.hospital_id, "Saving billing settings");

        let methods = serde_json::to_string(&settings.accepted_payment_methods)
            .map_err(|e| DbError::Internal(e.to_string()))?;

        let result = sqlx::query(
            r#"
            UPDATE billing_settings SET
                fee_standard = ?2,
                fee_follow_up = ?3,
                fee_specialist = ?4,
                fee_emergency = ?5,
                tax_registration_number = ?6,
                tax_rate_bps = ?7,
                currency_symbol = ?8,
                accepted_payment_methods = ?9,
                invoice_prefix = ?10,
                terms_text = ?11,
                updated_by = ?12,
                updated_at = ?13
            WHERE hospital_id = ?1
            "#,
        )
        .bind(&settings.hospital_id)
        .bind(settings.consultation_fees.standard.minor())
        .bind(settings.consultation_fees.follow_up.minor())
        .bind(settings.consultation_fees.specialist.minor())
        .bind(settings.consultation_fees.emergency.minor())
        .bind(&settings.tax_registration_number)
        .bind(settings.tax_rate_bps.bps() as i64)
        .bind(&settings.currency_symbol)
        .bind(&methods)
        .bind(&settings.invoice_prefix)
        .bind(&settings.terms_text)
        .bind(&settings.updated_by)
        .bind(settings.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("BillingSettings", &settings.hospital_id));
        }
        Ok(())
    }
}
