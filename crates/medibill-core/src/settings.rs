//! # Billing Settings
//!
//! Per-tenant billing configuration and the explicit update struct that is the
//! only way to change it.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PUT /billing/settings  { "taxRateBps": 1800, "invoicePrefix": "CH" }  │
//! │            │                                                            │
//! │            ▼                                                            │
//! │  BillingSettingsUpdate  (unknown fields rejected at deserialization)   │
//! │            │  validate()                                                │
//! │            ▼                                                            │
//! │  apply_to(&mut BillingSettings)  (only the fields that were sent)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::TaxRate;
use crate::validation::{
    normalize_payment_methods, validate_currency_symbol, validate_fee, validate_invoice_prefix,
    validate_tax_rate, validate_text, ValidationResult,
};

pub const DEFAULT_CURRENCY_SYMBOL: &str = "₹";
pub const DEFAULT_INVOICE_PREFIX: &str = "INV";
pub const DEFAULT_TERMS: &str = "Payment is due within 30 days of the invoice date.";
pub const DEFAULT_PAYMENT_METHODS: [&str; 4] = ["cash", "card", "upi", "insurance"];

// =============================================================================
// Consultation Fees
// =============================================================================

/// Consultation fee schedule, one amount per tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConsultationFees {
    pub standard: Money,
    pub follow_up: Money,
    pub specialist: Money,
    pub emergency: Money,
}

impl Default for ConsultationFees {
    fn default() -> Self {
        ConsultationFees {
            standard: Money::from_major(500),
            follow_up: Money::from_major(300),
            specialist: Money::from_major(1000),
            emergency: Money::from_major(1500),
        }
    }
}

impl ConsultationFees {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_fee("consultationFees.standard", self.standard)?;
        validate_fee("consultationFees.followUp", self.follow_up)?;
        validate_fee("consultationFees.specialist", self.specialist)?;
        validate_fee("consultationFees.emergency", self.emergency)?;
        Ok(())
    }
}

// =============================================================================
// Billing Settings
// =============================================================================

/// Billing configuration for one hospital. Exactly one per tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingSettings {
    pub hospital_id: String,
    pub consultation_fees: ConsultationFees,
    pub tax_registration_number: String,
    pub tax_rate_bps: TaxRate,
    pub currency_symbol: String,
    pub accepted_payment_methods: Vec<String>,
    pub invoice_prefix: String,
    pub terms_text: String,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BillingSettings {
    /// System defaults for a tenant that has never configured billing.
    pub fn defaults(
        hospital_id: impl Into<String>,
        updated_by: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        BillingSettings {
            hospital_id: hospital_id.into(),
            consultation_fees: ConsultationFees::default(),
            tax_registration_number: String::new(),
            tax_rate_bps: TaxRate::zero(),
            currency_symbol: DEFAULT_CURRENCY_SYMBOL.to_string(),
            accepted_payment_methods: DEFAULT_PAYMENT_METHODS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            invoice_prefix: DEFAULT_INVOICE_PREFIX.to_string(),
            terms_text: DEFAULT_TERMS.to_string(),
            updated_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// Formats an amount with the tenant's currency symbol (`₹354.00`).
    pub fn format_money(&self, amount: Money) -> String {
        if amount.is_negative() {
            format!("-{}{}", self.currency_symbol, -amount)
        } else {
            format!("{}{}", self.currency_symbol, amount)
        }
    }
}

// =============================================================================
// Settings Update
// =============================================================================

/// Partial update of [`BillingSettings`]. Every updatable field is listed
/// here; anything else in the request body is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BillingSettingsUpdate {
    pub consultation_fees: Option<ConsultationFees>,
    pub tax_registration_number: Option<String>,
    pub tax_rate_bps: Option<TaxRate>,
    pub currency_symbol: Option<String>,
    pub accepted_payment_methods: Option<Vec<String>>,
    pub invoice_prefix: Option<String>,
    pub terms_text: Option<String>,
}

impl BillingSettingsUpdate {
    pub fn is_empty(&self) -> bool {
        self == &BillingSettingsUpdate::default()
    }

    /// Validates every supplied field.
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(fees) = &self.consultation_fees {
            fees.validate()?;
        }
        if let Some(number) = &self.tax_registration_number {
            validate_text("taxRegistrationNumber", number.trim(), 50)?;
        }
        if let Some(rate) = self.tax_rate_bps {
            validate_tax_rate(rate)?;
        }
        if let Some(symbol) = &self.currency_symbol {
            validate_currency_symbol(symbol)?;
        }
        if let Some(methods) = &self.accepted_payment_methods {
            normalize_payment_methods(methods)?;
        }
        if let Some(prefix) = &self.invoice_prefix {
            validate_invoice_prefix(prefix.trim())?;
        }
        if let Some(terms) = &self.terms_text {
            validate_text("termsText", terms, 2000)?;
        }
        Ok(())
    }

    /// Validates, then writes the supplied fields onto `settings`.
    ///
    /// Nothing is changed when validation fails.
    pub fn apply_to(
        &self,
        settings: &mut BillingSettings,
        updated_by: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        self.validate()?;

        if let Some(fees) = self.consultation_fees {
            settings.consultation_fees = fees;
        }
        if let Some(number) = &self.tax_registration_number {
            settings.tax_registration_number = number.trim().to_string();
        }
        if let Some(rate) = self.tax_rate_bps {
            settings.tax_rate_bps = rate;
        }
        if let Some(symbol) = &self.currency_symbol {
            settings.currency_symbol = symbol.trim().to_string();
        }
        if let Some(methods) = &self.accepted_payment_methods {
            settings.accepted_payment_methods = normalize_payment_methods(methods)?;
        }
        if let Some(prefix) = &self.invoice_prefix {
            settings.invoice_prefix = prefix.trim().to_string();
        }
        if let Some(terms) = &self.terms_text {
            settings.terms_text = terms.clone();
        }

        settings.updated_by = Some(updated_by.to_string());
        settings.updated_at = now;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
