//! # Domain Types
//!
//! Small value types shared by every billing module.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │  InvoiceType    │   │ PaymentStatus   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bps (u32)      │   │  Consultation   │   │  Unpaid         │       │
//! │  │  1800 = 18.00%  │   │  Laboratory     │   │  Partial        │       │
//! │  └─────────────────┘   │  Pharmacy       │   │  Paid           │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │   SourceKind    │   │  CustomerKind   │                             │
//! │  │  ─────────────  │   │  ─────────────  │                             │
//! │  │  Appointment    │   │  Registered     │                             │
//! │  │  Prescription   │   │  WalkIn         │                             │
//! │  │  LabOrder       │   └─────────────────┘                             │
//! │  └─────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Tax classification code for health-care services (consultations, labs).
pub const HEALTH_SERVICES_TAX_CODE: &str = "9993";

/// Tax classification code for pharmaceutical products.
pub const PHARMACEUTICALS_TAX_CODE: &str = "3004";

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000, so 1800 bps = 18% exactly and the tax
/// computation never touches floating point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Upper bound: 100%.
    pub const MAX_BPS: u32 = 10_000;

    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a rate from a whole percentage (18 → 1800 bps).
    #[inline]
    pub const fn from_percent(percent: u32) -> Self {
        TaxRate(percent * 100)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

/// Displays as a percentage with two decimals (`18.00%`).
impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

// =============================================================================
// Invoice Type
// =============================================================================

/// Which department an invoice bills for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum InvoiceType {
    Consultation,
    Laboratory,
    Pharmacy,
}

impl InvoiceType {
    pub const ALL: [InvoiceType; 3] = [
        InvoiceType::Consultation,
        InvoiceType::Laboratory,
        InvoiceType::Pharmacy,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            InvoiceType::Consultation => "consultation",
            InvoiceType::Laboratory => "laboratory",
            InvoiceType::Pharmacy => "pharmacy",
        }
    }
}

impl fmt::Display for InvoiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "consultation" => Ok(InvoiceType::Consultation),
            "laboratory" | "lab" => Ok(InvoiceType::Laboratory),
            "pharmacy" => Ok(InvoiceType::Pharmacy),
            _ => Err(ValidationError::NotAllowed {
                field: "invoiceType".to_string(),
                allowed: InvoiceType::ALL.iter().map(|t| t.to_string()).collect(),
            }),
        }
    }
}

// =============================================================================
// Payment Status
// =============================================================================

/// Payment status, always derived from total vs. paid amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 3] = [
        PaymentStatus::Unpaid,
        PaymentStatus::Partial,
        PaymentStatus::Paid,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
        }
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Unpaid
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unpaid" => Ok(PaymentStatus::Unpaid),
            "partial" => Ok(PaymentStatus::Partial),
            "paid" => Ok(PaymentStatus::Paid),
            _ => Err(ValidationError::NotAllowed {
                field: "paymentStatus".to_string(),
                allowed: PaymentStatus::ALL.iter().map(|s| s.to_string()).collect(),
            }),
        }
    }
}

// =============================================================================
// Source Kind
// =============================================================================

/// The kind of clinical document an invoice was generated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Appointment,
    Prescription,
    LabOrder,
}

impl SourceKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Appointment => "appointment",
            SourceKind::Prescription => "prescription",
            SourceKind::LabOrder => "lab_order",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Customer Kind
// =============================================================================

/// Discriminant of [`crate::invoice::CustomerRef`], used for storage and
/// list filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum CustomerKind {
    Registered,
    WalkIn,
}

impl CustomerKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            CustomerKind::Registered => "registered",
            CustomerKind::WalkIn => "walk_in",
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_constructors() {
        assert_eq!(TaxRate::from_bps(825).bps(), 825);
        assert_eq!(TaxRate::from_percent(18).bps(), 1800);
        assert!(TaxRate::default().is_zero());
    }

    #[test]
    fn test_tax_rate_display() {
        assert_eq!(TaxRate::from_bps(1800).to_string(), "18.00%");
        assert_eq!(TaxRate::from_bps(825).to_string(), "8.25%");
    }

    #[test]
    fn test_invoice_type_parse() {
        assert_eq!("Consultation".parse::<InvoiceType>().unwrap(), InvoiceType::Consultation);
        assert_eq!("lab".parse::<InvoiceType>().unwrap(), InvoiceType::Laboratory);
        assert!("surgery".parse::<InvoiceType>().is_err());
    }

    #[test]
    fn test_payment_status_default_and_parse() {
        assert_eq!(PaymentStatus::default(), PaymentStatus::Unpaid);
        assert_eq!("PARTIAL".parse::<PaymentStatus>().unwrap(), PaymentStatus::Partial);
        assert!("refunded".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(serde_json::to_string(&InvoiceType::Laboratory).unwrap(), "\"laboratory\"");
        assert_eq!(serde_json::to_string(&SourceKind::LabOrder).unwrap(), "\"lab_order\"");
        assert_eq!(serde_json::to_string(&CustomerKind::WalkIn).unwrap(), "\"walk_in\"");
    }
}
