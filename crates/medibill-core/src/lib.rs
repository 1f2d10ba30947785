//! # medibill-core: Pure Billing Logic for MediBill
//!
//! This crate is the **heart** of the billing engine. It contains all billing
//! rules as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        MediBill Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    billing-api (axum)                           │   │
//! │  │    settings ──► invoices ──► payments ──► statistics           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ medibill-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   money   │  │  totals   │  │  payment  │  │ numbering │  │   │
//! │  │   │   Money   │  │ subtotal  │  │  status   │  │ INV-YYMM- │  │   │
//! │  │   │  TaxRate  │  │ tax/total │  │  balance  │  │   0001    │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   fees    │  │   lines   │  │  period   │  │ validation│  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • NO CLOCK READS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  medibill-db (Database Layer)                   │   │
//! │  │        SQLite queries, migrations, counters, repositories       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`types`] - Small value types (TaxRate, InvoiceType, PaymentStatus, ...)
//! - [`invoice`] - Invoice, line items, customer and source references
//! - [`settings`] - Per-tenant billing settings and their update struct
//! - [`totals`] - Line items → subtotal, tax, total
//! - [`payment`] - Payment status derivation
//! - [`numbering`] - Invoice number format
//! - [`fees`], [`lines`] - Line items from clinical sources
//! - [`draft`] - Everything above combined into an unnumbered invoice
//! - [`period`], [`statistics`] - Reporting windows and report shapes
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use medibill_core::money::Money;
//! use medibill_core::types::TaxRate;
//!
//! let consultation = Money::from_major(300);
//! let tax = consultation.calculate_tax(TaxRate::from_percent(18));
//! assert_eq!(consultation + tax, Money::from_major(354));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod clinical;
pub mod draft;
pub mod error;
pub mod fees;
pub mod invoice;
pub mod lines;
pub mod money;
pub mod numbering;
pub mod payment;
pub mod period;
pub mod settings;
pub mod statistics;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use invoice::{CustomerRef, Invoice, InvoiceDraft, LineItem, LineItemInput, SourceRef, WalkInCustomer};
pub use money::Money;
pub use settings::{BillingSettings, BillingSettingsUpdate, ConsultationFees};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items on one invoice.
pub const MAX_LINE_ITEMS: usize = 500;

/// Maximum quantity on a single line.
///
/// ## Business Reason
/// Catches typos (10000 strips instead of 10) before stock is touched.
pub const MAX_ITEM_QUANTITY: i64 = 9_999;

/// Payment method recorded when a caller does not name one and the tenant
/// accepts it.
pub const DEFAULT_PAYMENT_METHOD: &str = "cash";

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;
