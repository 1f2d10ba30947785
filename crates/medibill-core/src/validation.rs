//! # Validation Module
//!
//! Input validation for everything a caller can hand the billing engine.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP handler (axum)                                          │
//! │  ├── Type validation (serde deserialization, deny_unknown_fields)      │
//! │  └── Walk-in customer construction (CustomerRef::walk_in)              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE: business rule validation                        │
//! │  ├── Line items, tax rate, prefix, payment amount and method           │
//! │  └── Runs before any storage write                                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints on amounts                                      │
//! │  └── UNIQUE (invoice_number), UNIQUE (hospital, source)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use medibill_core::validation::{validate_invoice_prefix, validate_payment_amount};
//! use medibill_core::money::Money;
//!
//! validate_invoice_prefix("INV").unwrap();
//! assert!(validate_invoice_prefix("inv 01").is_err());
//! assert!(validate_payment_amount(Money::zero()).is_err());
//! ```

use crate::error::ValidationError;
use crate::invoice::LineItemInput;
use crate::money::Money;
use crate::types::TaxRate;
use crate::{DEFAULT_PAGE_LIMIT, MAX_ITEM_QUANTITY, MAX_LINE_ITEMS, MAX_PAGE_LIMIT};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Line Items
// =============================================================================

/// Validates a single line item before totals are computed.
///
/// ## Rules
/// - description is required (at most 500 characters)
/// - quantity is between 1 and [`MAX_ITEM_QUANTITY`]
/// - unit price is not negative
/// - a caller-supplied amount is not negative
pub fn validate_line_item(index: usize, item: &LineItemInput) -> ValidationResult<()> {
    let field = |name: &str| format!("items[{}].{}", index, name);

    let description = item.description.trim();
    if description.is_empty() {
        return Err(ValidationError::required(field("description")));
    }
    if description.chars().count() > 500 {
        return Err(ValidationError::TooLong {
            field: field("description"),
            max: 500,
        });
    }

    if item.quantity < 1 || item.quantity > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: field("quantity"),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    if item.unit_price.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field("unitPrice"),
        });
    }

    if let Some(amount) = item.amount {
        if amount.is_negative() {
            return Err(ValidationError::MustNotBeNegative {
                field: field("amount"),
            });
        }
    }

    Ok(())
}

/// Validates the item count and every item in order, reporting the first
/// failure.
pub fn validate_line_items(items: &[LineItemInput]) -> ValidationResult<()> {
    if items.is_empty() {
        return Err(ValidationError::required("items"));
    }
    if items.len() > MAX_LINE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_LINE_ITEMS as i64,
        });
    }
    items
        .iter()
        .enumerate()
        .try_for_each(|(index, item)| validate_line_item(index, item))
}

// =============================================================================
// Settings
// =============================================================================

/// Tax rate must be between 0 and 100% inclusive.
pub fn validate_tax_rate(rate: TaxRate) -> ValidationResult<()> {
    if rate.bps() > TaxRate::MAX_BPS {
        return Err(ValidationError::OutOfRange {
            field: "taxRateBps".to_string(),
            min: 0,
            max: TaxRate::MAX_BPS as i64,
        });
    }
    Ok(())
}

/// Validates an invoice number prefix.
///
/// ## Rules
/// - 1 to 10 characters
/// - only `A-Z`, `0-9` and `-`
/// - must not start or end with `-` (the number itself is `-` separated)
pub fn validate_invoice_prefix(prefix: &str) -> ValidationResult<()> {
    if prefix.is_empty() {
        return Err(ValidationError::required("invoicePrefix"));
    }
    if prefix.len() > 10 {
        return Err(ValidationError::TooLong {
            field: "invoicePrefix".to_string(),
            max: 10,
        });
    }
    if !prefix
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(ValidationError::invalid_format(
            "invoicePrefix",
            "must contain only A-Z, 0-9 and '-'",
        ));
    }
    if prefix.starts_with('-') || prefix.ends_with('-') {
        return Err(ValidationError::invalid_format(
            "invoicePrefix",
            "must not start or end with '-'",
        ));
    }
    Ok(())
}

pub fn validate_currency_symbol(symbol: &str) -> ValidationResult<()> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(ValidationError::required("currencySymbol"));
    }
    if symbol.chars().count() > 5 {
        return Err(ValidationError::TooLong {
            field: "currencySymbol".to_string(),
            max: 5,
        });
    }
    Ok(())
}

/// Validates and normalizes the accepted payment method set.
///
/// Methods are trimmed and lowercased; duplicates collapse to one entry while
/// preserving first-seen order.
pub fn normalize_payment_methods(methods: &[String]) -> ValidationResult<Vec<String>> {
    let mut normalized: Vec<String> = Vec::with_capacity(methods.len());

    for method in methods {
        let method = method.trim().to_lowercase();
        if method.is_empty() {
            return Err(ValidationError::invalid_format(
                "acceptedPaymentMethods",
                "must not contain empty names",
            ));
        }
        if method.len() > 30 {
            return Err(ValidationError::TooLong {
                field: "acceptedPaymentMethods".to_string(),
                max: 30,
            });
        }
        if !normalized.contains(&method) {
            normalized.push(method);
        }
    }

    if normalized.is_empty() {
        return Err(ValidationError::required("acceptedPaymentMethods"));
    }
    Ok(normalized)
}

pub fn validate_fee(field: &str, fee: Money) -> ValidationResult<()> {
    if fee.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

pub fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

// =============================================================================
// Payments
// =============================================================================

/// A recorded payment must be strictly positive.
pub fn validate_payment_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }
    Ok(())
}

/// Initial paid amount on creation may be zero but never negative.
pub fn validate_initial_paid_amount(amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "paidAmount".to_string(),
        });
    }
    Ok(())
}

/// Resolves a requested payment method against the tenant's accepted set.
///
/// Matching is case-insensitive and the accepted spelling is returned. With
/// no method requested, `cash` is used if the tenant accepts it, otherwise
/// the first accepted method.
pub fn resolve_payment_method(
    requested: Option<&str>,
    accepted: &[String],
) -> ValidationResult<String> {
    let requested = match requested.map(str::trim).filter(|m| !m.is_empty()) {
        Some(method) => method,
        None => {
            return accepted
                .iter()
                .find(|m| m.eq_ignore_ascii_case(crate::DEFAULT_PAYMENT_METHOD))
                .or_else(|| accepted.first())
                .cloned()
                .ok_or_else(|| ValidationError::required("paymentMethod"))
        }
    };

    accepted
        .iter()
        .find(|m| m.eq_ignore_ascii_case(requested))
        .cloned()
        .ok_or_else(|| ValidationError::NotAllowed {
            field: "paymentMethod".to_string(),
            allowed: accepted.to_vec(),
        })
}

// =============================================================================
// Pagination
// =============================================================================

/// Applies pagination defaults and bounds, returning `(page, limit)`.
pub fn validate_pagination(page: Option<u32>, limit: Option<u32>) -> ValidationResult<(u32, u32)> {
    let page = page.unwrap_or(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);

    if page < 1 {
        return Err(ValidationError::MustBePositive {
            field: "page".to_string(),
        });
    }
    if limit < 1 || limit > MAX_PAGE_LIMIT {
        return Err(ValidationError::OutOfRange {
            field: "limit".to_string(),
            min: 1,
            max: MAX_PAGE_LIMIT as i64,
        });
    }
    Ok((page, limit))
}

// =============================================================================
// Unit Tests
// =============================================================================
