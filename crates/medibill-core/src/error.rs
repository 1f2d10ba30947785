//! # Error Types
//!
//! Two layers, both raised before anything is stored:
//!
//! - [`ValidationError`] names the offending request field (`items[2].quantity`,
//!   `taxRateBps`, `customerName`) so the API can echo it back.
//! - [`CoreError`] covers billing rules that hold for the invoice as a whole.
//!
//! medibill-db wraps storage failures in its own `DbError`; billing-api folds
//! all three into `ServiceError` and finally `{code, message}` bodies.

use thiserror::Error;

/// Invoice-level billing rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invoice must contain at least one line item")]
    EmptyInvoice,

    /// Every line amount was zero.
    #[error("Invoice total must be greater than zero")]
    NothingToBill,

    /// A sum of minor units left the `i64` range.
    #[error("Monetary overflow while computing {context}")]
    Overflow { context: String },

    #[error("Malformed invoice number: {0}")]
    MalformedInvoiceNumber(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// A single request field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    #[error("{field} {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} must be one of: {}", allowed.join(", "))]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required { field: field.into() }
    }

    /// `reason` reads as a predicate on the field: "must not be after to".
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Name of the request field at fault.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::MustNotBeNegative { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. } => field,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_field() {
        assert_eq!(ValidationError::required("items").to_string(), "items is required");
        assert_eq!(
            ValidationError::invalid_format("from", "must not be after to").to_string(),
            "from must not be after to"
        );

        let err = ValidationError::NotAllowed {
            field: "paymentMethod".to_string(),
            allowed: vec!["cash".to_string(), "card".to_string()],
        };
        assert_eq!(err.to_string(), "paymentMethod must be one of: cash, card");
        assert_eq!(err.field(), "paymentMethod");
    }

    #[test]
    fn test_validation_passes_through_core_error() {
        let err: CoreError = ValidationError::MustNotBeNegative {
            field: "items[0].unitPrice".to_string(),
        }
        .into();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(err.to_string(), "items[0].unitPrice must not be negative");
    }

    #[test]
    fn test_overflow_message() {
        let err = CoreError::Overflow {
            context: "subtotal".to_string(),
        };
        assert_eq!(err.to_string(), "Monetary overflow while computing subtotal");
    }
}
