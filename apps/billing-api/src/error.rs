//! Error types for the billing API.
//!
//! ```text
//! DbError / CoreError / ValidationError
//!         │
//!         ▼
//!   ServiceError   (what an operation decided)
//!         │
//!         ▼
//!     ApiError     (status + {code, message} body)
//! ```
//!
//! Storage and internal details are logged; callers only ever see the code
//! and a short message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use medibill_core::{CoreError, Invoice, ValidationError};
use medibill_db::DbError;
use serde_json::json;
use tracing::{error, warn};

// =============================================================================
// Service Error
// =============================================================================

/// Outcomes of a service operation other than success.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("{0}")]
    Validation(String),

    /// The source document already has an invoice; carries that invoice.
    #[error("Already invoiced as {}", .0.invoice_number)]
    AlreadyInvoiced(Box<Invoice>),

    #[error("Insufficient stock for medication {medication_id}: requested {requested}, available {available}")]
    InsufficientStock {
        medication_id: String,
        requested: i64,
        available: i64,
    },

    #[error("Invoice {id} kept changing; payment not recorded")]
    ConcurrentModification { id: String },

    #[error("Storage unavailable: {0}")]
    Unavailable(DbError),

    #[error("Storage error: {0}")]
    Storage(DbError),
}

impl ServiceError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        ServiceError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(inner) => inner.into(),
            other => ServiceError::Validation(other.to_string()),
        }
    }
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ServiceError::NotFound { entity, id },
            DbError::InsufficientStock {
                medication_id,
                requested,
                available,
            } => ServiceError::InsufficientStock {
                medication_id,
                requested,
                available,
            },
            DbError::VersionConflict { id, .. } => ServiceError::ConcurrentModification { id },
            err if err.is_transient() => ServiceError::Unavailable(err),
            err => ServiceError::Storage(err),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

// =============================================================================
// API Error
// =============================================================================

/// Machine-readable error codes returned in every error body.
pub mod codes {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const ALREADY_INVOICED: &str = "ALREADY_INVOICED";
    pub const INSUFFICIENT_STOCK: &str = "INSUFFICIENT_STOCK";
    pub const CONCURRENT_MODIFICATION: &str = "CONCURRENT_MODIFICATION";
    pub const STORAGE_UNAVAILABLE: &str = "STORAGE_UNAVAILABLE";
    pub const INTERNAL: &str = "INTERNAL";
}

/// Error returned by handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Malformed request: bad JSON, bad query string, missing tenant header.
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Service(err) => match err {
                ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
                ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
                ServiceError::AlreadyInvoiced(_)
                | ServiceError::InsufficientStock { .. }
                | ServiceError::ConcurrentModification { .. } => StatusCode::CONFLICT,
                ServiceError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                ServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => codes::VALIDATION_ERROR,
            ApiError::Service(err) => match err {
                ServiceError::NotFound { .. } => codes::NOT_FOUND,
                ServiceError::Validation(_) => codes::VALIDATION_ERROR,
                ServiceError::AlreadyInvoiced(_) => codes::ALREADY_INVOICED,
                ServiceError::InsufficientStock { .. } => codes::INSUFFICIENT_STOCK,
                ServiceError::ConcurrentModification { .. } => codes::CONCURRENT_MODIFICATION,
                ServiceError::Unavailable(_) => codes::STORAGE_UNAVAILABLE,
                ServiceError::Storage(_) => codes::INTERNAL,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let body = match self {
            ApiError::Service(ServiceError::AlreadyInvoiced(invoice)) => json!({
                "code": code,
                "message": format!("Already invoiced as {}", invoice.invoice_number),
                "invoiceId": invoice.id,
                "invoiceNumber": invoice.invoice_number,
                "invoice": invoice,
            }),
            ApiError::Service(ServiceError::InsufficientStock {
                medication_id,
                requested,
                available,
            }) => json!({
                "code": code,
                "message": format!(
                    "Insufficient stock for medication {}: requested {}, available {}",
                    medication_id, requested, available
                ),
                "medicationId": medication_id,
                "requested": requested,
                "available": available,
            }),
            ApiError::Service(ServiceError::Unavailable(err)) => {
                warn!(error = %err, "Storage unavailable");
                json!({ "code": code, "message": "Storage is temporarily unavailable, retry later" })
            }
            ApiError::Service(ServiceError::Storage(err)) => {
                error!(error = %err, "Storage error");
                json!({ "code": code, "message": "Internal server error" })
            }
            other => json!({ "code": code, "message": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_errors_map_to_service_errors() {
        let err: ServiceError = DbError::Busy.into();
        assert!(matches!(err, ServiceError::Unavailable(_)));

        let err: ServiceError = DbError::not_found("Invoice", "inv-1").into();
        assert!(matches!(err, ServiceError::NotFound { .. }));

        let err: ServiceError = DbError::VersionConflict {
            entity: "Invoice".to_string(),
            id: "inv-1".to_string(),
        }
        .into();
        assert!(matches!(err, ServiceError::ConcurrentModification { .. }));

        let err: ServiceError = DbError::QueryFailed("syntax".to_string()).into();
        assert!(matches!(err, ServiceError::Storage(_)));
    }

    #[test]
    fn test_status_and_code() {
        let cases = [
            (ApiError::from(ServiceError::not_found("Patient", "p")), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (
                ApiError::from(ServiceError::Validation("bad".to_string())),
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
            ),
            (
                ApiError::from(ServiceError::ConcurrentModification { id: "i".to_string() }),
                StatusCode::CONFLICT,
                "CONCURRENT_MODIFICATION",
            ),
            (
                ApiError::from(ServiceError::Unavailable(DbError::PoolExhausted)),
                StatusCode::SERVICE_UNAVAILABLE,
                "STORAGE_UNAVAILABLE",
            ),
            (
                ApiError::from(ServiceError::Storage(DbError::Internal("x".to_string()))),
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL",
            ),
            (ApiError::bad_request("no header"), StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        ];

        for (err, status, code) in cases {
            assert_eq!(err.status(), status);
            assert_eq!(err.code(), code);
        }
    }

    #[test]
    fn test_core_validation_is_unwrapped() {
        let err: ServiceError = CoreError::Validation(ValidationError::required("createdBy")).into();
        match err {
            ServiceError::Validation(message) => assert_eq!(message, "createdBy is required"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
