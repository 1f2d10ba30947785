//! Request and response bodies.
//!
//! Money fields are integers in minor units; dates are `YYYY-MM-DD`; all
//! keys are camelCase.

use chrono::{DateTime, NaiveDate, Utc};
use medibill_core::{CustomerRef, Invoice, InvoiceType, LineItemInput, Money};
use serde::{Deserialize, Serialize};

/// Options shared by every invoice creation request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceOptions {
    pub payment_method: Option<String>,
    /// Amount already paid at creation. Defaults to 0.
    pub paid_amount: Option<Money>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// `POST /billing/invoices`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualInvoiceRequest {
    pub customer: CustomerRef,
    pub doctor_id: Option<String>,
    pub invoice_type: InvoiceType,
    pub items: Vec<LineItemInput>,
    #[serde(flatten)]
    pub options: InvoiceOptions,
}

/// `POST /billing/invoices/consultation`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationInvoiceRequest {
    pub appointment_id: String,
    #[serde(flatten)]
    pub options: InvoiceOptions,
}

/// `POST /billing/invoices/pharmacy`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PharmacyInvoiceRequest {
    pub prescription_id: String,
    #[serde(flatten)]
    pub options: InvoiceOptions,
}

/// `POST /billing/invoices/laboratory`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaboratoryInvoiceRequest {
    pub lab_order_id: String,
    #[serde(flatten)]
    pub options: InvoiceOptions,
}

/// `POST /walkin/pharmacy/invoice` and `POST /walkin/laboratory/invoice`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalkInInvoiceRequest {
    pub customer_name: String,
    pub customer_contact: String,
    pub customer_email: Option<String>,
    pub customer_address: Option<String>,
    pub doctor_id: Option<String>,
    pub items: Vec<LineItemInput>,
    #[serde(flatten)]
    pub options: InvoiceOptions,
}

/// `PUT /billing/invoices/{id}/payment`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentRequest {
    /// Amount received now, added to what was already paid.
    pub amount: Money,
    pub payment_method: Option<String>,
    /// When the money was received. Defaults to now.
    pub payment_date: Option<DateTime<Utc>>,
}

/// `GET /billing/invoices` and `GET /walkin/invoices` query string.
///
/// Enum-valued filters are kept as strings and parsed by the service so bad
/// values get a proper validation message.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceListQuery {
    pub patient_id: Option<String>,
    pub doctor_id: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub invoice_type: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// `GET /billing/statistics` query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsQuery {
    pub period: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: i64) -> Self {
        let limit_i = i64::from(limit.max(1));
        Pagination {
            page,
            limit,
            total,
            total_pages: (total + limit_i - 1) / limit_i,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceListResponse {
    pub invoices: Vec<Invoice>,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_manual_request_shape() {
        let request: ManualInvoiceRequest = serde_json::from_value(json!({
            "customer": { "kind": "registered", "patientId": "pat-1" },
            "invoiceType": "consultation",
            "items": [
                { "description": "Dressing", "quantity": 2, "unitPrice": 50000 },
                { "description": "Review", "quantity": 1, "unitPrice": 100000 }
            ],
            "paidAmount": 100000,
            "dueDate": "2030-01-31"
        }))
        .unwrap();

        assert_eq!(request.customer.patient_id(), Some("pat-1"));
        assert_eq!(request.items.len(), 2);
        assert_eq!(request.options.paid_amount, Some(Money::from_major(1000)));
        assert!(request.options.payment_method.is_none());
    }

    #[test]
    fn test_walk_in_customer_must_be_named() {
        let result: Result<ManualInvoiceRequest, _> = serde_json::from_value(json!({
            "customer": { "kind": "walk_in", "name": "", "contact": "900" },
            "invoiceType": "laboratory",
            "items": []
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_pagination_pages() {
        assert_eq!(Pagination::new(1, 20, 0).total_pages, 0);
        assert_eq!(Pagination::new(1, 20, 20).total_pages, 1);
        assert_eq!(Pagination::new(1, 20, 21).total_pages, 2);
    }
}
