//! # Invoice Model
//!
//! The financial document and the tagged references it carries.
//!
//! ## Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Invoice                                                                │
//! │  ├── invoice_number   INV-2610-0001 (never renumbered)                  │
//! │  ├── customer         Registered { patient_id } | WalkIn { name, ... }  │
//! │  ├── source           None | Appointment | Prescription | LabOrder      │
//! │  ├── items[]          description, qty, unit_price, amount, tax code    │
//! │  ├── subtotal / tax_amount / total_amount          (immutable)          │
//! │  └── paid_amount / balance_due / payment_status /  (payment fields,     │
//! │      payment_method / payment_date                  mutable)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{CustomerKind, InvoiceType, PaymentStatus, SourceKind, TaxRate};

// =============================================================================
// Customer Reference
// =============================================================================

/// Who is being billed.
///
/// Exactly two cases, each carrying only its own fields. Walk-in details are
/// validated when the value is built (including during deserialization).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CustomerRef {
    Registered {
        #[serde(rename = "patientId")]
        patient_id: String,
    },
    WalkIn(WalkInCustomer),
}

impl CustomerRef {
    pub fn registered(patient_id: impl Into<String>) -> Result<Self, ValidationError> {
        let patient_id = patient_id.into();
        if patient_id.trim().is_empty() {
            return Err(ValidationError::required("patientId"));
        }
        Ok(CustomerRef::Registered { patient_id })
    }

    pub fn walk_in(
        name: impl Into<String>,
        contact: impl Into<String>,
        email: Option<String>,
        address: Option<String>,
    ) -> Result<Self, ValidationError> {
        WalkInCustomer::new(name, contact, email, address).map(CustomerRef::WalkIn)
    }

    pub fn kind(&self) -> CustomerKind {
        match self {
            CustomerRef::Registered { .. } => CustomerKind::Registered,
            CustomerRef::WalkIn(_) => CustomerKind::WalkIn,
        }
    }

    pub fn patient_id(&self) -> Option<&str> {
        match self {
            CustomerRef::Registered { patient_id } => Some(patient_id),
            CustomerRef::WalkIn(_) => None,
        }
    }

    pub fn walk_in_details(&self) -> Option<&WalkInCustomer> {
        match self {
            CustomerRef::WalkIn(customer) => Some(customer),
            CustomerRef::Registered { .. } => None,
        }
    }
}

/// A customer without a patient record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawWalkInCustomer")]
pub struct WalkInCustomer {
    name: String,
    contact: String,
    email: Option<String>,
    address: Option<String>,
}

impl WalkInCustomer {
    pub fn new(
        name: impl Into<String>,
        contact: impl Into<String>,
        email: Option<String>,
        address: Option<String>,
    ) -> Result<Self, ValidationError> {
        let name = name.into().trim().to_string();
        let contact = contact.into().trim().to_string();

        if name.is_empty() {
            return Err(ValidationError::required("customerName"));
        }
        if name.chars().count() > 200 {
            return Err(ValidationError::TooLong {
                field: "customerName".to_string(),
                max: 200,
            });
        }
        if contact.is_empty() {
            return Err(ValidationError::required("customerContact"));
        }
        if let Some(email) = email.as_deref() {
            if !email.trim().is_empty() && !email.contains('@') {
                return Err(ValidationError::invalid_format(
                    "customerEmail",
                    "must be an email address",
                ));
            }
        }

        Ok(WalkInCustomer {
            name,
            contact,
            email: email.filter(|e| !e.trim().is_empty()),
            address: address.filter(|a| !a.trim().is_empty()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contact(&self) -> &str {
        &self.contact
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWalkInCustomer {
    name: String,
    contact: String,
    email: Option<String>,
    address: Option<String>,
}

impl TryFrom<RawWalkInCustomer> for WalkInCustomer {
    type Error = ValidationError;

    fn try_from(raw: RawWalkInCustomer) -> Result<Self, Self::Error> {
        WalkInCustomer::new(raw.name, raw.contact, raw.email, raw.address)
    }
}

// =============================================================================
// Source Reference
// =============================================================================

/// The clinical document an invoice was generated from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SourceRef {
    Appointment(String),
    Prescription(String),
    LabOrder(String),
}

impl SourceRef {
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceRef::Appointment(_) => SourceKind::Appointment,
            SourceRef::Prescription(_) => SourceKind::Prescription,
            SourceRef::LabOrder(_) => SourceKind::LabOrder,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            SourceRef::Appointment(id) | SourceRef::Prescription(id) | SourceRef::LabOrder(id) => id,
        }
    }

    /// Rebuilds a reference from its stored (kind, id) pair.
    pub fn from_parts(kind: SourceKind, id: impl Into<String>) -> Self {
        let id = id.into();
        match kind {
            SourceKind::Appointment => SourceRef::Appointment(id),
            SourceKind::Prescription => SourceRef::Prescription(id),
            SourceKind::LabOrder => SourceRef::LabOrder(id),
        }
    }
}

// =============================================================================
// Line Items
// =============================================================================

/// A line item as supplied by a caller or built from a clinical source,
/// before totals are computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemInput {
    pub description: String,
    pub quantity: i64,
    pub unit_price: Money,
    /// Pre-computed amount. When present it is kept as-is (manual discounts).
    #[serde(default)]
    pub amount: Option<Money>,
    #[serde(default)]
    pub tax_code: Option<String>,
    /// Catalog medication this line dispenses (pharmacy only).
    #[serde(default)]
    pub medication_id: Option<String>,
}

impl LineItemInput {
    pub fn new(description: impl Into<String>, quantity: i64, unit_price: Money) -> Self {
        LineItemInput {
            description: description.into(),
            quantity,
            unit_price,
            amount: None,
            tax_code: None,
            medication_id: None,
        }
    }

    pub fn with_tax_code(mut self, code: impl Into<String>) -> Self {
        self.tax_code = Some(code.into());
        self
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_medication(mut self, medication_id: impl Into<String>) -> Self {
        self.medication_id = Some(medication_id.into());
        self
    }
}

/// A billed line on a persisted invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub description: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub amount: Money,
    pub tax_code: Option<String>,
    pub tax_rate: TaxRate,
    pub medication_id: Option<String>,
}

// =============================================================================
// Invoice Draft
// =============================================================================

/// A fully computed invoice that has not been numbered or stored yet.
///
/// Built by [`crate::draft::build_draft`]; the storage layer assigns the id,
/// invoice number and version inside its write transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceDraft {
    pub hospital_id: String,
    pub invoice_prefix: String,
    pub invoice_date: DateTime<Utc>,
    pub due_date: Option<NaiveDate>,
    pub customer: CustomerRef,
    pub doctor_id: Option<String>,
    pub source: Option<SourceRef>,
    pub invoice_type: InvoiceType,
    pub items: Vec<LineItem>,
    pub subtotal: Money,
    pub tax_rate: TaxRate,
    pub tax_amount: Money,
    pub total_amount: Money,
    pub paid_amount: Money,
    pub balance_due: Money,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    pub payment_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_by: String,
}

// =============================================================================
// Invoice
// =============================================================================

/// A persisted invoice.
///
/// Immutable apart from the payment fields; `version` increases with every
/// payment update and guards against lost updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    pub hospital_id: String,
    pub invoice_number: String,
    pub invoice_date: DateTime<Utc>,
    pub due_date: Option<NaiveDate>,
    pub customer: CustomerRef,
    pub doctor_id: Option<String>,
    pub source: Option<SourceRef>,
    pub invoice_type: InvoiceType,
    pub items: Vec<LineItem>,
    pub subtotal: Money,
    pub tax_rate: TaxRate,
    pub tax_amount: Money,
    pub total_amount: Money,
    pub paid_amount: Money,
    pub balance_due: Money,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    pub payment_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_by: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Assembles a stored invoice from a draft plus storage-assigned fields.
    pub fn from_draft(
        draft: InvoiceDraft,
        id: String,
        invoice_number: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Invoice {
            id,
            hospital_id: draft.hospital_id,
            invoice_number,
            invoice_date: draft.invoice_date,
            due_date: draft.due_date,
            customer: draft.customer,
            doctor_id: draft.doctor_id,
            source: draft.source,
            invoice_type: draft.invoice_type,
            items: draft.items,
            subtotal: draft.subtotal,
            tax_rate: draft.tax_rate,
            tax_amount: draft.tax_amount,
            total_amount: draft.total_amount,
            paid_amount: draft.paid_amount,
            balance_due: draft.balance_due,
            payment_method: draft.payment_method,
            payment_status: draft.payment_status,
            payment_date: draft.payment_date,
            notes: draft.notes,
            created_by: draft.created_by,
            version: 1,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn is_walk_in(&self) -> bool {
        matches!(self.customer, CustomerRef::WalkIn(_))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_in_requires_name_and_contact() {
        assert!(CustomerRef::walk_in("", "9999", None, None).is_err());
        assert!(CustomerRef::walk_in("Asha", "  ", None, None).is_err());
        assert!(CustomerRef::walk_in("Asha", "9999", Some("nope".into()), None).is_err());

        let customer = CustomerRef::walk_in(" Asha ", "9999", Some("".into()), None).unwrap();
        let details = customer.walk_in_details().unwrap();
        assert_eq!(details.name(), "Asha");
        assert_eq!(details.email(), None);
        assert_eq!(customer.kind(), CustomerKind::WalkIn);
        assert_eq!(customer.patient_id(), None);
    }

    #[test]
    fn test_customer_ref_wire_format() {
        let registered = CustomerRef::registered("p-1").unwrap();
        let json = serde_json::to_value(&registered).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "registered", "patientId": "p-1"}));

        let walk_in: CustomerRef = serde_json::from_value(serde_json::json!({
            "kind": "walk_in",
            "name": "Ravi",
            "contact": "98450",
        }))
        .unwrap();
        assert_eq!(walk_in.walk_in_details().unwrap().contact(), "98450");
    }

    #[test]
    fn test_invalid_walk_in_rejected_during_deserialization() {
        let result: Result<CustomerRef, _> = serde_json::from_value(serde_json::json!({
            "kind": "walk_in",
            "name": "",
            "contact": "98450",
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_source_ref_parts() {
        let source = SourceRef::from_parts(SourceKind::LabOrder, "lab-9");
        assert_eq!(source.kind(), SourceKind::LabOrder);
        assert_eq!(source.id(), "lab-9");
        assert_eq!(
            serde_json::to_value(&source).unwrap(),
            serde_json::json!({"kind": "lab_order", "id": "lab-9"})
        );
    }
}
