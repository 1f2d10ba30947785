//! # Invoice Draft Builder
//!
//! The pure half of invoice creation: every entry point (manual,
//! consultation, prescription, lab order, walk-in) ends up here with its line
//! items already built.
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ DraftRequest │──►│   totals::   │──►│  payment::   │──►│ InvoiceDraft │
//! │ + settings   │   │  calculate   │   │   derive     │   │ (unnumbered) │
//! └──────────────┘   └──────────────┘   └──────────────┘   └──────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{CoreResult, ValidationError};
use crate::invoice::{CustomerRef, InvoiceDraft, LineItemInput, SourceRef};
use crate::money::Money;
use crate::payment;
use crate::settings::BillingSettings;
use crate::totals;
use crate::types::InvoiceType;
use crate::validation::{resolve_payment_method, validate_initial_paid_amount, validate_text};

/// Everything a caller decides about a new invoice.
#[derive(Debug, Clone)]
pub struct DraftRequest {
    pub customer: CustomerRef,
    pub doctor_id: Option<String>,
    pub source: Option<SourceRef>,
    pub invoice_type: InvoiceType,
    pub items: Vec<LineItemInput>,
    pub payment_method: Option<String>,
    pub paid_amount: Money,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_by: String,
}

/// Validates the request and computes totals and payment state.
pub fn build_draft(
    request: DraftRequest,
    settings: &BillingSettings,
    now: DateTime<Utc>,
) -> CoreResult<InvoiceDraft> {
    if request.created_by.trim().is_empty() {
        return Err(ValidationError::required("createdBy").into());
    }
    validate_initial_paid_amount(request.paid_amount)?;

    if let Some(due) = request.due_date {
        if due < now.date_naive() {
            return Err(ValidationError::invalid_format(
                "dueDate",
                "must not be before the invoice date",
            )
            .into());
        }
    }

    let notes = request
        .notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    if let Some(notes) = &notes {
        validate_text("notes", notes, 1000)?;
    }

    let totals = totals::calculate(&request.items, settings.tax_rate_bps)?;
    let payment_method = resolve_payment_method(
        request.payment_method.as_deref(),
        &settings.accepted_payment_methods,
    )?;
    let state = payment::derive(totals.total_amount, request.paid_amount, None, now);

    Ok(InvoiceDraft {
        hospital_id: settings.hospital_id.clone(),
        invoice_prefix: settings.invoice_prefix.clone(),
        invoice_date: now,
        due_date: request.due_date,
        customer: request.customer,
        doctor_id: request.doctor_id,
        source: request.source,
        invoice_type: request.invoice_type,
        items: totals.items,
        subtotal: totals.subtotal,
        tax_rate: totals.tax_rate,
        tax_amount: totals.tax_amount,
        total_amount: totals.total_amount,
        paid_amount: request.paid_amount,
        balance_due: state.balance_due,
        payment_method,
        payment_status: state.status,
        payment_date: state.payment_date,
        notes,
        created_by: request.created_by,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::types::{PaymentStatus, TaxRate};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 11, 0, 0).unwrap()
    }

    fn settings() -> BillingSettings {
        let mut settings = BillingSettings::defaults("h-1", None, now());
        settings.tax_rate_bps = TaxRate::from_percent(18);
        settings
    }

    fn request(paid: i64) -> DraftRequest {
        DraftRequest {
            customer: CustomerRef::registered("p-1").unwrap(),
            doctor_id: None,
            source: None,
            invoice_type: InvoiceType::Consultation,
            items: vec![
                LineItemInput::new("Dressing", 2, Money::from_major(500)),
                LineItemInput::new("X-Ray", 1, Money::from_major(1000)),
            ],
            payment_method: None,
            paid_amount: Money::from_major(paid),
            due_date: None,
            notes: Some("  ".into()),
            created_by: "u-1".into(),
        }
    }

    #[test]
    fn test_unpaid_manual_draft() {
        let draft = build_draft(request(0), &settings(), now()).unwrap();

        assert_eq!(draft.total_amount, Money::from_major(2360));
        assert_eq!(draft.payment_status, PaymentStatus::Unpaid);
        assert_eq!(draft.balance_due, Money::from_major(2360));
        assert_eq!(draft.payment_method, "cash");
        assert_eq!(draft.invoice_prefix, "INV");
        assert_eq!(draft.notes, None);
    }

    #[test]
    fn test_partial_draft() {
        let draft = build_draft(request(1000), &settings(), now()).unwrap();

        assert_eq!(draft.payment_status, PaymentStatus::Partial);
        assert_eq!(draft.balance_due, Money::from_major(1360));
        assert_eq!(draft.payment_date, None);
    }

    #[test]
    fn test_paid_in_full_sets_payment_date() {
        let draft = build_draft(request(2360), &settings(), now()).unwrap();
        assert_eq!(draft.payment_status, PaymentStatus::Paid);
        assert_eq!(draft.payment_date, Some(now()));
    }

    #[test]
    fn test_rejects_unaccepted_method_and_negative_paid() {
        let mut req = request(0);
        req.payment_method = Some("cheque".into());
        assert!(matches!(build_draft(req, &settings(), now()), Err(CoreError::Validation(_))));

        assert!(build_draft(request(-5), &settings(), now()).is_err());
    }

    #[test]
    fn test_rejects_due_date_in_the_past() {
        let mut req = request(0);
        req.due_date = NaiveDate::from_ymd_opt(2026, 10, 18);
        assert!(build_draft(req, &settings(), now()).is_err());
    }
}
