//! Recording payments against existing invoices.
//!
//! A payment adds to `paidAmount` and re-derives status, balance and payment
//! date. The write is a compare-and-swap on the invoice version; on conflict
//! the invoice is re-read and the payment re-applied to the fresh state.

use chrono::Utc;
use medibill_core::payment;
use medibill_core::validation::{resolve_payment_method, validate_payment_amount};
use medibill_core::{Invoice, ValidationError};
use medibill_db::{Database, DbError, PaymentUpdate};
use tracing::{debug, info, warn};

use crate::dto::RecordPaymentRequest;
use crate::error::{ServiceError, ServiceResult};
use crate::services::directory::found;
use crate::services::settings::SettingsService;

/// Attempts before a payment is reported as a concurrent modification.
pub const MAX_PAYMENT_ATTEMPTS: u32 = 5;

#[derive(Clone)]
pub struct PaymentService {
    db: Database,
    settings: SettingsService,
}

impl PaymentService {
    pub fn new(db: Database, settings: SettingsService) -> Self {
        PaymentService { db, settings }
    }

    pub async fn record_payment(
        &self,
        hospital_id: &str,
        user_id: &str,
        invoice_id: &str,
        request: RecordPaymentRequest,
    ) -> ServiceResult<Invoice> {
        validate_payment_amount(request.amount)?;

        let settings = self.settings.resolve(hospital_id, Some(user_id)).await?;
        let method = match request.payment_method.as_deref() {
            Some(requested) => Some(resolve_payment_method(
                Some(requested),
                &settings.accepted_payment_methods,
            )?),
            None => None,
        };

        for attempt in 1..=MAX_PAYMENT_ATTEMPTS {
            let invoice = found(
                self.db.invoices().get_by_id(hospital_id, invoice_id).await?,
                "Invoice",
                invoice_id,
            )?;

            let paid = invoice.paid_amount.checked_add(request.amount).ok_or_else(|| {
                ServiceError::from(ValidationError::invalid_format("amount", "is too large"))
            })?;
            let now = Utc::now();
            let received_at = request.payment_date.unwrap_or(now);
            let state = payment::derive(invoice.total_amount, paid, invoice.payment_date, received_at);

            let update = PaymentUpdate {
                expected_version: invoice.version,
                paid_amount: paid,
                balance_due: state.balance_due,
                payment_status: state.status,
                payment_method: method.clone().unwrap_or_else(|| invoice.payment_method.clone()),
                payment_date: state.payment_date,
                updated_at: now,
            };

            match self.db.invoices().apply_payment(hospital_id, invoice_id, &update).await {
                Ok(updated) => {
                    info!(
                        hospital_id = %hospital_id,
                        invoice_number = %updated.invoice_number,
                        amount = %request.amount,
                        status = %updated.payment_status,
                        balance_due = %updated.balance_due,
                        recorded_by = %user_id,
                        "Payment recorded"
                    );
                    if let Some(overpaid) = state.overpayment() {
                        warn!(
                            invoice_number = %updated.invoice_number,
                            overpaid = %overpaid,
                            "Invoice is overpaid"
                        );
                    }
                    return Ok(updated);
                }
                Err(DbError::VersionConflict { .. }) => {
                    debug!(invoice_id = %invoice_id, attempt, "Payment lost a version race, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }

        warn!(invoice_id = %invoice_id, attempts = MAX_PAYMENT_ATTEMPTS, "Payment abandoned after repeated conflicts");
        Err(ServiceError::ConcurrentModification {
            id: invoice_id.to_string(),
        })
    }
}
