//! # Invoice Service
//!
//! Every way of creating an invoice, plus lookups and listing.
//!
//! ## Creation Flow
//! ```text
//! ┌──────────────┐  ┌───────────────┐  ┌──────────────┐  ┌──────────────────┐
//! │ entry point  │─►│ lookups       │─►│ build_draft  │─►│ InvoiceRepository│
//! │ manual       │  │ settings      │  │ (totals,     │  │ ::create         │
//! │ consultation │  │ source doc    │  │  payment     │  │ one transaction: │
//! │ pharmacy     │  │ patient       │  │  state)      │  │ number, rows,    │
//! │ laboratory   │  │ doctor        │  │              │  │ stock            │
//! │ walk-in      │  │ medications   │  │              │  │                  │
//! └──────────────┘  └───────────────┘  └──────────────┘  └──────────────────┘
//! ```
//!
//! All lookups and validation finish before anything is written. A source
//! document is invoiced at most once: a replay gets
//! [`ServiceError::AlreadyInvoiced`] carrying the existing invoice.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use medibill_core::clinical::Medication;
use medibill_core::draft::{build_draft, DraftRequest};
use medibill_core::lines::{consultation_line, lab_order_lines, prescription_lines, walk_in_lines};
use medibill_core::validation::validate_pagination;
use medibill_core::{
    BillingSettings, CustomerKind, CustomerRef, Invoice, InvoiceType, LineItemInput, Money,
    PaymentStatus, SourceRef, ValidationError,
};
use medibill_db::{Database, DbError, InvoiceFilter, StockDeduction};
use std::sync::Arc;
use tracing::{debug, info};

use crate::dto::{
    ConsultationInvoiceRequest, InvoiceListQuery, InvoiceListResponse, InvoiceOptions,
    LaboratoryInvoiceRequest, ManualInvoiceRequest, Pagination, PharmacyInvoiceRequest,
    WalkInInvoiceRequest,
};
use crate::error::{ServiceError, ServiceResult};
use crate::services::directory::{found, ClinicalDirectory};
use crate::services::settings::SettingsService;

#[derive(Clone)]
pub struct InvoiceService {
    db: Database,
    directory: Arc<dyn ClinicalDirectory>,
    settings: SettingsService,
}

impl InvoiceService {
    pub fn new(db: Database, directory: Arc<dyn ClinicalDirectory>, settings: SettingsService) -> Self {
        InvoiceService {
            db,
            directory,
            settings,
        }
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Invoice with caller-supplied items.
    pub async fn create_manual(
        &self,
        hospital_id: &str,
        user_id: &str,
        request: ManualInvoiceRequest,
    ) -> ServiceResult<Invoice> {
        let settings = self.settings.resolve(hospital_id, Some(user_id)).await?;

        if let Some(patient_id) = request.customer.patient_id() {
            found(self.directory.patient(hospital_id, patient_id).await?, "Patient", patient_id)?;
        }
        self.check_doctor(hospital_id, request.doctor_id.as_deref()).await?;
        self.check_medications(hospital_id, &request.items).await?;

        let draft = draft_request(
            request.customer,
            request.doctor_id,
            None,
            request.invoice_type,
            request.items,
            request.options,
            user_id,
        );
        let invoice = self.commit(&settings, draft, StockDeduction::None).await?;

        info!(
            hospital_id = %hospital_id,
            invoice_number = %invoice.invoice_number,
            total = %invoice.total_amount,
            "Manual invoice created"
        );
        Ok(invoice)
    }

    /// Consultation invoice for an appointment, priced from the fee schedule.
    pub async fn create_from_appointment(
        &self,
        hospital_id: &str,
        user_id: &str,
        request: ConsultationInvoiceRequest,
    ) -> ServiceResult<Invoice> {
        let settings = self.settings.resolve(hospital_id, Some(user_id)).await?;
        let appointment = found(
            self.directory.appointment(hospital_id, &request.appointment_id).await?,
            "Appointment",
            &request.appointment_id,
        )?;

        let source = SourceRef::Appointment(appointment.id.clone());
        self.ensure_not_invoiced(hospital_id, &source).await?;

        found(
            self.directory.patient(hospital_id, &appointment.patient_id).await?,
            "Patient",
            &appointment.patient_id,
        )?;
        let doctor = found(
            self.directory.doctor(hospital_id, &appointment.doctor_id).await?,
            "Doctor",
            &appointment.doctor_id,
        )?;

        let line = consultation_line(&appointment, &doctor, &settings.consultation_fees);
        let draft = draft_request(
            CustomerRef::registered(appointment.patient_id.clone())?,
            Some(doctor.id.clone()),
            Some(source),
            InvoiceType::Consultation,
            vec![line],
            request.options,
            user_id,
        );
        let invoice = self.commit(&settings, draft, StockDeduction::None).await?;

        info!(
            hospital_id = %hospital_id,
            appointment_id = %appointment.id,
            invoice_number = %invoice.invoice_number,
            total = %invoice.total_amount,
            "Consultation invoice created"
        );
        Ok(invoice)
    }

    /// Pharmacy invoice for a prescription, priced from the catalog.
    pub async fn create_from_prescription(
        &self,
        hospital_id: &str,
        user_id: &str,
        request: PharmacyInvoiceRequest,
    ) -> ServiceResult<Invoice> {
        let settings = self.settings.resolve(hospital_id, Some(user_id)).await?;
        let prescription = found(
            self.directory.prescription(hospital_id, &request.prescription_id).await?,
            "Prescription",
            &request.prescription_id,
        )?;

        let source = SourceRef::Prescription(prescription.id.clone());
        self.ensure_not_invoiced(hospital_id, &source).await?;

        found(
            self.directory.patient(hospital_id, &prescription.patient_id).await?,
            "Patient",
            &prescription.patient_id,
        )?;
        self.check_doctor(hospital_id, Some(&prescription.doctor_id)).await?;

        let mut medications: Vec<Medication> = Vec::with_capacity(prescription.lines.len());
        for line in &prescription.lines {
            medications.push(found(
                self.directory.medication(hospital_id, &line.medication_id).await?,
                "Medication",
                &line.medication_id,
            )?);
        }
        let items = prescription_lines(prescription.lines.iter().zip(medications.iter()));

        let draft = draft_request(
            CustomerRef::registered(prescription.patient_id.clone())?,
            Some(prescription.doctor_id.clone()),
            Some(source),
            InvoiceType::Pharmacy,
            items,
            request.options,
            user_id,
        );
        let invoice = self.commit(&settings, draft, StockDeduction::None).await?;

        info!(
            hospital_id = %hospital_id,
            prescription_id = %prescription.id,
            invoice_number = %invoice.invoice_number,
            lines = invoice.items.len(),
            total = %invoice.total_amount,
            "Pharmacy invoice created"
        );
        Ok(invoice)
    }

    /// Laboratory invoice for a lab order, one line per test.
    pub async fn create_from_lab_order(
        &self,
        hospital_id: &str,
        user_id: &str,
        request: LaboratoryInvoiceRequest,
    ) -> ServiceResult<Invoice> {
        let settings = self.settings.resolve(hospital_id, Some(user_id)).await?;
        let order = found(
            self.directory.lab_order(hospital_id, &request.lab_order_id).await?,
            "LabOrder",
            &request.lab_order_id,
        )?;

        let source = SourceRef::LabOrder(order.id.clone());
        self.ensure_not_invoiced(hospital_id, &source).await?;

        found(
            self.directory.patient(hospital_id, &order.patient_id).await?,
            "Patient",
            &order.patient_id,
        )?;
        self.check_doctor(hospital_id, order.doctor_id.as_deref()).await?;

        let draft = draft_request(
            CustomerRef::registered(order.patient_id.clone())?,
            order.doctor_id.clone(),
            Some(source),
            InvoiceType::Laboratory,
            lab_order_lines(&order),
            request.options,
            user_id,
        );
        let invoice = self.commit(&settings, draft, StockDeduction::None).await?;

        info!(
            hospital_id = %hospital_id,
            lab_order_id = %order.id,
            invoice_number = %invoice.invoice_number,
            total = %invoice.total_amount,
            "Laboratory invoice created"
        );
        Ok(invoice)
    }

    /// Walk-in sale. Pharmacy sales deduct stock in the same transaction.
    pub async fn create_walk_in(
        &self,
        hospital_id: &str,
        user_id: &str,
        invoice_type: InvoiceType,
        request: WalkInInvoiceRequest,
    ) -> ServiceResult<Invoice> {
        let customer = CustomerRef::walk_in(
            request.customer_name,
            request.customer_contact,
            request.customer_email,
            request.customer_address,
        )?;
        let items = walk_in_lines(invoice_type, &request.items)?;

        let settings = self.settings.resolve(hospital_id, Some(user_id)).await?;
        self.check_doctor(hospital_id, request.doctor_id.as_deref()).await?;
        self.check_medications(hospital_id, &items).await?;

        let stock = match invoice_type {
            InvoiceType::Pharmacy => StockDeduction::FromLineItems,
            InvoiceType::Laboratory | InvoiceType::Consultation => StockDeduction::None,
        };

        let draft = draft_request(
            customer,
            request.doctor_id,
            None,
            invoice_type,
            items,
            request.options,
            user_id,
        );
        let invoice = self.commit(&settings, draft, stock).await?;

        info!(
            hospital_id = %hospital_id,
            invoice_type = %invoice_type,
            invoice_number = %invoice.invoice_number,
            total = %invoice.total_amount,
            "Walk-in invoice created"
        );
        Ok(invoice)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn get(&self, hospital_id: &str, id: &str) -> ServiceResult<Invoice> {
        found(self.db.invoices().get_by_id(hospital_id, id).await?, "Invoice", id)
    }

    /// A walk-in invoice; registered-patient invoices are reported as not found.
    pub async fn get_walk_in(&self, hospital_id: &str, id: &str) -> ServiceResult<Invoice> {
        let invoice = self.get(hospital_id, id).await?;
        if !invoice.is_walk_in() {
            return Err(ServiceError::not_found("Invoice", id));
        }
        Ok(invoice)
    }

    pub async fn list(
        &self,
        hospital_id: &str,
        query: InvoiceListQuery,
        walk_in_only: bool,
    ) -> ServiceResult<InvoiceListResponse> {
        let (page, limit) = validate_pagination(query.page, query.limit)?;

        let status = query
            .status
            .as_deref()
            .map(str::parse::<PaymentStatus>)
            .transpose()?;
        let invoice_type = query
            .invoice_type
            .as_deref()
            .map(str::parse::<InvoiceType>)
            .transpose()?;

        if let (Some(from), Some(to)) = (query.from, query.to) {
            if from > to {
                return Err(ValidationError::invalid_format("from", "must not be after to").into());
            }
        }

        let filter = InvoiceFilter {
            patient_id: query.patient_id,
            doctor_id: query.doctor_id,
            customer_kind: walk_in_only.then_some(CustomerKind::WalkIn),
            from: query.from.map(start_of_day),
            to: query.to.map(end_of_day),
            status,
            invoice_type,
        };

        let page = self.db.invoices().list(hospital_id, &filter, page, limit).await?;
        debug!(hospital_id = %hospital_id, total = page.total, "Invoices listed");

        Ok(InvoiceListResponse {
            pagination: Pagination::new(page.page, page.limit, page.total),
            invoices: page.invoices,
        })
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn ensure_not_invoiced(&self, hospital_id: &str, source: &SourceRef) -> ServiceResult<()> {
        match self.db.invoices().find_by_source(hospital_id, source).await? {
            Some(existing) => {
                info!(
                    hospital_id = %hospital_id,
                    source_kind = %source.kind(),
                    source_id = %source.id(),
                    invoice_number = %existing.invoice_number,
                    "Source already invoiced"
                );
                Err(ServiceError::AlreadyInvoiced(Box::new(existing)))
            }
            None => Ok(()),
        }
    }

    async fn check_doctor(&self, hospital_id: &str, doctor_id: Option<&str>) -> ServiceResult<()> {
        if let Some(id) = doctor_id {
            found(self.directory.doctor(hospital_id, id).await?, "Doctor", id)?;
        }
        Ok(())
    }

    async fn check_medications(&self, hospital_id: &str, items: &[LineItemInput]) -> ServiceResult<()> {
        for id in items.iter().filter_map(|item| item.medication_id.as_deref()) {
            found(self.directory.medication(hospital_id, id).await?, "Medication", id)?;
        }
        Ok(())
    }

    /// Computes the draft and stores it. A duplicate source detected inside
    /// the transaction (a concurrent request won) is reported the same way
    /// as one detected up front.
    async fn commit(
        &self,
        settings: &BillingSettings,
        request: DraftRequest,
        stock: StockDeduction,
    ) -> ServiceResult<Invoice> {
        let draft = build_draft(request, settings, Utc::now())?;
        let hospital_id = draft.hospital_id.clone();

        match self.db.invoices().create(draft, stock).await {
            Ok(invoice) => Ok(invoice),
            Err(DbError::AlreadyInvoiced { invoice_id, .. }) => {
                let existing = self.get(&hospital_id, &invoice_id).await?;
                Err(ServiceError::AlreadyInvoiced(Box::new(existing)))
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn draft_request(
    customer: CustomerRef,
    doctor_id: Option<String>,
    source: Option<SourceRef>,
    invoice_type: InvoiceType,
    items: Vec<LineItemInput>,
    options: InvoiceOptions,
    user_id: &str,
) -> DraftRequest {
    DraftRequest {
        customer,
        doctor_id,
        source,
        invoice_type,
        items,
        payment_method: options.payment_method,
        paid_amount: options.paid_amount.unwrap_or_else(Money::zero),
        due_date: options.due_date,
        notes: options.notes,
        created_by: user_id.to_string(),
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    start_of_day(date) + Duration::days(1) - Duration::nanoseconds(1)
}
