//! Invoice routes under `/billing/invoices`.
//!
//! Creation returns `201 Created`; replaying a source-linked creation
//! returns `409 ALREADY_INVOICED` with the existing invoice.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use medibill_core::Invoice;

use crate::dto::{
    ConsultationInvoiceRequest, InvoiceListQuery, InvoiceListResponse, LaboratoryInvoiceRequest,
    ManualInvoiceRequest, PharmacyInvoiceRequest, RecordPaymentRequest,
};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery, TenantContext};
use crate::AppState;

type Created = (StatusCode, Json<Invoice>);

pub async fn list_invoices(
    State(state): State<AppState>,
    tenant: TenantContext,
    ApiQuery(query): ApiQuery<InvoiceListQuery>,
) -> Result<Json<InvoiceListResponse>, ApiError> {
    let page = state.invoices.list(&tenant.hospital_id, query, false).await?;
    Ok(Json(page))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<String>,
) -> Result<Json<Invoice>, ApiError> {
    let invoice = state.invoices.get(&tenant.hospital_id, &id).await?;
    Ok(Json(invoice))
}

pub async fn create_manual(
    State(state): State<AppState>,
    tenant: TenantContext,
    ApiJson(request): ApiJson<ManualInvoiceRequest>,
) -> Result<Created, ApiError> {
    let user_id = tenant.require_user()?;
    let invoice = state
        .invoices
        .create_manual(&tenant.hospital_id, user_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn create_consultation(
    State(state): State<AppState>,
    tenant: TenantContext,
    ApiJson(request): ApiJson<ConsultationInvoiceRequest>,
) -> Result<Created, ApiError> {
    let user_id = tenant.require_user()?;
    let invoice = state
        .invoices
        .create_from_appointment(&tenant.hospital_id, user_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn create_pharmacy(
    State(state): State<AppState>,
    tenant: TenantContext,
    ApiJson(request): ApiJson<PharmacyInvoiceRequest>,
) -> Result<Created, ApiError> {
    let user_id = tenant.require_user()?;
    let invoice = state
        .invoices
        .create_from_prescription(&tenant.hospital_id, user_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn create_laboratory(
    State(state): State<AppState>,
    tenant: TenantContext,
    ApiJson(request): ApiJson<LaboratoryInvoiceRequest>,
) -> Result<Created, ApiError> {
    let user_id = tenant.require_user()?;
    let invoice = state
        .invoices
        .create_from_lab_order(&tenant.hospital_id, user_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn record_payment(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<RecordPaymentRequest>,
) -> Result<Json<Invoice>, ApiError> {
    let user_id = tenant.require_user()?;
    let invoice = state
        .payments
        .record_payment(&tenant.hospital_id, user_id, &id, request)
        .await?;
    Ok(Json(invoice))
}
