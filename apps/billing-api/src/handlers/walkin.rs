//! Walk-in routes under `/walkin`: sales to customers without a patient
//! record.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use medibill_core::{Invoice, InvoiceType};

use crate::dto::{InvoiceListQuery, InvoiceListResponse, WalkInInvoiceRequest};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery, TenantContext};
use crate::AppState;

/// Pharmacy counter sale; deducts stock for every line.
pub async fn create_pharmacy(
    State(state): State<AppState>,
    tenant: TenantContext,
    ApiJson(request): ApiJson<WalkInInvoiceRequest>,
) -> Result<(StatusCode, Json<Invoice>), ApiError> {
    let user_id = tenant.require_user()?;
    let invoice = state
        .invoices
        .create_walk_in(&tenant.hospital_id, user_id, InvoiceType::Pharmacy, request)
        .await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn create_laboratory(
    State(state): State<AppState>,
    tenant: TenantContext,
    ApiJson(request): ApiJson<WalkInInvoiceRequest>,
) -> Result<(StatusCode, Json<Invoice>), ApiError> {
    let user_id = tenant.require_user()?;
    let invoice = state
        .invoices
        .create_walk_in(&tenant.hospital_id, user_id, InvoiceType::Laboratory, request)
        .await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    tenant: TenantContext,
    ApiQuery(query): ApiQuery<InvoiceListQuery>,
) -> Result<Json<InvoiceListResponse>, ApiError> {
    let page = state.invoices.list(&tenant.hospital_id, query, true).await?;
    Ok(Json(page))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<String>,
) -> Result<Json<Invoice>, ApiError> {
    let invoice = state.invoices.get_walk_in(&tenant.hospital_id, &id).await?;
    Ok(Json(invoice))
}
