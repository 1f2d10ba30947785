//! `GET /billing/settings`, `PUT /billing/settings`

use axum::extract::State;
use axum::Json;
use medibill_core::{BillingSettings, BillingSettingsUpdate};

use crate::error::ApiError;
use crate::extract::{ApiJson, TenantContext};
use crate::AppState;

/// Current settings, created with defaults on first access.
pub async fn get_settings(
    State(state): State<AppState>,
    tenant: TenantContext,
) -> Result<Json<BillingSettings>, ApiError> {
    let settings = state
        .settings
        .resolve(&tenant.hospital_id, tenant.user_id.as_deref())
        .await?;
    Ok(Json(settings))
}

pub async fn update_settings(
    State(state): State<AppState>,
    tenant: TenantContext,
    ApiJson(update): ApiJson<BillingSettingsUpdate>,
) -> Result<Json<BillingSettings>, ApiError> {
    let user_id = tenant.require_user()?;
    let settings = state.settings.update(&tenant.hospital_id, user_id, update).await?;
    Ok(Json(settings))
}
