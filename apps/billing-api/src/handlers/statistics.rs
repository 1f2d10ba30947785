//! `GET /billing/statistics?period=this_month`

use axum::extract::State;
use axum::Json;
use medibill_core::statistics::BillingStatistics;

use crate::dto::StatisticsQuery;
use crate::error::ApiError;
use crate::extract::{ApiQuery, TenantContext};
use crate::AppState;

pub async fn get_statistics(
    State(state): State<AppState>,
    tenant: TenantContext,
    ApiQuery(query): ApiQuery<StatisticsQuery>,
) -> Result<Json<BillingStatistics>, ApiError> {
    let report = state.statistics.get(&tenant.hospital_id, query).await?;
    Ok(Json(report))
}
