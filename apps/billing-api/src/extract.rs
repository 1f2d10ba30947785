//! Request extractors.
//!
//! - [`TenantContext`] reads the tenant and acting user from headers.
//! - [`ApiJson`] / [`ApiQuery`] wrap axum's extractors so malformed input is
//!   answered with the usual `{code, message}` body instead of plain text.

use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

pub const HOSPITAL_ID_HEADER: &str = "X-Hospital-Id";
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Tenant scope of a request.
///
/// Every billing route requires `X-Hospital-Id`. Writes additionally require
/// `X-User-Id`, recorded as `createdBy` / `updatedBy`.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub hospital_id: String,
    pub user_id: Option<String>,
}

impl TenantContext {
    pub fn new(hospital_id: impl Into<String>, user_id: Option<String>) -> Self {
        TenantContext {
            hospital_id: hospital_id.into(),
            user_id,
        }
    }

    /// The acting user, required for writes.
    pub fn require_user(&self) -> Result<&str, ApiError> {
        self.user_id
            .as_deref()
            .ok_or_else(|| ApiError::bad_request(format!("Missing {} header", USER_ID_HEADER)))
    }
}

fn header(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let hospital_id = header(parts, HOSPITAL_ID_HEADER)
            .ok_or_else(|| ApiError::bad_request(format!("Missing {} header", HOSPITAL_ID_HEADER)))?;
        let user_id = header(parts, USER_ID_HEADER);

        tracing::Span::current().record("hospital_id", hospital_id.as_str());

        Ok(TenantContext::new(hospital_id, user_id))
    }
}

/// JSON body extractor with API-shaped rejections.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        Ok(ApiJson(value))
    }
}

/// Query string extractor with API-shaped rejections.
#[derive(Debug, Clone)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        Ok(ApiQuery(value))
    }
}
