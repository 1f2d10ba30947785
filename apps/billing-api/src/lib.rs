//! # MediBill Billing API
//!
//! Tenant-scoped HTTP API for hospital billing: settings, invoice generation
//! from clinical records, walk-in sales, payments and statistics.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Billing API                                     │
//! │                                                                         │
//! │  ┌───────────────┐  ┌───────────────┐  ┌───────────────┐               │
//! │  │   Handlers    │  │   Services    │  │ medibill-db   │               │
//! │  │               │  │               │  │               │               │
//! │  │ • settings    │─►│ • Settings    │─►│ • settings    │               │
//! │  │ • invoices    │  │ • Invoice     │  │ • invoices    │               │
//! │  │ • walkin      │  │ • Payment     │  │ • counters    │               │
//! │  │ • statistics  │  │ • Statistics  │  │ • statistics  │               │
//! │  │ • health      │  │               │  │ • clinical    │               │
//! │  └───────────────┘  └───────┬───────┘  └───────────────┘               │
//! │                             │                                           │
//! │                             ▼                                           │
//! │                     medibill-core (totals, payment state, numbering)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Routes
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | GET/PUT | `/billing/settings` | Tenant billing settings |
//! | GET/POST | `/billing/invoices` | List (filtered, paginated) / manual invoice |
//! | GET | `/billing/invoices/{id}` | One invoice |
//! | POST | `/billing/invoices/consultation` | From an appointment |
//! | POST | `/billing/invoices/pharmacy` | From a prescription |
//! | POST | `/billing/invoices/laboratory` | From a lab order |
//! | PUT | `/billing/invoices/{id}/payment` | Record a payment |
//! | GET | `/billing/statistics` | Aggregates for a period |
//! | POST | `/walkin/pharmacy/invoice` | Walk-in pharmacy sale |
//! | POST | `/walkin/laboratory/invoice` | Walk-in laboratory sale |
//! | GET | `/walkin/invoices[/{id}]` | Walk-in invoices |
//! | GET | `/health` | Liveness |
//!
//! ## Configuration
//! See [`config::ApiConfig`]. Environment variables use the `MEDIBILL_`
//! prefix: `MEDIBILL_PORT`, `MEDIBILL_DATABASE_PATH`,
//! `MEDIBILL_MAX_CONNECTIONS`, `MEDIBILL_WEEK_START`, `MEDIBILL_LOG_LEVEL`,
//! `MEDIBILL_LOG_JSON`.

pub mod config;
pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod services;

use axum::http::Request;
use axum::routing::{get, post, put};
use axum::Router;
use medibill_db::Database;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use config::ApiConfig;
pub use error::{ApiError, ServiceError};

use crate::handlers::{health, invoices, settings, statistics, walkin};
use crate::services::{
    ClinicalDirectory, InvoiceService, PaymentService, SettingsService, StatisticsService,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<ApiConfig>,
    pub settings: SettingsService,
    pub invoices: InvoiceService,
    pub payments: PaymentService,
    pub statistics: StatisticsService,
}

impl AppState {
    /// Wires the services over one database, using the database's own
    /// clinical tables as the directory.
    pub fn new(db: Database, config: ApiConfig) -> Self {
        let directory: Arc<dyn ClinicalDirectory> = Arc::new(db.clinical());
        Self::with_directory(db, config, directory)
    }

    pub fn with_directory(
        db: Database,
        config: ApiConfig,
        directory: Arc<dyn ClinicalDirectory>,
    ) -> Self {
        let settings = SettingsService::new(db.clone(), directory.clone());
        let invoices = InvoiceService::new(db.clone(), directory, settings.clone());
        let payments = PaymentService::new(db.clone(), settings.clone());
        let statistics = StatisticsService::new(db.clone(), config.week_start());

        AppState {
            db,
            config: Arc::new(config),
            settings,
            invoices,
            payments,
            statistics,
        }
    }
}

/// Builds the full router with request tracing.
pub fn router(state: AppState) -> Router {
    let billing = Router::new()
        .route(
            "/settings",
            get(settings::get_settings).put(settings::update_settings),
        )
        .route(
            "/invoices",
            get(invoices::list_invoices).post(invoices::create_manual),
        )
        .route("/invoices/consultation", post(invoices::create_consultation))
        .route("/invoices/pharmacy", post(invoices::create_pharmacy))
        .route("/invoices/laboratory", post(invoices::create_laboratory))
        .route("/invoices/{id}", get(invoices::get_invoice))
        .route("/invoices/{id}/payment", put(invoices::record_payment))
        .route("/statistics", get(statistics::get_statistics));

    let walk_in = Router::new()
        .route("/pharmacy/invoice", post(walkin::create_pharmacy))
        .route("/laboratory/invoice", post(walkin::create_laboratory))
        .route("/invoices", get(walkin::list_invoices))
        .route("/invoices/{id}", get(walkin::get_invoice));

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/billing", billing)
        .nest("/walkin", walk_in)
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .with_state(state)
}

/// Span for one request. `hospital_id` is filled in by
/// [`extract::TenantContext`] once the header has been read.
pub fn request_span<B>(request: &Request<B>) -> tracing::Span {
    tracing::info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        hospital_id = tracing::field::Empty,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_request_span_declares_hospital_id() {
        let subscriber = tracing_subscriber::registry();
        tracing::subscriber::with_default(subscriber, || {
            let request = Request::builder()
                .uri("/billing/settings")
                .body(Body::empty())
                .unwrap();
            let span = request_span(&request);
            assert!(span.field("hospital_id").is_some());
            assert!(span.field("uri").is_some());
        });
    }
}
