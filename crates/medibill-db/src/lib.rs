//! # medibill-db: Database Layer for MediBill
//!
//! SQLite storage for billing settings, invoice counters, invoices and the
//! clinical records invoices are generated from. Built on sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        MediBill Data Flow                               │
//! │                                                                         │
//! │  POST /api/billing/invoices/from-consultation                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  billing-api service (builds an InvoiceDraft with medibill-core)       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   medibill-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐ │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │ │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │ │   │
//! │  │   │               │    │ InvoiceRepo    │    │ 001_init.sql │ │   │
//! │  │   │ SqlitePool    │◄───│ CounterRepo    │    │              │ │   │
//! │  │   │ WAL, FKs      │    │ SettingsRepo   │    │              │ │   │
//! │  │   │ busy_timeout  │    │ StatisticsRepo │    │              │ │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘ │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   medibill.db                                                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use medibill_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("medibill.db")).await?;
//! db.run_migrations().await?;
//!
//! let settings = db.settings().get_or_create("hosp-1", Some("admin")).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::clinical::ClinicalRepository;
pub use repository::counter::InvoiceCounterRepository;
pub use repository::invoice::{
    InvoiceFilter, InvoicePage, InvoiceRepository, PaymentUpdate, StockDeduction,
};
pub use repository::settings::SettingsRepository;
pub use repository::statistics::StatisticsRepository;
