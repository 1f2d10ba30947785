//! # Repository Module
//!
//! Database repository implementations for MediBill.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  billing-api service                                                    │
//! │       │                                                                 │
//! │       │  db.invoices().create(draft, StockDeduction::None)             │
//! │       ▼                                                                 │
//! │  InvoiceRepository                                                     │
//! │  ├── create(&self, draft, stock)                                       │
//! │  ├── get_by_id(&self, hospital_id, id)                                 │
//! │  ├── list(&self, hospital_id, filter, page, limit)                     │
//! │  └── apply_payment(&self, hospital_id, id, update)                     │
//! │       │                                                                 │
//! │       │  SQL (every query scoped by hospital_id)                        │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ClinicalRepository`] - Hospitals, patients, doctors, appointments,
//!   prescriptions, lab orders, medications
//! - [`InvoiceCounterRepository`] - Invoice number sequences
//! - [`InvoiceRepository`] - Invoice creation, lookup, listing, payments
//! - [`SettingsRepository`] - Per-hospital billing settings
//! - [`StatisticsRepository`] - Billing aggregates
//!
//! [`ClinicalRepository`]: clinical::ClinicalRepository
//! [`InvoiceCounterRepository`]: counter::InvoiceCounterRepository
//! [`InvoiceRepository`]: invoice::InvoiceRepository
//! [`SettingsRepository`]: settings::SettingsRepository
//! [`StatisticsRepository`]: statistics::StatisticsRepository

pub mod clinical;
pub mod counter;
pub mod invoice;
pub mod settings;
pub mod statistics;
