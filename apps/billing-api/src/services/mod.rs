//! Service layer: orchestration between handlers, pure billing rules and
//! storage.
//!
//! - [`settings::SettingsService`] - lazy default settings, partial updates
//! - [`invoice::InvoiceService`] - manual, consultation, pharmacy, laboratory
//!   and walk-in invoices; lookups and listing
//! - [`payment::PaymentService`] - incremental payments with version retry
//! - [`statistics::StatisticsService`] - period aggregates
//! - [`directory::ClinicalDirectory`] - clinical record lookups

pub mod directory;
pub mod invoice;
pub mod payment;
pub mod settings;
pub mod statistics;

pub use directory::ClinicalDirectory;
pub use invoice::InvoiceService;
pub use payment::PaymentService;
pub use settings::SettingsService;
pub use statistics::StatisticsService;
