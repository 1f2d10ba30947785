//! HTTP handlers. Thin: extract, call a service, wrap the result.

pub mod health;
pub mod invoices;
pub mod settings;
pub mod statistics;
pub mod walkin;
