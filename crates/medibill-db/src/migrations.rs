//! # Database Migrations
//!
//! The schema ships inside the binary, read at compile time from the
//! workspace `migrations/sqlite/` directory:
//!
//! ```text
//! migrations/sqlite/
//! ├── 001_initial_schema.sql          clinical records, billing_settings,
//! │                                   invoice_counters, invoices, invoice_items
//! └── 002_global_invoice_number.sql   invoice_number unique across hospitals
//! ```
//!
//! Schema changes go in a new `NNN_description.sql` file. sqlx checksums
//! applied files, so editing one that has shipped makes every existing
//! database refuse to start.

use sqlx::migrate::Migrator;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies pending migrations in version order.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let (total, applied) = migration_status(pool).await.unwrap_or((MIGRATOR.migrations.len(), 0));
    if applied >= total {
        debug!(version = total, "Billing schema is current");
        return Ok(());
    }

    MIGRATOR.run(pool).await?;
    info!(from = applied, to = total, "Billing schema migrated");
    Ok(())
}

/// `(known, applied)` migration counts.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let applied: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await?;
    Ok((MIGRATOR.migrations.len(), applied.max(0) as usize))
}
