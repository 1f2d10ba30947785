//! # Database Pool Management
//!
//! Opening the billing database and handing out repositories.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ApiConfig.database_path / MEDIBILL_DATABASE_PATH                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig ──► connect_options()  WAL, synchronous=NORMAL, FKs on,       │
//! │          │                       busy_timeout                           │
//! │          └──► pool_options()     sizing, acquire timeout, recycling     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new ──► SqlitePool ──► embedded migrations                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.settings() / db.invoices() / db.counters() / db.statistics() /      │
//! │  db.clinical()      one short-lived repository per call                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Invoice creation serializes on SQLite's single writer lock. A writer that
//! finds the lock taken waits up to `busy_timeout` before the statement fails
//! with a transient error. In WAL mode list and statistics reads keep
//! running during a write.
//!
//! An in-memory database lives and dies with its one connection, so
//! [`DbConfig::in_memory`] pins the pool to a single connection that is never
//! recycled.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::clinical::ClinicalRepository;
use crate::repository::counter::InvoiceCounterRepository;
use crate::repository::invoice::InvoiceRepository;
use crate::repository::settings::SettingsRepository;
use crate::repository::statistics::StatisticsRepository;

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Where the billing database lives and how the pool around it behaves.
///
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/medibill/medibill.db")
///     .max_connections(8)
///     .busy_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, created on first open. `:memory:` for a private
    /// database.
    pub database_path: PathBuf,
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long a request waits for a free pooled connection.
    pub connect_timeout: Duration,
    /// How long a writer waits for SQLite's write lock.
    pub busy_timeout: Duration,
    pub run_migrations: bool,
}

impl DbConfig {
    /// File-backed database with 5 connections, a 5 s busy timeout and
    /// migrations on open.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// Private in-memory database, one per call. Used by tests.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            connect_timeout: Duration::from_secs(5),
            ..DbConfig::new(MEMORY_PATH)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY_PATH
    }

    /// Per-connection SQLite settings.
    fn connect_options(&self) -> SqliteConnectOptions {
        let options = SqliteConnectOptions::new()
            .filename(&self.database_path)
            .create_if_missing(true)
            .foreign_keys(true)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(self.busy_timeout);

        if self.is_in_memory() {
            options.in_memory(true)
        } else {
            options.journal_mode(SqliteJournalMode::Wal)
        }
    }

    fn pool_options(&self) -> SqlitePoolOptions {
        let max = if self.is_in_memory() {
            1
        } else {
            self.max_connections.max(1)
        };
        let options = SqlitePoolOptions::new()
            .max_connections(max)
            .min_connections(self.min_connections.min(max))
            .acquire_timeout(self.connect_timeout);

        if self.is_in_memory() {
            options.idle_timeout(None).max_lifetime(None)
        } else {
            options.idle_timeout(Some(Duration::from_secs(600)))
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle to the billing database. Clones share one pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the database and applies pending
    /// migrations.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        if config.is_in_memory() && config.max_connections > 1 {
            warn!(
                requested = config.max_connections,
                "In-memory database limited to one connection"
            );
        }
        debug!(
            path = %config.database_path.display(),
            busy_timeout_ms = config.busy_timeout.as_millis() as u64,
            "Opening billing database"
        );

        let pool = config
            .pool_options()
            .connect_with(config.connect_options())
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }

        info!(
            path = %config.database_path.display(),
            max_connections = config.max_connections,
            "Billing database ready"
        );
        Ok(db)
    }

    /// Applies migrations not yet recorded in `_sqlx_migrations`.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn settings(&self) -> SettingsRepository {
        SettingsRepository::new(self.pool.clone())
    }

    /// Invoices and their line items.
    pub fn invoices(&self) -> InvoiceRepository {
        InvoiceRepository::new(self.pool.clone())
    }

    /// Per-tenant invoice number sequences.
    pub fn counters(&self) -> InvoiceCounterRepository {
        InvoiceCounterRepository::new(self.pool.clone())
    }

    pub fn statistics(&self) -> StatisticsRepository {
        StatisticsRepository::new(self.pool.clone())
    }

    /// Hospitals, patients, doctors, source documents and medications.
    pub fn clinical(&self) -> ClinicalRepository {
        ClinicalRepository::new(self.pool.clone())
    }

    /// Waits for checked-out connections and closes the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Billing database closed");
    }

    /// `true` when a trivial query succeeds.
    pub async fn health_check(&self) -> bool {
        match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Database health check failed");
                false
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database_is_healthy() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);
    }

    #[tokio::test]
    async fn test_reopening_migrations_is_a_no_op() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.run_migrations().await.unwrap();

        let (total, applied) = migrations::migration_status(db.pool()).await.unwrap();
        assert_eq!(total, applied);
    }

    #[test]
    fn test_in_memory_config_is_single_connection() {
        let config = DbConfig::in_memory().max_connections(4);
        assert!(config.is_in_memory());
        assert_eq!(config.pool_options().get_max_connections(), 1);

        let file = DbConfig::new("/tmp/billing.db").max_connections(8).min_connections(2);
        assert!(!file.is_in_memory());
        assert_eq!(file.pool_options().get_max_connections(), 8);
        assert_eq!(file.pool_options().get_min_connections(), 2);
    }

    #[tokio::test]
    async fn test_file_database_uses_wal_and_foreign_keys() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("billing.db")))
            .await
            .unwrap();

        let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");

        let fks: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(fks, 1);
        db.close().await;
    }
}
