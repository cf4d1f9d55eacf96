//! Application state for the determination API

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

/// Source of timestamps for records and audit events
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub struct AppState {
    pub db: SqlitePool,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub async fn connect(database_url: &str, clock: Arc<dyn Clock>) -> Result<Self, sqlx::Error> {
        tracing::info!("Connecting to database: {}", database_url);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Self::with_pool(pool, clock).await
    }

    /// Private in-memory database; one connection so every query sees it
    pub async fn in_memory(clock: Arc<dyn Clock>) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(pool, clock).await
    }

    async fn with_pool(pool: SqlitePool, clock: Arc<dyn Clock>) -> Result<Self, sqlx::Error> {
        Self::run_migrations(&pool).await?;
        Ok(Self { db: pool, clock })
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        tracing::info!("Running database migrations...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS reports (
                id TEXT PRIMARY KEY,
                record_json TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'draft',
                is_reportable INTEGER,
                reason_code TEXT,
                reason_text TEXT,
                record_fingerprint TEXT,
                audit_json TEXT NOT NULL,
                version INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_reports_status ON reports(status)
            "#,
        )
        .execute(pool)
        .await?;

        tracing::info!("Migrations complete");
        Ok(())
    }
}
