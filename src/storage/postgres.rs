// logsink/src/storage/postgres.rs
use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, warn};

use super::record::LogRecord;
use crate::config::StorageConfig;

const CREATE_LOGS_TABLE: &str = "CREATE TABLE IF NOT EXISTS logs (
    id BIGSERIAL PRIMARY KEY,
    ts TIMESTAMPTZ NOT NULL,
    api_url TEXT,
    headers JSONB,
    request_body JSONB,
    response_body JSONB,
    user_id TEXT,
    event TEXT,
    entity TEXT,
    entity_id TEXT,
    actor JSONB,
    request JSONB,
    response JSONB,
    metadata JSONB
)";

const CREATE_TS_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_logs_ts ON logs (ts DESC)";

/// Additive migrations for tables created by older builds that predate some
/// columns. Applied in order on every startup; each one is idempotent.
const COLUMN_MIGRATIONS: &[&str] = &[
    "ALTER TABLE logs ADD COLUMN IF NOT EXISTS api_url TEXT",
    "ALTER TABLE logs ADD COLUMN IF NOT EXISTS headers JSONB",
    "ALTER TABLE logs ADD COLUMN IF NOT EXISTS request_body JSONB",
    "ALTER TABLE logs ADD COLUMN IF NOT EXISTS response_body JSONB",
    "ALTER TABLE logs ADD COLUMN IF NOT EXISTS user_id TEXT",
    "ALTER TABLE logs ADD COLUMN IF NOT EXISTS event TEXT",
    "ALTER TABLE logs ADD COLUMN IF NOT EXISTS entity TEXT",
    "ALTER TABLE logs ADD COLUMN IF NOT EXISTS entity_id TEXT",
    "ALTER TABLE logs ADD COLUMN IF NOT EXISTS actor JSONB",
    "ALTER TABLE logs ADD COLUMN IF NOT EXISTS request JSONB",
    "ALTER TABLE logs ADD COLUMN IF NOT EXISTS response JSONB",
    "ALTER TABLE logs ADD COLUMN IF NOT EXISTS metadata JSONB",
];

const INSERT_LOG: &str = "INSERT INTO logs \
    (ts, api_url, headers, request_body, response_body, user_id, event, entity, entity_id, actor, request, response, metadata) \
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)";

/// Relational log store backed by a sqlx connection pool.
pub struct PgLogStore {
    pool: PgPool,
}

impl PgLogStore {
    /// Connects eagerly; an unreachable or misconfigured database fails
    /// startup, not the first write.
    pub async fn connect(config: &StorageConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .connect(config.postgres_url()?)
            .await
            .context("failed to connect to PostgreSQL")?;
        Ok(Self { pool })
    }

    /// Creates the logs table and index, then applies the additive column
    /// migrations. Table and index failures are fatal; a failed column
    /// migration is logged and skipped.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(CREATE_LOGS_TABLE)
            .execute(&self.pool)
            .await
            .context("failed to create logs table")?;

        for statement in COLUMN_MIGRATIONS {
            if let Err(e) = sqlx::query(statement).execute(&self.pool).await {
                warn!(statement, "column migration failed, continuing: {e}");
            }
        }

        sqlx::query(CREATE_TS_INDEX)
            .execute(&self.pool)
            .await
            .context("failed to create timestamp index on logs")?;

        debug!("✓ PostgreSQL schema ready");
        Ok(())
    }

    pub async fn insert(&self, record: &LogRecord) -> Result<()> {
        sqlx::query(INSERT_LOG)
            .bind(record.timestamp)
            .bind(&record.api_url)
            .bind(&record.headers)
            .bind(&record.request_body)
            .bind(&record.response_body)
            .bind(&record.user_id)
            .bind(&record.event)
            .bind(&record.entity)
            .bind(&record.entity_id)
            .bind(&record.actor)
            .bind(&record.request)
            .bind(&record.response)
            .bind(&record.metadata)
            .execute(&self.pool)
            .await
            .context("failed to insert log record into PostgreSQL")?;
        Ok(())
    }

    /// Pool that resolves connections on first use. Lets tests exercise the
    /// insert path against an address nothing listens on.
    #[cfg(test)]
    pub(crate) fn connect_lazy_for_tests(url: &str) -> Self {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(std::time::Duration::from_secs(2))
            .connect_lazy(url)
            .expect("lazy pool from test url");
        Self { pool }
    }
}
