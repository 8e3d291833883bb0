//! PostgreSQL backend using sqlx.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Row, Transaction};

use super::{QuoteStore, StoreSession};
use crate::config::{validate_table_name, DatabaseSettings};
use crate::error::{StoreError, StoreResult};
use crate::models::QuoteRecord;

/// Pooled PostgreSQL store writing to one quote table.
#[derive(Clone)]
pub struct PgQuoteStore {
    pool: PgPool,
    table: String,
    insert_sql: String,
}

impl PgQuoteStore {
    /// Connect a pool using `settings`.
    pub async fn connect(settings: &DatabaseSettings) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .connect(&settings.url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Self::from_pool(pool, &settings.table)
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool, table: &str) -> StoreResult<Self> {
        validate_table_name(table).map_err(|_| StoreError::InvalidTable(table.to_string()))?;

        Ok(Self {
            pool,
            table: table.to_string(),
            insert_sql: insert_statement(table),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn create_table_statement(table: &str) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id BIGSERIAL PRIMARY KEY,
            date DATE,
            series VARCHAR(16),
            open NUMERIC,
            high NUMERIC,
            low NUMERIC,
            prev_close NUMERIC,
            ltp NUMERIC,
            close NUMERIC,
            vwap NUMERIC,
            week52_high NUMERIC,
            week52_low NUMERIC,
            volume BIGINT,
            value NUMERIC,
            no_of_trades BIGINT
        )
        "#
    )
}

fn insert_statement(table: &str) -> String {
    format!(
        r#"
        INSERT INTO {table} (
            date, series, open, high, low, prev_close, ltp, close, vwap,
            week52_high, week52_low, volume, value, no_of_trades
        )
        VALUES ($1::date, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        "#
    )
}

#[async_trait]
impl QuoteStore for PgQuoteStore {
    type Session = PgSession;

    async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::query(&create_table_statement(&self.table))
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Schema(e.to_string()))?;
        Ok(())
    }

    async fn begin(&self) -> StoreResult<PgSession> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Transaction(e.to_string()))?;

        Ok(PgSession {
            tx,
            insert_sql: self.insert_sql.clone(),
        })
    }

    async fn ping(&self) -> StoreResult<DateTime<Utc>> {
        let row = sqlx::query("SELECT NOW() AS now")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        row.try_get::<DateTime<Utc>, _>("now")
            .map_err(|e| StoreError::Connection(e.to_string()))
    }

    async fn close(&self) -> StoreResult<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// One open PostgreSQL transaction.
///
/// sqlx rolls the transaction back if it is dropped uncommitted, and the
/// connection goes back to the pool either way.
pub struct PgSession {
    tx: Transaction<'static, Postgres>,
    insert_sql: String,
}

#[async_trait]
impl StoreSession for PgSession {
    async fn insert(&mut self, index: usize, record: &QuoteRecord) -> StoreResult<()> {
        sqlx::query(&self.insert_sql)
            .bind(record.date.as_ref().map(|d| d.as_str().to_string()))
            .bind(record.series.as_deref())
            .bind(record.open)
            .bind(record.high)
            .bind(record.low)
            .bind(record.prev_close)
            .bind(record.ltp)
            .bind(record.close)
            .bind(record.vwap)
            .bind(record.week52_high)
            .bind(record.week52_low)
            .bind(record.volume)
            .bind(record.value)
            .bind(record.no_of_trades)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| StoreError::Insert {
                index,
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn commit(self) -> StoreResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| StoreError::Transaction(e.to_string()))
    }

    async fn rollback(self) -> StoreResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| StoreError::Transaction(e.to_string()))
    }
}
