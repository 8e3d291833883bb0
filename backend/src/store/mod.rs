//! Storage seam for the loader.
//!
//! The loader only needs a handful of operations: bootstrap the destination
//! table, open an exclusive transactional session, insert rows through it and
//! finish it. [`QuoteStore`] and [`StoreSession`] capture exactly that;
//! [`PgQuoteStore`] is the PostgreSQL implementation.

mod postgres;

#[cfg(test)]
pub(crate) mod memory;

pub use postgres::{PgQuoteStore, PgSession};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreResult;
use crate::models::QuoteRecord;

/// A destination for quote rows.
#[async_trait]
pub trait QuoteStore: Send + Sync {
    type Session: StoreSession;

    /// Create the destination table if it does not exist. Never alters or
    /// drops an existing table.
    async fn ensure_schema(&self) -> StoreResult<()>;

    /// Acquire a connection and open a transaction on it.
    async fn begin(&self) -> StoreResult<Self::Session>;

    /// Round-trip to the server, returning its clock.
    async fn ping(&self) -> StoreResult<DateTime<Utc>>;

    /// Release every pooled connection.
    async fn close(&self) -> StoreResult<()>;
}

/// An open transaction owned by a single load.
///
/// Dropping a session without calling [`commit`](StoreSession::commit) must
/// leave nothing behind.
#[async_trait]
pub trait StoreSession: Send {
    /// Stage one row. `index` is the row's position in the batch.
    async fn insert(&mut self, index: usize, record: &QuoteRecord) -> StoreResult<()>;

    /// Make every staged row visible and release the connection.
    async fn commit(self) -> StoreResult<()>;

    /// Discard every staged row and release the connection.
    async fn rollback(self) -> StoreResult<()>;
}
