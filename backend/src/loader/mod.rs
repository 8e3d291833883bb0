//! Atomic batch loading.
//!
//! A load is one transaction: `Idle -> TransactionOpen -> Committed` when every
//! row inserts, `-> RolledBack` on the first failure or on shutdown. No
//! partially committed state is ever visible.

use std::future::Future;

use crate::api::logs::{log_info, log_success, log_warning};
use crate::error::{LoadError, LoadResult};
use crate::models::{LoadReport, QuoteRecord};
use crate::store::{QuoteStore, StoreSession};

/// Drives schema bootstrap and transactional inserts against a borrowed store.
pub struct Loader<'a, S: QuoteStore> {
    store: &'a S,
}

impl<'a, S: QuoteStore> Loader<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Create the destination table when absent. Safe to call on every run.
    pub async fn ensure_schema(&self) -> LoadResult<()> {
        self.store.ensure_schema().await.map_err(LoadError::Schema)?;
        log_success("Destination table ready");
        Ok(())
    }

    /// Insert every record, in order, inside a single transaction.
    pub async fn load_all<I>(&self, records: I) -> LoadResult<LoadReport>
    where
        I: IntoIterator<Item = QuoteRecord>,
        I::IntoIter: Send,
    {
        self.load_all_until(records, std::future::pending::<()>()).await
    }

    /// Like [`load_all`](Self::load_all), but rolls back as soon as
    /// `shutdown` completes.
    pub async fn load_all_until<I, F>(&self, records: I, shutdown: F) -> LoadResult<LoadReport>
    where
        I: IntoIterator<Item = QuoteRecord>,
        I::IntoIter: Send,
        F: Future + Send,
    {
        let mut session = self.store.begin().await.map_err(LoadError::Begin)?;
        log_info("Transaction opened");

        tokio::pin!(shutdown);
        let mut inserted = 0usize;

        for (index, record) in records.into_iter().enumerate() {
            let outcome = tokio::select! {
                biased;
                _ = &mut shutdown => None,
                res = session.insert(index, &record) => Some(res),
            };

            match outcome {
                Some(Ok(())) => inserted += 1,
                Some(Err(source)) => {
                    log_warning(format!("Row {} rejected, rolling back {} staged rows", index, inserted));
                    rollback(session).await;
                    return Err(LoadError::Insert { index, source });
                }
                None => {
                    log_warning(format!("Shutdown requested, rolling back {} staged rows", inserted));
                    rollback(session).await;
                    return Err(LoadError::Cancelled { inserted });
                }
            }
        }

        session.commit().await.map_err(LoadError::Commit)?;
        log_success(format!("Committed {} rows", inserted));

        Ok(LoadReport { committed: inserted })
    }

    /// Release the store's connections. Failure is reported, never fatal.
    pub async fn release(&self) {
        if let Err(e) = self.store.close().await {
            log_warning(format!("Storage release failed: {}", e));
        }
    }
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
pub async fn shutdown_signal() {
    until_signal(tokio::signal::ctrl_c()).await
}

/// Wait for `signal`; a registration error parks forever instead of firing.
async fn until_signal<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        log_warning(format!("Shutdown signal unavailable: {}", e));
        std::future::pending::<()>().await;
    }
}

async fn rollback<T: StoreSession>(session: T) {
    match session.rollback().await {
        Ok(()) => log_info("Transaction rolled back"),
        Err(e) => log_warning(format!("Rollback reported an error (transaction is discarded): {}", e)),
    }
}
