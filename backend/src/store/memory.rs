//! In-memory store for exercising the loader without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use super::{QuoteStore, StoreSession};
use crate::error::{StoreError, StoreResult};
use crate::models::QuoteRecord;

#[derive(Default)]
struct State {
    tables: usize,
    rows: Vec<(u64, QuoteRecord)>,
    next_id: u64,
    open_sessions: usize,
    commits: usize,
    rollbacks: usize,
    closed: bool,
}

/// Committed rows live in shared state; staged rows live in the session.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    fail_insert_at: Option<usize>,
    fail_schema: bool,
    fail_close: bool,
    fail_commit: bool,
    cancel_after: Arc<Mutex<Option<(usize, oneshot::Sender<()>)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the row at `index` with a constraint-style error.
    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_insert_at = Some(index);
        self
    }

    pub fn failing_schema(mut self) -> Self {
        self.fail_schema = true;
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub fn failing_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }

    /// Fire the returned receiver once `count` rows have been staged.
    pub fn cancel_after(&self, count: usize) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        *self.cancel_after.lock().unwrap() = Some((count, tx));
        rx
    }

    pub fn rows(&self) -> Vec<(u64, QuoteRecord)> {
        self.state.lock().unwrap().rows.clone()
    }

    pub fn table_count(&self) -> usize {
        self.state.lock().unwrap().tables
    }

    pub fn open_sessions(&self) -> usize {
        self.state.lock().unwrap().open_sessions
    }

    pub fn commits(&self) -> usize {
        self.state.lock().unwrap().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.state.lock().unwrap().rollbacks
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

#[async_trait]
impl QuoteStore for MemoryStore {
    type Session = MemorySession;

    async fn ensure_schema(&self) -> StoreResult<()> {
        if self.fail_schema {
            return Err(StoreError::Schema("permission denied for schema public".into()));
        }
        let mut state = self.state.lock().unwrap();
        if state.tables == 0 {
            state.tables = 1;
        }
        Ok(())
    }

    async fn begin(&self) -> StoreResult<MemorySession> {
        self.state.lock().unwrap().open_sessions += 1;
        Ok(MemorySession {
            store: self.clone(),
            staged: Vec::new(),
            finished: false,
        })
    }

    async fn ping(&self) -> StoreResult<DateTime<Utc>> {
        Ok(Utc::now())
    }

    async fn close(&self) -> StoreResult<()> {
        if self.fail_close {
            return Err(StoreError::Release("pool already torn down".into()));
        }
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

pub struct MemorySession {
    store: MemoryStore,
    staged: Vec<QuoteRecord>,
    finished: bool,
}

impl MemorySession {
    fn finish(&mut self, committed: bool) {
        let mut state = self.store.state.lock().unwrap();
        state.open_sessions -= 1;
        if committed {
            for record in self.staged.drain(..) {
                state.next_id += 1;
                let id = state.next_id;
                state.rows.push((id, record));
            }
            state.commits += 1;
        } else {
            self.staged.clear();
            state.rollbacks += 1;
        }
        self.finished = true;
    }
}

#[async_trait]
impl StoreSession for MemorySession {
    async fn insert(&mut self, index: usize, record: &QuoteRecord) -> StoreResult<()> {
        if self.store.fail_insert_at == Some(index) {
            return Err(StoreError::Insert {
                index,
                message: "duplicate key value violates unique constraint".into(),
            });
        }
        self.staged.push(record.clone());

        let mut trigger = self.store.cancel_after.lock().unwrap();
        if matches!(trigger.as_ref(), Some((count, _)) if *count == self.staged.len()) {
            if let Some((_, tx)) = trigger.take() {
                let _ = tx.send(());
            }
        }
        Ok(())
    }

    async fn commit(mut self) -> StoreResult<()> {
        if self.store.fail_commit {
            self.finish(false);
            return Err(StoreError::Transaction("connection reset during commit".into()));
        }
        self.finish(true);
        Ok(())
    }

    async fn rollback(mut self) -> StoreResult<()> {
        self.finish(false);
        Ok(())
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        if !self.finished {
            self.finish(false);
        }
    }
}
