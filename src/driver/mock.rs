//! Scripted in-memory connection for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::bolt::{BoltResponse, BoltVersion, FailureMessage, Row, SuccessMessage};

use super::connection::{Connection, OwnerCount};
use super::error::{DriverError, DriverResult};
use super::types::Value;

/// Connection that answers PULL with pre-scripted pages and records every
/// interaction.
pub(crate) struct MockConnection {
    version: BoltVersion,
    pages: Mutex<VecDeque<DriverResult<Vec<BoltResponse>>>>,
    pulls: Mutex<Vec<(i64, i64)>>,
    discards: Mutex<Vec<i64>>,
    closes: AtomicUsize,
    open: AtomicBool,
    owners: OwnerCount,
}

impl MockConnection {
    pub fn new(version: BoltVersion) -> Self {
        Self {
            version,
            pages: Mutex::new(VecDeque::new()),
            pulls: Mutex::new(Vec::new()),
            discards: Mutex::new(Vec::new()),
            closes: AtomicUsize::new(0),
            open: AtomicBool::new(true),
            owners: OwnerCount::new(),
        }
    }

    /// Queue a page of integer rows (one column each).
    pub fn with_page(self, rows: &[i64], has_more: bool) -> Self {
        let rows = rows.iter().map(|&i| vec![Value::Integer(i)]).collect();
        self.with_rows(rows, SuccessMessage::streaming_success(has_more, None))
    }

    /// Queue a page of arbitrary rows with the given trailing metadata.
    pub fn with_rows(self, rows: Vec<Row>, metadata: SuccessMessage) -> Self {
        let mut responses: Vec<BoltResponse> =
            rows.into_iter().map(BoltResponse::record).collect();
        responses.push(BoltResponse::Success(metadata));
        self.pages.lock().push_back(Ok(responses));
        self
    }

    /// Queue a page ending in a server FAILURE.
    pub fn with_failure(self, code: &str, message: &str) -> Self {
        self.pages
            .lock()
            .push_back(Ok(vec![BoltResponse::Failure(FailureMessage::new(code, message))]));
        self
    }

    /// Queue a transport error.
    pub fn with_error(self, error: DriverError) -> Self {
        self.pages.lock().push_back(Err(error));
        self
    }

    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::SeqCst);
    }

    pub fn pulls(&self) -> Vec<(i64, i64)> {
        self.pulls.lock().clone()
    }

    pub fn discards(&self) -> Vec<i64> {
        self.discards.lock().clone()
    }

    pub fn close_calls(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn version(&self) -> BoltVersion {
        self.version
    }

    async fn pull(&self, qid: i64, n: i64) -> DriverResult<Vec<BoltResponse>> {
        self.pulls.lock().push((qid, n));
        self.pages
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(DriverError::protocol("no scripted page left")))
    }

    async fn discard(&self, qid: i64) -> DriverResult<Vec<BoltResponse>> {
        self.discards.lock().push(qid);
        Ok(vec![BoltResponse::Success(SuccessMessage::new())])
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_owner_count(&self) {
        self.owners.increment();
    }

    fn decrement_owner_count(&self) {
        self.owners.decrement();
    }

    fn owner_count(&self) -> usize {
        self.owners.get()
    }
}

/// Let spawned cleanup tasks run on the current-thread test runtime.
pub(crate) async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
