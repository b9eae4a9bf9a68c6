//! Result streaming over a shared Bolt connection.
//!
//! A [`ResultStream`] turns the rows of one query into a forward-only
//! sequence. On Bolt 3 every row arrives in the response to a single
//! PULL_ALL issued when the stream is created. From Bolt 4 on rows are
//! pulled page by page (`PULL { n: fetch_size, qid }`) only when the
//! consumer has drained the previous page.
//!
//! The stream owns one [`ConnectionLease`] for its whole lifetime. The
//! lease is given back as soon as the server reports the last page, on an
//! explicit [`ResultStream::close`], or when the stream is dropped. A
//! stream dropped before its last page discards the rest of the query on
//! the server first.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use futures::stream::{self, Stream};

use crate::bolt::{ProtocolGeneration, PullPage, Row, SuccessMessage};

use super::connection::{Connection, ConnectionLease, FETCH_ALL};
use super::error::{DriverError, DriverResult};

/// Summary metadata sent by the server after the last row.
pub type Metadata = SuccessMessage;

/// Hook invoked once the whole result has been produced.
pub type FinishedCallback = Box<dyn FnOnce(Metadata) + Send>;

/// Forward-only cursor over the rows of a single query.
pub struct ResultStream {
    lease: ConnectionLease,
    generation: ProtocolGeneration,
    qid: i64,
    fetch_size: i64,

    /// Rows received but not yet handed out
    buffer: VecDeque<Row>,
    /// Metadata of the final page, set once
    terminal: Option<Metadata>,
    on_finished: Option<FinishedCallback>,

    // Cursor
    primed: bool,
    current: Option<(usize, Row)>,
    next_index: usize,
    finished: bool,
    failed: bool,
    discarded: bool,
}

impl ResultStream {
    /// Bind a stream to query `qid` on `connection`.
    ///
    /// `fetch_size` is the page size used by paginated protocol versions,
    /// either positive or [`FETCH_ALL`]. On Bolt 3 the whole result is
    /// loaded before this returns.
    pub async fn new(
        connection: Arc<dyn Connection>,
        fetch_size: i64,
        qid: i64,
    ) -> DriverResult<Self> {
        if fetch_size == 0 || fetch_size < FETCH_ALL {
            return Err(DriverError::configuration(format!(
                "Invalid fetch size {}: must be positive or {}",
                fetch_size, FETCH_ALL
            )));
        }

        let generation = connection.protocol_generation();
        let mut stream = Self {
            lease: ConnectionLease::acquire(connection),
            generation,
            qid,
            fetch_size,
            buffer: VecDeque::new(),
            terminal: None,
            on_finished: None,
            primed: false,
            current: None,
            next_index: 0,
            finished: false,
            failed: false,
            discarded: false,
        };

        if !generation.is_paginated() {
            if let Err(e) = stream.fetch(FETCH_ALL).await {
                stream.lease.release();
                return Err(e);
            }
        }

        Ok(stream)
    }

    pub fn qid(&self) -> i64 {
        self.qid
    }

    /// Page size requested from paginated servers.
    pub fn fetch_size(&self) -> i64 {
        self.fetch_size
    }

    pub fn generation(&self) -> ProtocolGeneration {
        self.generation
    }

    /// Every row has been produced and the finished hook has run.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_discarded(&self) -> bool {
        self.discarded
    }

    /// Metadata of the final page, once the server has sent it.
    pub fn summary(&self) -> Option<&Metadata> {
        self.terminal.as_ref()
    }

    /// Register the hook run after the last row has been produced.
    ///
    /// It receives the final metadata (empty when none was captured). It
    /// does not run for a stream that is discarded, dropped early or
    /// failed.
    pub fn set_finished_callback(&mut self, callback: impl FnOnce(Metadata) + Send + 'static) {
        self.on_finished = Some(Box::new(callback));
    }

    // ------------------------------------------------------------------------
    // Cursor
    // ------------------------------------------------------------------------

    /// Whether the cursor is positioned on a row.
    pub async fn has_more(&mut self) -> DriverResult<bool> {
        self.prime().await?;
        Ok(self.current.is_some())
    }

    /// Row under the cursor.
    pub async fn current(&mut self) -> DriverResult<Option<&Row>> {
        self.prime().await?;
        Ok(self.current.as_ref().map(|(_, row)| row))
    }

    /// Zero-based index of the row under the cursor.
    ///
    /// Indices keep counting across pages.
    pub async fn position(&mut self) -> DriverResult<Option<usize>> {
        self.prime().await?;
        Ok(self.current.as_ref().map(|(index, _)| *index))
    }

    /// Move to the next row. No-op once exhausted.
    pub async fn advance(&mut self) -> DriverResult<()> {
        self.prime().await?;
        if self.current.is_some() {
            self.load_current().await?;
        }
        Ok(())
    }

    /// Take the row under the cursor and step past it.
    ///
    /// The following row is only loaded (and, if needed, pulled) by the
    /// next cursor call.
    pub async fn next(&mut self) -> DriverResult<Option<Row>> {
        self.prime().await?;
        let row = self.current.take().map(|(_, row)| row);
        if row.is_some() {
            self.primed = false;
        }
        Ok(row)
    }

    /// Always fails: a Bolt result can only be read once.
    pub fn rewind(&mut self) -> DriverResult<()> {
        Err(DriverError::unsupported("Cannot rewind a bolt result"))
    }

    /// Adapt into a [`Stream`] of rows.
    pub fn into_stream(self) -> impl Stream<Item = DriverResult<Row>> + Send {
        stream::try_unfold(self, |mut result| async move {
            Ok(result.next().await?.map(|row| (row, result)))
        })
    }

    /// Skip the remaining rows and return the final metadata.
    pub async fn consume(&mut self) -> DriverResult<Metadata> {
        while self.next().await?.is_some() {}
        Ok(self.terminal.clone().unwrap_or_default())
    }

    /// Ask the server to drop the remaining rows of this query.
    ///
    /// Iteration ends immediately and the finished hook will not run.
    /// Calling it again does nothing.
    pub async fn discard(&mut self) -> DriverResult<()> {
        if self.discarded {
            return Ok(());
        }
        self.discarded = true;
        self.buffer.clear();
        self.current = None;

        let result = if self.terminal.is_none() && !self.lease.is_released() {
            tracing::debug!(qid = self.qid, "discarding remaining results");
            match self
                .lease
                .connection()
                .discard(self.qid)
                .await
                .and_then(PullPage::from_responses)
            {
                Ok(page) => {
                    self.terminal = Some(page.metadata);
                    Ok(())
                }
                Err(e) => Err(e),
            }
        } else {
            Ok(())
        };

        self.lease.release();
        result
    }

    /// Dispose of the stream, discarding unread rows if the connection is
    /// still usable.
    pub async fn close(mut self) -> DriverResult<()> {
        let result = if self.needs_discard() {
            self.discard().await
        } else {
            Ok(())
        };
        self.lease.release();
        result
    }

    /// Run `f` against the stream, then close it whatever `f` returned.
    pub async fn scoped<T>(
        mut self,
        f: impl AsyncFnOnce(&mut ResultStream) -> DriverResult<T>,
    ) -> DriverResult<T> {
        let outcome = f(&mut self).await;
        let closed = self.close().await;
        let value = outcome?;
        closed?;
        Ok(value)
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    async fn prime(&mut self) -> DriverResult<()> {
        if !self.primed {
            self.primed = true;
            self.load_current().await?;
        }
        Ok(())
    }

    async fn load_current(&mut self) -> DriverResult<()> {
        self.current = None;
        if let Some(row) = self.step().await? {
            self.current = Some((self.next_index, row));
            self.next_index += 1;
        }
        Ok(())
    }

    /// Produce the next row, pulling pages as needed.
    async fn step(&mut self) -> DriverResult<Option<Row>> {
        loop {
            if self.finished || self.failed || self.discarded {
                return Ok(None);
            }
            if let Some(row) = self.buffer.pop_front() {
                return Ok(Some(row));
            }
            if self.terminal.is_some() || !self.generation.is_paginated() {
                self.finish();
                return Ok(None);
            }
            self.fetch(self.fetch_size).await?;
        }
    }

    async fn fetch(&mut self, n: i64) -> DriverResult<()> {
        let page = match self
            .lease
            .connection()
            .pull(self.qid, n)
            .await
            .and_then(PullPage::from_responses)
        {
            Ok(page) => page,
            Err(e) => {
                self.failed = true;
                tracing::warn!(qid = self.qid, error = %e, "failed to pull results");
                return Err(e);
            }
        };

        let has_more = page.metadata.has_more();
        tracing::debug!(
            qid = self.qid,
            fetch_size = n,
            rows = page.rows.len(),
            has_more,
            "pulled result page"
        );

        self.buffer.extend(page.rows);
        if !has_more {
            self.terminal = Some(page.metadata);
            self.lease.release();
        }
        Ok(())
    }

    fn finish(&mut self) {
        self.finished = true;
        self.lease.release();
        if let Some(callback) = self.on_finished.take() {
            callback(self.terminal.clone().unwrap_or_default());
        }
    }

    /// The server still holds rows for this query and can be told to drop
    /// them.
    fn needs_discard(&self) -> bool {
        !self.lease.is_released()
            && self.terminal.is_none()
            && !self.discarded
            && self.lease.connection().is_open()
    }
}

impl Drop for ResultStream {
    fn drop(&mut self) {
        if self.lease.is_released() {
            return;
        }
        if !self.needs_discard() {
            self.lease.release();
            return;
        }

        let qid = self.qid;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!(qid, "result dropped before completion, discarding");
                let mut lease = self.lease.transfer();
                handle.spawn(async move {
                    if let Err(e) = lease.connection().discard(qid).await {
                        tracing::warn!(qid, error = %e, "discard of abandoned result failed");
                    }
                    lease.release();
                });
            }
            Err(_) => {
                tracing::warn!(qid, "no async runtime to discard abandoned result");
                self.lease.release();
            }
        }
    }
}

impl fmt::Debug for ResultStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultStream")
            .field("qid", &self.qid)
            .field("fetch_size", &self.fetch_size)
            .field("generation", &self.generation)
            .field("buffered", &self.buffer.len())
            .field("finished", &self.finished)
            .field("discarded", &self.discarded)
            .field("failed", &self.failed)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use futures::TryStreamExt;

    use super::*;
    use crate::bolt::BoltVersion;
    use crate::driver::connection::LAST_QUERY;
    use crate::driver::mock::{settle, MockConnection};
    use crate::driver::types::Value;

    fn ints(rows: &[Row]) -> Vec<i64> {
        rows.iter().map(|r| r[0].as_int().unwrap()).collect()
    }

    fn paginated_five() -> Arc<MockConnection> {
        Arc::new(
            MockConnection::new(BoltVersion::V4_4)
                .with_page(&[1, 2], true)
                .with_page(&[3, 4], true)
                .with_rows(
                    vec![vec![Value::Integer(5)]],
                    SuccessMessage::new().with("bookmark", "bm:5").with("t_last", 7i64),
                ),
        )
    }

    #[tokio::test]
    async fn test_paginated_concatenates_pages() {
        let conn = paginated_five();
        let mut result = ResultStream::new(conn.clone(), 2, 7).await.unwrap();
        assert_eq!(conn.owner_count(), 1);
        assert!(conn.pulls().is_empty());

        let mut seen = Vec::new();
        while result.has_more().await.unwrap() {
            let index = result.position().await.unwrap().unwrap();
            let row = result.current().await.unwrap().unwrap().clone();
            seen.push((index, row[0].as_int().unwrap()));
            result.advance().await.unwrap();
        }

        assert_eq!(seen, vec![(0, 1), (1, 2), (2, 3), (3, 4), (4, 5)]);
        assert_eq!(conn.pulls(), vec![(7, 2), (7, 2), (7, 2)]);
        assert_eq!(conn.owner_count(), 0);
        assert_eq!(conn.close_calls(), 1);
        assert_eq!(result.summary().unwrap().bookmark(), Some("bm:5"));
    }

    #[tokio::test]
    async fn test_eager_loads_once() {
        let conn = Arc::new(MockConnection::new(BoltVersion::V3_0).with_page(&[1, 2, 3], false));
        let mut result = ResultStream::new(conn.clone(), 100, LAST_QUERY).await.unwrap();

        assert_eq!(conn.pulls(), vec![(LAST_QUERY, FETCH_ALL)]);
        assert_eq!(conn.owner_count(), 0);
        assert_eq!(result.fetch_size(), 100);

        let mut rows = Vec::new();
        while let Some(row) = result.next().await.unwrap() {
            rows.push(row);
        }
        assert_eq!(ints(&rows), vec![1, 2, 3]);
        assert_eq!(conn.pulls().len(), 1);
        assert!(result.next().await.unwrap().is_none());
        assert_eq!(conn.close_calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_paginated_result() {
        let conn = Arc::new(MockConnection::new(BoltVersion::V4_0).with_page(&[], false));
        let mut result = ResultStream::new(conn.clone(), 10, 0).await.unwrap();

        assert!(!result.has_more().await.unwrap());
        assert_eq!(result.position().await.unwrap(), None);
        result.advance().await.unwrap();
        assert!(!result.has_more().await.unwrap());
        assert!(result.is_finished());
        assert_eq!(conn.owner_count(), 0);
    }

    #[tokio::test]
    async fn test_callback_fires_once_after_last_row() {
        let conn = paginated_five();
        let mut result = ResultStream::new(conn.clone(), 2, 7).await.unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        result.set_finished_callback(move |meta| sink.lock().unwrap().push(meta));

        for _ in 0..5 {
            assert!(result.next().await.unwrap().is_some());
        }
        assert!(seen.lock().unwrap().is_empty());

        assert!(result.next().await.unwrap().is_none());
        assert!(result.next().await.unwrap().is_none());

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].result_consumed_after(), Some(7));
    }

    #[tokio::test]
    async fn test_eager_empty_result_fires_callback() {
        let conn = Arc::new(
            MockConnection::new(BoltVersion::V3_0).with_rows(vec![], SuccessMessage::new()),
        );
        let mut result = ResultStream::new(conn, FETCH_ALL, LAST_QUERY).await.unwrap();
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        result.set_finished_callback(move |meta| *sink.lock().unwrap() = Some(meta));

        assert!(result.next().await.unwrap().is_none());
        assert_eq!(*seen.lock().unwrap(), Some(SuccessMessage::new()));
    }

    #[tokio::test]
    async fn test_consume_matches_iteration() {
        let conn = paginated_five();
        let mut result = ResultStream::new(conn.clone(), 2, 7).await.unwrap();
        let fired = Arc::new(Mutex::new(0));
        let counter = fired.clone();
        result.set_finished_callback(move |_| *counter.lock().unwrap() += 1);

        assert_eq!(result.next().await.unwrap().unwrap()[0], Value::Integer(1));
        let meta = result.consume().await.unwrap();

        assert_eq!(meta.bookmark(), Some("bm:5"));
        assert_eq!(*fired.lock().unwrap(), 1);
        assert!(!result.has_more().await.unwrap());
        assert_eq!(conn.pulls().len(), 3);
        assert_eq!(conn.owner_count(), 0);

        let again = result.consume().await.unwrap();
        assert_eq!(again, meta);
    }

    #[tokio::test]
    async fn test_rewind_fails_without_state_change() {
        let conn = paginated_five();
        let mut result = ResultStream::new(conn.clone(), 2, 7).await.unwrap();
        result.advance().await.unwrap();

        let err = result.rewind().unwrap_err();
        assert!(matches!(err, DriverError::Unsupported(_)));
        assert_eq!(err.to_string(), "Unsupported operation: Cannot rewind a bolt result");
        assert_eq!(result.position().await.unwrap(), Some(1));
        assert_eq!(conn.pulls().len(), 1);
    }

    #[tokio::test]
    async fn test_early_stop_does_not_pull() {
        let conn = paginated_five();
        let mut result = ResultStream::new(conn.clone(), 2, 7).await.unwrap();

        result.next().await.unwrap();
        result.next().await.unwrap();
        assert_eq!(conn.pulls().len(), 1);
    }

    #[tokio::test]
    async fn test_drop_after_partial_read_discards() {
        let conn = paginated_five();
        let fired = Arc::new(Mutex::new(false));
        {
            let mut result = ResultStream::new(conn.clone(), 2, 7).await.unwrap();
            let flag = fired.clone();
            result.set_finished_callback(move |_| *flag.lock().unwrap() = true);
            result.next().await.unwrap();
            result.next().await.unwrap();
        }
        settle().await;

        assert_eq!(conn.discards(), vec![7]);
        assert_eq!(conn.owner_count(), 0);
        assert_eq!(conn.close_calls(), 1);
        assert!(!*fired.lock().unwrap());
    }

    #[test]
    fn test_drop_without_runtime_releases() {
        let conn = paginated_five();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let result = runtime
            .block_on(ResultStream::new(conn.clone(), 2, 7))
            .unwrap();
        drop(runtime);

        drop(result);
        assert!(conn.discards().is_empty());
        assert_eq!(conn.owner_count(), 0);
        assert_eq!(conn.close_calls(), 1);
    }

    #[tokio::test]
    async fn test_drop_on_closed_connection_skips_discard() {
        let conn = paginated_five();
        let result = ResultStream::new(conn.clone(), 2, 7).await.unwrap();
        conn.set_open(false);
        drop(result);
        settle().await;

        assert!(conn.discards().is_empty());
        assert_eq!(conn.owner_count(), 0);
    }

    #[tokio::test]
    async fn test_drop_after_exhaustion_does_nothing() {
        let conn = paginated_five();
        let mut result = ResultStream::new(conn.clone(), 2, 7).await.unwrap();
        result.consume().await.unwrap();
        drop(result);
        settle().await;

        assert!(conn.discards().is_empty());
        assert_eq!(conn.owner_count(), 0);
        assert_eq!(conn.close_calls(), 1);
    }

    #[tokio::test]
    async fn test_explicit_discard_ends_iteration() {
        let conn = paginated_five();
        let mut result = ResultStream::new(conn.clone(), 2, 7).await.unwrap();
        let fired = Arc::new(Mutex::new(false));
        let flag = fired.clone();
        result.set_finished_callback(move |_| *flag.lock().unwrap() = true);

        result.next().await.unwrap();
        result.discard().await.unwrap();
        result.discard().await.unwrap();

        assert!(result.next().await.unwrap().is_none());
        assert_eq!(conn.discards(), vec![7]);
        assert_eq!(conn.owner_count(), 0);
        assert!(!*fired.lock().unwrap());
    }

    #[tokio::test]
    async fn test_close_discards_unfinished() {
        let conn = paginated_five();
        let mut result = ResultStream::new(conn.clone(), 2, 7).await.unwrap();
        result.next().await.unwrap();
        result.close().await.unwrap();

        assert_eq!(conn.discards(), vec![7]);
        assert_eq!(conn.owner_count(), 0);
        assert_eq!(conn.close_calls(), 1);
    }

    #[tokio::test]
    async fn test_shared_connection_released_by_last_owner() {
        let conn = Arc::new(
            MockConnection::new(BoltVersion::V4_4)
                .with_page(&[1], false)
                .with_page(&[2], false),
        );
        let mut first = ResultStream::new(conn.clone(), 10, 1).await.unwrap();
        let mut second = ResultStream::new(conn.clone(), 10, 2).await.unwrap();
        assert_eq!(conn.owner_count(), 2);

        first.consume().await.unwrap();
        assert_eq!(conn.owner_count(), 1);
        second.consume().await.unwrap();
        assert_eq!(conn.owner_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_fetch_size_rejected() {
        let conn = Arc::new(MockConnection::new(BoltVersion::V4_4));
        for size in [0, -2, i64::MIN] {
            let err = ResultStream::new(conn.clone(), size, 0).await.unwrap_err();
            assert!(matches!(err, DriverError::Configuration(_)));
        }
        assert_eq!(conn.owner_count(), 0);
        assert_eq!(conn.close_calls(), 0);
    }

    #[tokio::test]
    async fn test_eager_construction_failure_releases() {
        let conn = Arc::new(
            MockConnection::new(BoltVersion::V3_0)
                .with_error(DriverError::connection("reset by peer")),
        );
        let err = ResultStream::new(conn.clone(), FETCH_ALL, LAST_QUERY).await.unwrap_err();

        assert!(matches!(err, DriverError::Connection(_)));
        assert_eq!(conn.owner_count(), 0);
        assert_eq!(conn.close_calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_pull_stops_stream() {
        let conn = Arc::new(
            MockConnection::new(BoltVersion::V4_4)
                .with_page(&[1], true)
                .with_failure("Neo.ClientError.Statement.ArithmeticError", "/ by zero"),
        );
        let mut result = ResultStream::new(conn.clone(), 1, 3).await.unwrap();
        let fired = Arc::new(Mutex::new(false));
        let flag = fired.clone();
        result.set_finished_callback(move |_| *flag.lock().unwrap() = true);

        assert!(result.next().await.unwrap().is_some());
        let err = result.next().await.unwrap_err();
        assert!(matches!(err, DriverError::Server { .. }));
        assert!(result.next().await.unwrap().is_none());
        assert_eq!(conn.owner_count(), 1);

        result.close().await.unwrap();
        assert_eq!(conn.discards(), vec![3]);
        assert_eq!(conn.owner_count(), 0);
        assert!(!*fired.lock().unwrap());
    }

    #[tokio::test]
    async fn test_drop_after_pull_error_discards() {
        let conn = Arc::new(
            MockConnection::new(BoltVersion::V4_4)
                .with_page(&[1], true)
                .with_error(DriverError::connection("timeout")),
        );
        {
            let mut result = ResultStream::new(conn.clone(), 1, 3).await.unwrap();
            assert!(result.next().await.unwrap().is_some());
            assert!(result.next().await.is_err());
        }
        settle().await;

        assert_eq!(conn.discards(), vec![3]);
        assert_eq!(conn.owner_count(), 0);
        assert_eq!(conn.close_calls(), 1);
    }

    #[tokio::test]
    async fn test_drop_after_pull_error_on_closed_connection() {
        let conn = Arc::new(
            MockConnection::new(BoltVersion::V4_4)
                .with_page(&[1], true)
                .with_error(DriverError::connection("reset by peer")),
        );
        {
            let mut result = ResultStream::new(conn.clone(), 1, 3).await.unwrap();
            result.next().await.unwrap();
            assert!(result.next().await.is_err());
            conn.set_open(false);
        }
        settle().await;

        assert!(conn.discards().is_empty());
        assert_eq!(conn.owner_count(), 0);
    }

    #[tokio::test]
    async fn test_into_stream() {
        let conn = paginated_five();
        let result = ResultStream::new(conn.clone(), 2, 7).await.unwrap();
        let rows: Vec<Row> = result.into_stream().try_collect().await.unwrap();

        assert_eq!(ints(&rows), vec![1, 2, 3, 4, 5]);
        assert_eq!(conn.owner_count(), 0);
    }

    #[tokio::test]
    async fn test_scoped_closes_on_error() {
        let conn = paginated_five();
        let result = ResultStream::new(conn.clone(), 2, 7).await.unwrap();

        let outcome: DriverResult<()> = result
            .scoped(async |stream: &mut ResultStream| {
                stream.next().await?;
                Err(DriverError::protocol("caller gave up"))
            })
            .await;

        assert!(matches!(outcome, Err(DriverError::Protocol(_))));
        assert_eq!(conn.discards(), vec![7]);
        assert_eq!(conn.owner_count(), 0);
    }

    #[tokio::test]
    async fn test_scoped_returns_value() {
        let conn = paginated_five();
        let result = ResultStream::new(conn.clone(), FETCH_ALL, 7).await.unwrap();

        let total = result
            .scoped(async |stream: &mut ResultStream| {
                let mut sum = 0;
                while let Some(row) = stream.next().await? {
                    sum += row[0].as_int().unwrap_or(0);
                }
                Ok(sum)
            })
            .await
            .unwrap();

        assert_eq!(total, 15);
        assert!(conn.discards().is_empty());
        assert_eq!(conn.owner_count(), 0);
    }
}
