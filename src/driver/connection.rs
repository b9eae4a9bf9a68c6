//! Connection boundary used by result streams.
//!
//! The physical transport (socket, handshake, message framing) lives behind
//! the [`Connection`] trait. A single connection may be shared by several
//! result streams; each stream holds a [`ConnectionLease`] so the connection
//! knows how many live owners it has and is only handed back once the last
//! one lets go.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::bolt::{BoltResponse, BoltVersion, ProtocolGeneration};

use super::error::DriverResult;

/// Fetch size sentinel meaning "every remaining row".
pub const FETCH_ALL: i64 = -1;

/// Query id sentinel addressing the last query run on the connection.
pub const LAST_QUERY: i64 = -1;

/// An established Bolt connection as seen by the result layer.
///
/// `close` is a release request: implementations must only hand the
/// connection back (to a pool, or shut the socket) once `owner_count` has
/// dropped to zero, and ignore the request otherwise.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Negotiated protocol version.
    fn version(&self) -> BoltVersion;

    /// Result delivery semantics of the negotiated version.
    fn protocol_generation(&self) -> ProtocolGeneration {
        self.version().generation()
    }

    /// Request up to `n` rows of query `qid` (`n == -1` for all).
    ///
    /// On Bolt 3 this is PULL_ALL and both arguments are ignored. The
    /// returned responses are the RECORDs of the page followed by the
    /// trailing summary.
    async fn pull(&self, qid: i64, n: i64) -> DriverResult<Vec<BoltResponse>>;

    /// Discard the remaining rows of query `qid`.
    async fn discard(&self, qid: i64) -> DriverResult<Vec<BoltResponse>>;

    /// Whether the transport is still usable.
    fn is_open(&self) -> bool;

    /// Release request.
    fn close(&self);

    fn increment_owner_count(&self);

    fn decrement_owner_count(&self);

    fn owner_count(&self) -> usize;
}

// ============================================================================
// OwnerCount
// ============================================================================

/// Atomic ownership counter for [`Connection`] implementors.
#[derive(Debug, Default)]
pub struct OwnerCount(AtomicUsize);

impl OwnerCount {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an owner. Returns the new count.
    pub fn increment(&self) -> usize {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Unregister an owner. Returns the new count.
    ///
    /// Dropping below zero is a bookkeeping bug in the caller; the count is
    /// left at zero.
    pub fn decrement(&self) -> usize {
        match self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        {
            Ok(previous) => previous - 1,
            Err(_) => {
                tracing::error!("connection owner count decremented below zero");
                debug_assert!(false, "connection owner count underflow");
                0
            }
        }
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    /// No stream currently owns the connection.
    pub fn is_unowned(&self) -> bool {
        self.get() == 0
    }
}

// ============================================================================
// ConnectionLease
// ============================================================================

/// One unit of ownership over a shared connection.
///
/// Acquiring a lease increments the owner count; releasing it decrements
/// the count and issues a release request. Release happens at most once,
/// either explicitly or when the lease is dropped.
pub struct ConnectionLease {
    connection: Arc<dyn Connection>,
    released: bool,
}

impl ConnectionLease {
    pub fn acquire(connection: Arc<dyn Connection>) -> Self {
        connection.increment_owner_count();
        tracing::debug!(owners = connection.owner_count(), "connection lease acquired");
        Self {
            connection,
            released: false,
        }
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Give up ownership. Subsequent calls do nothing.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.connection.decrement_owner_count();
        tracing::debug!(owners = self.connection.owner_count(), "connection lease released");
        self.connection.close();
    }

    /// Move the release obligation into a new lease, leaving this one
    /// released without touching the owner count.
    pub fn transfer(&mut self) -> ConnectionLease {
        let moved = ConnectionLease {
            connection: Arc::clone(&self.connection),
            released: self.released,
        };
        self.released = true;
        moved
    }
}

impl Drop for ConnectionLease {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for ConnectionLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionLease")
            .field("version", &self.connection.version())
            .field("released", &self.released)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
