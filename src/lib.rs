//! # Bolt Driver Core
//!
//! Result streaming, connection ownership and TLS peer selection for
//! clients of Bolt graph databases.
//!
//! ## Features
//!
//! - **Both result generations** - Bolt 3 delivers every row in one
//!   response, Bolt 4+ pages them with `PULL { n, qid }`; [`ResultStream`]
//!   hides the difference behind one forward-only cursor
//! - **No leaked connections** - every stream holds one ownership lease on
//!   its connection and gives it back exactly once, whether the result is
//!   exhausted, closed, discarded or dropped
//! - **Cluster-aware TLS** - [`TlsPolicy`] picks the host to verify from the
//!   URI scheme, the routing table and the SSL settings
//! - **Async/Await** - Built on Tokio
//!
//! ## Basic Usage
//!
//! The transport (socket, handshake, PackStream) is supplied by
//! implementing [`Connection`]:
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use bolt_driver_core::{ResultStream, DriverResult};
//!
//! async fn first_rows(conn: Arc<dyn bolt_driver_core::Connection>) -> DriverResult<()> {
//!     let mut result = ResultStream::new(conn, 100, -1).await?;
//!
//!     // Read two rows; dropping the stream afterwards discards the rest
//!     // on the server and releases the connection.
//!     for _ in 0..2 {
//!         if let Some(row) = result.next().await? {
//!             println!("{:?}", row);
//!         }
//!     }
//!     result.close().await
//! }
//! ```
//!
//! ## TLS
//!
//! ```rust
//! use bolt_driver_core::{SslConfiguration, TlsPolicy};
//! use url::Url;
//!
//! let uri = Url::parse("neo4j+s://db.example.com").unwrap();
//! let params = TlsPolicy::configure(&uri, &uri, None, &SslConfiguration::default());
//! assert!(params.enabled);
//! assert_eq!(params.peer_name, "db.example.com");
//! ```
//!
//! ## Modules
//!
//! - [`driver`] - Result streams, connection boundary, configuration, TLS
//! - [`bolt`] - Protocol versions and response messages

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod bolt;
pub mod driver;

// Re-exports for convenience
pub use driver::{
    Connection, ConnectionLease, DriverConfiguration, DriverError, DriverResult, Record,
    ResultStream, ResultSummary, SslConfiguration, SslMode, SummarizedResult, TlsParameters,
    TlsPolicy, Value, FETCH_ALL,
};

pub use bolt::{BoltResponse, BoltVersion, ProtocolGeneration, SuccessMessage};
