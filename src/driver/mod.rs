//! Driver Module
//!
//! 결과 스트리밍과 연결 소유권, TLS 피어 선택
//!
//! # 구성
//!
//! - [`Connection`]: 전송 계층 경계 (PULL, DISCARD, 소유권 카운트)
//! - [`ResultStream`]: 쿼리 하나의 행을 순방향으로 읽는 커서
//! - [`SummarizedResult`]: 키가 붙은 레코드와 결과 요약
//! - [`TlsPolicy`]: 연결 보안 시 TLS 사용 여부와 검증 대상 호스트 결정
//! - [`DriverConfiguration`]: 드라이버 설정 스냅샷
//!
//! # Example
//!
//! ```ignore
//! use bolt_driver_core::driver::{ResultStream, SummarizedResult, FETCH_ALL};
//!
//! // 연결은 상위 계층(풀)에서 획득
//! let stream = ResultStream::new(connection.clone(), 1000, qid).await?;
//! let mut result = SummarizedResult::new(stream, run_metadata);
//!
//! while let Some(record) = result.next().await? {
//!     println!("{}", record);
//! }
//! let summary = result.summary().await?;
//! println!("nodes created: {}", summary.counters.nodes_created);
//! ```

pub mod routing;
mod config;
mod connection;
mod error;
mod record;
mod result;
mod summary;
mod tls;
mod types;

#[cfg(test)]
pub(crate) mod mock;

// Re-exports
pub use config::{
    Cache, Deferred, DriverConfiguration, MemoryCache, SemaphoreFactory, SharedSemaphoreFactory,
    DEFAULT_ACQUIRE_CONNECTION_TIMEOUT, DEFAULT_POOL_SIZE, DEFAULT_USER_AGENT,
};
pub use connection::{Connection, ConnectionLease, OwnerCount, FETCH_ALL, LAST_QUERY};
pub use error::{BoltError, DriverError, DriverResult};
pub use record::{Record, RecordKeys};
pub use result::{FinishedCallback, Metadata, ResultStream};
pub use routing::{RoutingTable, ServerAddress, ServerRole};
pub use summary::{Counters, InputPosition, Notification, QueryType, ResultSummary, SummarizedResult};
pub use tls::{SslConfiguration, SslMode, TlsParameters, TlsPolicy};
pub use types::Value;
