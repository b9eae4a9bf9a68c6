//! 라우팅 모듈
//!
//! 클러스터의 서버 주소와 역할별 라우팅 테이블 스냅샷을 제공합니다.
//! 테이블의 조회와 갱신은 상위 계층이 담당하며, 코어는 TLS 피어 선택에서
//! 서로 다른 서버의 수만 참조합니다.

mod table;

use std::fmt;

use url::Url;

use super::error::{DriverError, DriverResult};

pub use table::{RoutingTable, ServerRole};

/// Bolt 기본 포트
pub const DEFAULT_PORT: u16 = 7687;

// ============================================================================
// ServerAddress - 서버 주소
// ============================================================================

/// 서버 주소
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerAddress {
    /// 호스트 (IPv6는 대괄호 포함)
    pub host: String,
    /// 포트
    pub port: u16,
}

impl ServerAddress {
    /// 새 서버 주소 생성
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// URL에서 추출
    pub fn from_url(url: &Url) -> DriverResult<Self> {
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| DriverError::configuration(format!("URI has no host: {}", url)))?;
        Ok(Self::new(host, url.port().unwrap_or(DEFAULT_PORT)))
    }

    /// URI 문자열에서 파싱
    pub fn parse(uri: &str) -> DriverResult<Self> {
        let url = Url::parse(uri)
            .map_err(|e| DriverError::configuration(format!("Invalid URI {}: {}", uri, e)))?;
        Self::from_url(&url)
    }

    /// 소켓 주소로 변환
    pub fn to_socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl Default for ServerAddress {
    fn default() -> Self {
        Self::new("localhost", DEFAULT_PORT)
    }
}
