//! 라우팅 테이블
//!
//! 클러스터의 서버 역할별 목록을 관리합니다.

use std::collections::HashSet;

use super::ServerAddress;

/// 서버 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerRole {
    /// 라우팅 테이블 제공자
    Route,
    /// 쓰기 트랜잭션 처리 (리더)
    Write,
    /// 읽기 트랜잭션 처리 (팔로워)
    Read,
}

impl ServerRole {
    /// 문자열에서 역할 파싱
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ROUTE" => Some(Self::Route),
            "WRITE" => Some(Self::Write),
            "READ" => Some(Self::Read),
            _ => None,
        }
    }

    /// 역할을 문자열로 변환
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Route => "ROUTE",
            Self::Write => "WRITE",
            Self::Read => "READ",
        }
    }
}

/// 라우팅 테이블 스냅샷
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    /// 라우터 목록
    pub routers: Vec<ServerAddress>,
    /// 라이터 목록
    pub writers: Vec<ServerAddress>,
    /// 리더 목록
    pub readers: Vec<ServerAddress>,
    /// 데이터베이스 이름
    pub database: Option<String>,
}

impl RoutingTable {
    /// 새 라우팅 테이블 생성
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: Some(database.into()),
            ..Self::default()
        }
    }

    /// 역할별 서버 추가 (중복 무시)
    pub fn add_server(&mut self, role: ServerRole, address: ServerAddress) {
        let list = match role {
            ServerRole::Route => &mut self.routers,
            ServerRole::Write => &mut self.writers,
            ServerRole::Read => &mut self.readers,
        };
        if !list.contains(&address) {
            list.push(address);
        }
    }

    /// 빌더 스타일 서버 추가
    pub fn with_server(mut self, role: ServerRole, address: ServerAddress) -> Self {
        self.add_server(role, address);
        self
    }

    /// 역할별 서버 목록
    pub fn servers(&self, role: ServerRole) -> &[ServerAddress] {
        match role {
            ServerRole::Route => &self.routers,
            ServerRole::Write => &self.writers,
            ServerRole::Read => &self.readers,
        }
    }

    /// 서로 다른 서버의 수
    ///
    /// `None`이면 모든 역할을 합쳐 셉니다. 여러 역할을 겸하는 서버는 한 번만
    /// 셉니다.
    pub fn distinct_servers(&self, role: Option<ServerRole>) -> usize {
        match role {
            Some(role) => self.servers(role).iter().collect::<HashSet<_>>().len(),
            None => self
                .routers
                .iter()
                .chain(&self.writers)
                .chain(&self.readers)
                .collect::<HashSet<_>>()
                .len(),
        }
    }

    /// 서버가 있는지 확인
    pub fn has_servers(&self) -> bool {
        !self.writers.is_empty() || !self.readers.is_empty()
    }

    /// 서버 제거
    pub fn remove_server(&mut self, address: &ServerAddress) {
        self.routers.retain(|a| a != address);
        self.writers.retain(|a| a != address);
        self.readers.retain(|a| a != address);
    }

    /// 테이블 초기화
    pub fn clear(&mut self) {
        self.routers.clear();
        self.writers.clear();
        self.readers.clear();
    }
}
