//! Result Summary
//!
//! 결과 스트림을 키가 붙은 레코드로 변환하고, 마지막 페이지의 메타데이터로
//! 결과 요약(카운터, 북마크, 타이밍)을 만듭니다.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, Stream};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::error::DriverResult;
use super::record::{Record, RecordKeys};
use super::result::{Metadata, ResultStream};
use super::types::Value;

// ============================================================================
// ResultSummary - 결과 요약
// ============================================================================

/// 결과 요약
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    /// 쿼리 타입
    pub query_type: QueryType,
    /// 카운터
    pub counters: Counters,
    /// 북마크
    pub bookmark: Option<String>,
    /// 결과 대기 시간
    pub result_available_after: Option<Duration>,
    /// 결과 소비 시간
    pub result_consumed_after: Option<Duration>,
    /// 데이터베이스 정보
    pub database: Option<String>,
    /// 서버 정보
    pub server: Option<String>,
    /// 알림
    pub notifications: Vec<Notification>,
}

impl ResultSummary {
    /// RUN 응답과 마지막 PULL 응답의 메타데이터로 요약 생성
    pub fn from_metadata(run: &Metadata, terminal: &Metadata) -> Self {
        Self {
            query_type: terminal
                .query_type()
                .and_then(QueryType::from_code)
                .unwrap_or_default(),
            counters: terminal.stats().map(Counters::from_stats).unwrap_or_default(),
            bookmark: terminal.bookmark().map(str::to_string),
            result_available_after: run.result_available_after().map(millis),
            result_consumed_after: terminal.result_consumed_after().map(millis),
            database: terminal.db().or_else(|| run.db()).map(str::to_string),
            server: terminal.server().or_else(|| run.server()).map(str::to_string),
            notifications: terminal
                .notifications()
                .map(|list| list.iter().filter_map(Notification::from_value).collect())
                .unwrap_or_default(),
        }
    }
}

fn millis(ms: i64) -> Duration {
    Duration::from_millis(ms.max(0) as u64)
}

/// 쿼리 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    /// 읽기 전용
    #[default]
    ReadOnly,
    /// 읽기/쓰기
    ReadWrite,
    /// 쓰기 전용
    WriteOnly,
    /// 스키마 변경
    SchemaWrite,
}

impl QueryType {
    /// 서버 코드("r", "rw", "w", "s")에서 변환
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "r" => Some(Self::ReadOnly),
            "rw" => Some(Self::ReadWrite),
            "w" => Some(Self::WriteOnly),
            "s" => Some(Self::SchemaWrite),
            _ => None,
        }
    }
}

// ============================================================================
// Counters - 통계 카운터
// ============================================================================

/// 카운터
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    /// 생성된 노드 수
    pub nodes_created: i64,
    /// 삭제된 노드 수
    pub nodes_deleted: i64,
    /// 생성된 관계 수
    pub relationships_created: i64,
    /// 삭제된 관계 수
    pub relationships_deleted: i64,
    /// 설정된 속성 수
    pub properties_set: i64,
    /// 추가된 레이블 수
    pub labels_added: i64,
    /// 제거된 레이블 수
    pub labels_removed: i64,
    /// 생성된 인덱스 수
    pub indexes_added: i64,
    /// 제거된 인덱스 수
    pub indexes_removed: i64,
    /// 추가된 제약조건 수
    pub constraints_added: i64,
    /// 제거된 제약조건 수
    pub constraints_removed: i64,
    /// 시스템 변경 수
    pub system_updates: i64,
    /// 서버가 보고한 변경 여부
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_updates: Option<bool>,
    /// 서버가 보고한 시스템 변경 여부
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_system_updates: Option<bool>,
}

impl Counters {
    /// 서버 `stats` 맵에서 생성
    pub fn from_stats(stats: &HashMap<String, Value>) -> Self {
        let count = |key: &str| stats.get(key).and_then(Value::as_int).unwrap_or(0);
        let flag = |key: &str| stats.get(key).and_then(Value::as_bool);

        Self {
            nodes_created: count("nodes-created"),
            nodes_deleted: count("nodes-deleted"),
            relationships_created: count("relationships-created"),
            relationships_deleted: count("relationships-deleted"),
            properties_set: count("properties-set"),
            labels_added: count("labels-added"),
            labels_removed: count("labels-removed"),
            indexes_added: count("indexes-added"),
            indexes_removed: count("indexes-removed"),
            constraints_added: count("constraints-added"),
            constraints_removed: count("constraints-removed"),
            system_updates: count("system-updates"),
            reported_updates: flag("contains-updates"),
            reported_system_updates: flag("contains-system-updates"),
        }
    }

    /// 변경 사항 존재 여부
    pub fn contains_updates(&self) -> bool {
        self.reported_updates.unwrap_or_else(|| {
            self.nodes_created > 0
                || self.nodes_deleted > 0
                || self.relationships_created > 0
                || self.relationships_deleted > 0
                || self.properties_set > 0
                || self.labels_added > 0
                || self.labels_removed > 0
                || self.indexes_added > 0
                || self.indexes_removed > 0
                || self.constraints_added > 0
                || self.constraints_removed > 0
        })
    }

    /// 시스템 변경 존재 여부
    pub fn contains_system_updates(&self) -> bool {
        self.reported_system_updates
            .unwrap_or(self.system_updates > 0)
    }
}

// ============================================================================
// Notification - 알림
// ============================================================================

/// 알림
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// 코드
    pub code: String,
    /// 제목
    pub title: String,
    /// 설명
    pub description: String,
    /// 심각도
    pub severity: String,
    /// 위치
    pub position: Option<InputPosition>,
}

impl Notification {
    /// 메타데이터 맵에서 변환 (코드가 없으면 무시)
    fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_map()?;
        let text = |key: &str| {
            map.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        Some(Self {
            code: map.get("code")?.as_str()?.to_string(),
            title: text("title"),
            description: text("description"),
            severity: text("severity"),
            position: map.get("position").and_then(Value::as_map).map(|pos| {
                let at = |key: &str| pos.get(key).and_then(Value::as_int).unwrap_or(0);
                InputPosition {
                    offset: at("offset"),
                    line: at("line"),
                    column: at("column"),
                }
            }),
        })
    }
}

/// 입력 위치
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputPosition {
    /// 오프셋
    pub offset: i64,
    /// 라인
    pub line: i64,
    /// 컬럼
    pub column: i64,
}

// ============================================================================
// SummarizedResult - 요약 포함 결과
// ============================================================================

/// 레코드와 결과 요약을 함께 제공하는 결과
///
/// 요약을 먼저 요청해도 남은 레코드는 버퍼에 보관되어 계속 읽을 수 있습니다.
#[derive(Debug)]
pub struct SummarizedResult {
    stream: ResultStream,
    keys: Arc<RecordKeys>,
    run: Metadata,
    terminal: Arc<Mutex<Option<Metadata>>>,
    buffered: VecDeque<Record>,
}

impl SummarizedResult {
    /// RUN 응답 메타데이터(`fields`, `t_first`)와 결과 스트림으로 생성
    pub fn new(mut stream: ResultStream, run: Metadata) -> Self {
        let keys = RecordKeys::new(run.fields().unwrap_or_default());
        let terminal = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&terminal);
        stream.set_finished_callback(move |meta| *slot.lock() = Some(meta));

        Self {
            stream,
            keys,
            run,
            terminal,
            buffered: VecDeque::new(),
        }
    }

    /// 컬럼 키
    pub fn keys(&self) -> &[String] {
        self.keys.names()
    }

    /// 다음 레코드
    pub async fn next(&mut self) -> DriverResult<Option<Record>> {
        if let Some(record) = self.buffered.pop_front() {
            return Ok(Some(record));
        }
        Ok(self
            .stream
            .next()
            .await?
            .map(|row| Record::with_keys(Arc::clone(&self.keys), row)))
    }

    /// 남은 레코드를 버퍼에 읽어 두고 결과 요약 반환
    pub async fn summary(&mut self) -> DriverResult<ResultSummary> {
        while let Some(row) = self.stream.next().await? {
            self.buffered
                .push_back(Record::with_keys(Arc::clone(&self.keys), row));
        }

        let terminal = self
            .terminal
            .lock()
            .clone()
            .or_else(|| self.stream.summary().cloned())
            .unwrap_or_default();
        Ok(ResultSummary::from_metadata(&self.run, &terminal))
    }

    /// 남은 레코드 전체
    pub async fn collect(mut self) -> DriverResult<Vec<Record>> {
        let mut records = Vec::new();
        while let Some(record) = self.next().await? {
            records.push(record);
        }
        Ok(records)
    }

    /// 레코드 스트림으로 변환
    pub fn into_stream(self) -> impl Stream<Item = DriverResult<Record>> + Send {
        stream::try_unfold(self, |mut result| async move {
            Ok(result.next().await?.map(|record| (record, result)))
        })
    }

    /// 결과 닫기
    pub async fn close(self) -> DriverResult<()> {
        self.stream.close().await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use futures::TryStreamExt;

    use super::*;
    use crate::bolt::{BoltVersion, SuccessMessage};
    use crate::driver::connection::Connection;
    use crate::driver::mock::MockConnection;

    fn run_metadata() -> Metadata {
        SuccessMessage::new()
            .with("fields", vec!["x"])
            .with("t_first", 4i64)
    }

    fn create_terminal() -> Metadata {
        let mut stats = HashMap::new();
        stats.insert("nodes-created".to_string(), Value::Integer(1));
        stats.insert("properties-set".to_string(), Value::Integer(1));
        stats.insert("labels-added".to_string(), Value::Integer(1));

        let mut notification = HashMap::new();
        notification.insert("code".to_string(), Value::from("Neo.ClientNotification.Statement.CartesianProduct"));
        notification.insert("severity".to_string(), Value::from("WARNING"));

        SuccessMessage::new()
            .with("stats", stats)
            .with("type", "rw")
            .with("t_last", 9i64)
            .with("bookmark", "FB:kcwQ")
            .with("db", "neo4j")
            .with("notifications", vec![Value::Map(notification)])
    }

    async fn create_result() -> (Arc<MockConnection>, SummarizedResult) {
        let conn = Arc::new(
            MockConnection::new(BoltVersion::V4_4)
                .with_page(&[1, 2], true)
                .with_rows(vec![vec![Value::Integer(3)]], create_terminal()),
        );
        let stream = ResultStream::new(conn.clone(), 2, -1).await.unwrap();
        (conn, SummarizedResult::new(stream, run_metadata()))
    }

    #[test]
    fn test_counters_from_stats() {
        let terminal = create_terminal();
        let counters = Counters::from_stats(terminal.stats().unwrap());

        assert_eq!(counters.nodes_created, 1);
        assert_eq!(counters.properties_set, 1);
        assert_eq!(counters.labels_added, 1);
        assert!(counters.contains_updates());
        assert!(!counters.contains_system_updates());
    }

    #[test]
    fn test_counters_prefer_server_flags() {
        let mut stats = HashMap::new();
        stats.insert("contains-updates".to_string(), Value::Boolean(false));
        stats.insert("system-updates".to_string(), Value::Integer(2));
        let counters = Counters::from_stats(&stats);

        assert!(!counters.contains_updates());
        assert!(counters.contains_system_updates());
        assert!(!Counters::default().contains_updates());
    }

    #[test]
    fn test_query_type_codes() {
        assert_eq!(QueryType::from_code("r"), Some(QueryType::ReadOnly));
        assert_eq!(QueryType::from_code("s"), Some(QueryType::SchemaWrite));
        assert_eq!(QueryType::from_code("?"), None);
    }

    #[tokio::test]
    async fn test_summary_keeps_records_iterable() {
        let (conn, mut result) = create_result().await;
        assert_eq!(result.keys(), &["x"]);

        let first = result.next().await.unwrap().unwrap();
        assert_eq!(first.get_int("x").unwrap(), 1);

        let summary = result.summary().await.unwrap();
        assert_eq!(summary.query_type, QueryType::ReadWrite);
        assert_eq!(summary.bookmark.as_deref(), Some("FB:kcwQ"));
        assert_eq!(summary.database.as_deref(), Some("neo4j"));
        assert_eq!(summary.result_available_after, Some(Duration::from_millis(4)));
        assert_eq!(summary.result_consumed_after, Some(Duration::from_millis(9)));
        assert_eq!(summary.counters.nodes_created, 1);
        assert_eq!(summary.notifications.len(), 1);
        assert_eq!(summary.notifications[0].severity, "WARNING");
        assert_eq!(conn.owner_count(), 0);

        let rest = result.collect().await.unwrap();
        let values: Vec<i64> = rest.iter().map(|r| r.get_int("x").unwrap()).collect();
        assert_eq!(values, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_into_stream_yields_records() {
        let (_conn, result) = create_result().await;
        let records: Vec<Record> = result.into_stream().try_collect().await.unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[2].keys(), &["x"]);
    }

    #[tokio::test]
    async fn test_summary_json_excludes_records() {
        let (_conn, mut result) = create_result().await;
        let summary = result.summary().await.unwrap();
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["query_type"], "read_write");
        assert_eq!(json["counters"]["labels_added"], 1);
        assert!(json.get("records").is_none());

        let back: ResultSummary = serde_json::from_value(json).unwrap();
        assert_eq!(back, summary);
    }

    #[tokio::test]
    async fn test_close_discards_unread() {
        let (conn, mut result) = create_result().await;
        result.next().await.unwrap();
        result.close().await.unwrap();

        assert_eq!(conn.discards(), vec![-1]);
        assert_eq!(conn.owner_count(), 0);
    }
}
