//! Driver Configuration
//!
//! 드라이버 전역 설정 스냅샷

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use moka::Expiry;
use once_cell::sync::{Lazy, OnceCell};
use tokio::sync::Semaphore;

use super::tls::SslConfiguration;
use super::types::Value;

/// 기본 User Agent
pub const DEFAULT_USER_AGENT: &str = concat!("bolt-driver-core/", env!("CARGO_PKG_VERSION"));

/// 기본 연결 풀 최대 크기
pub const DEFAULT_POOL_SIZE: usize = 0x2F;

/// 기본 연결 획득 타임아웃
pub const DEFAULT_ACQUIRE_CONNECTION_TIMEOUT: Duration = Duration::from_secs(2);

// ============================================================================
// Cache - 공유 캐시
// ============================================================================

/// 드라이버가 공유하는 키-값 캐시
pub trait Cache: Send + Sync + fmt::Debug {
    /// 값 조회 (만료된 항목은 없는 것으로 취급)
    fn get(&self, key: &str) -> Option<Value>;

    /// 값 저장. `ttl`이 `None`이면 만료되지 않습니다.
    fn set(&self, key: &str, value: Value, ttl: Option<Duration>);

    /// 항목 삭제. 삭제된 항목이 있었는지 반환합니다.
    fn delete(&self, key: &str) -> bool;

    /// 전체 삭제
    fn clear(&self);
}

/// 프로세스 메모리 캐시
///
/// 항목마다 다른 TTL을 가질 수 있습니다.
pub struct MemoryCache {
    entries: moka::sync::Cache<String, CacheEntry>,
}

#[derive(Clone)]
struct CacheEntry {
    value: Value,
    ttl: Option<Duration>,
}

/// 항목별 TTL 만료 정책
struct EntryTtl;

impl Expiry<String, CacheEntry> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        entry.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        entry.ttl
    }
}

static SHARED_CACHE: Lazy<Arc<MemoryCache>> = Lazy::new(|| Arc::new(MemoryCache::new()));

impl MemoryCache {
    /// 새 캐시 생성
    pub fn new() -> Self {
        Self {
            entries: moka::sync::Cache::builder().expire_after(EntryTtl).build(),
        }
    }

    /// 프로세스 전역 인스턴스
    pub fn shared() -> Arc<MemoryCache> {
        Arc::clone(&SHARED_CACHE)
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|entry| entry.value)
    }

    fn set(&self, key: &str, value: Value, ttl: Option<Duration>) {
        self.entries.insert(key.to_string(), CacheEntry { value, ttl });
    }

    fn delete(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    fn clear(&self) {
        self.entries.invalidate_all();
    }
}

// ============================================================================
// SemaphoreFactory - 이름별 세마포어
// ============================================================================

/// 이름별로 공유되는 세마포어 생성기
///
/// 같은 이름에는 같은 세마포어를 돌려주어, 여러 드라이버 인스턴스가 하나의
/// 연결 한도를 공유할 수 있게 합니다.
pub trait SemaphoreFactory: Send + Sync + fmt::Debug {
    fn create(&self, key: &str, permits: usize) -> Arc<Semaphore>;
}

/// 프로세스 메모리 세마포어 레지스트리
#[derive(Debug, Default)]
pub struct SharedSemaphoreFactory {
    semaphores: DashMap<String, Arc<Semaphore>>,
}

static SHARED_SEMAPHORES: Lazy<Arc<SharedSemaphoreFactory>> =
    Lazy::new(|| Arc::new(SharedSemaphoreFactory::default()));

impl SharedSemaphoreFactory {
    /// 프로세스 전역 인스턴스
    pub fn shared() -> Arc<SharedSemaphoreFactory> {
        Arc::clone(&SHARED_SEMAPHORES)
    }
}

impl SemaphoreFactory for SharedSemaphoreFactory {
    /// 처음 요청될 때의 `permits`로 생성되며 이후 요청의 값은 무시됩니다.
    fn create(&self, key: &str, permits: usize) -> Arc<Semaphore> {
        self.semaphores
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(permits)))
            .value()
            .clone()
    }
}

// ============================================================================
// Deferred - 지연 해석 값
// ============================================================================

type Factory<T> = Arc<dyn Fn() -> Option<Arc<T>> + Send + Sync>;

enum Source<T: ?Sized> {
    Default,
    Value(Arc<T>),
    Factory(Factory<T>),
}

/// 값 또는 값을 만드는 팩토리
///
/// 팩토리는 처음 조회될 때 한 번만 호출되며 결과가 캐시됩니다. 팩토리가
/// `None`을 반환하면 기본값을 사용합니다.
pub struct Deferred<T: ?Sized> {
    source: Source<T>,
    resolved: OnceCell<Arc<T>>,
}

impl<T: ?Sized> Deferred<T> {
    /// 기본값 사용
    pub fn default_value() -> Self {
        Self::from_source(Source::Default)
    }

    /// 값 지정
    pub fn value(value: Arc<T>) -> Self {
        Self::from_source(Source::Value(value))
    }

    /// 팩토리 지정
    pub fn factory(factory: impl Fn() -> Option<Arc<T>> + Send + Sync + 'static) -> Self {
        Self::from_source(Source::Factory(Arc::new(factory)))
    }

    fn from_source(source: Source<T>) -> Self {
        Self {
            source,
            resolved: OnceCell::new(),
        }
    }

    /// 값 해석
    pub fn resolve(&self, default: impl FnOnce() -> Arc<T>) -> Arc<T> {
        Arc::clone(self.resolved.get_or_init(|| match &self.source {
            Source::Default => default(),
            Source::Value(value) => Arc::clone(value),
            Source::Factory(factory) => factory().unwrap_or_else(default),
        }))
    }

    /// 이미 해석되었는지 확인
    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }
}

impl<T: ?Sized> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        let source = match &self.source {
            Source::Default => Source::Default,
            Source::Value(value) => Source::Value(Arc::clone(value)),
            Source::Factory(factory) => Source::Factory(Arc::clone(factory)),
        };
        Self {
            source,
            resolved: self.resolved.clone(),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match &self.source {
            Source::Default => "default",
            Source::Value(_) => "value",
            Source::Factory(_) => "factory",
        };
        f.debug_struct("Deferred")
            .field("source", &source)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

// ============================================================================
// DriverConfiguration - 드라이버 설정
// ============================================================================

/// 드라이버 설정
///
/// 불변 스냅샷이며 `with_*` 메서드는 수정된 복사본을 반환합니다. 지정하지
/// 않은 항목은 조회 시점에 기본값으로 해석됩니다.
#[derive(Debug, Clone)]
pub struct DriverConfiguration {
    user_agent: Option<String>,
    ssl: SslConfiguration,
    max_pool_size: Option<usize>,
    acquire_connection_timeout: Option<Duration>,
    cache: Deferred<dyn Cache>,
    semaphore_factory: Deferred<dyn SemaphoreFactory>,
}

impl DriverConfiguration {
    /// 모든 항목을 지정하여 생성
    pub fn create(
        user_agent: impl Into<String>,
        ssl: SslConfiguration,
        max_pool_size: usize,
        cache: Arc<dyn Cache>,
        acquire_connection_timeout: Duration,
        semaphore_factory: Arc<dyn SemaphoreFactory>,
    ) -> Self {
        Self {
            user_agent: Some(user_agent.into()),
            ssl,
            max_pool_size: Some(max_pool_size),
            acquire_connection_timeout: Some(acquire_connection_timeout),
            cache: Deferred::value(cache),
            semaphore_factory: Deferred::value(semaphore_factory),
        }
    }

    /// User Agent
    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }

    /// TLS 설정
    pub fn ssl_configuration(&self) -> &SslConfiguration {
        &self.ssl
    }

    /// 연결 풀 최대 크기
    pub fn max_pool_size(&self) -> usize {
        self.max_pool_size.unwrap_or(DEFAULT_POOL_SIZE)
    }

    /// 연결 획득 타임아웃
    pub fn acquire_connection_timeout(&self) -> Duration {
        self.acquire_connection_timeout
            .unwrap_or(DEFAULT_ACQUIRE_CONNECTION_TIMEOUT)
    }

    /// 공유 캐시
    pub fn cache(&self) -> Arc<dyn Cache> {
        self.cache.resolve(|| MemoryCache::shared() as Arc<dyn Cache>)
    }

    /// 세마포어 생성기
    pub fn semaphore_factory(&self) -> Arc<dyn SemaphoreFactory> {
        self.semaphore_factory
            .resolve(|| SharedSemaphoreFactory::shared() as Arc<dyn SemaphoreFactory>)
    }

    /// 연결 풀 한도 세마포어
    ///
    /// 같은 `key`를 쓰는 모든 드라이버가 `max_pool_size` 한도를 공유합니다.
    pub fn pool_semaphore(&self, key: &str) -> Arc<Semaphore> {
        self.semaphore_factory().create(key, self.max_pool_size())
    }

    /// User Agent 변경
    pub fn with_user_agent(&self, user_agent: impl Into<String>) -> Self {
        let mut config = self.clone();
        config.user_agent = Some(user_agent.into());
        config
    }

    /// TLS 설정 변경
    pub fn with_ssl_configuration(&self, ssl: SslConfiguration) -> Self {
        let mut config = self.clone();
        config.ssl = ssl;
        config
    }

    /// 연결 풀 최대 크기 변경 (`None`이면 기본값)
    pub fn with_max_pool_size(&self, max_pool_size: Option<usize>) -> Self {
        let mut config = self.clone();
        config.max_pool_size = max_pool_size;
        config
    }

    /// 연결 획득 타임아웃 변경 (`None`이면 기본값)
    pub fn with_acquire_connection_timeout(&self, timeout: Option<Duration>) -> Self {
        let mut config = self.clone();
        config.acquire_connection_timeout = timeout;
        config
    }

    /// 캐시 변경
    pub fn with_cache(&self, cache: Arc<dyn Cache>) -> Self {
        let mut config = self.clone();
        config.cache = Deferred::value(cache);
        config
    }

    /// 캐시 팩토리 지정
    pub fn with_cache_factory(
        &self,
        factory: impl Fn() -> Option<Arc<dyn Cache>> + Send + Sync + 'static,
    ) -> Self {
        let mut config = self.clone();
        config.cache = Deferred::factory(factory);
        config
    }

    /// 세마포어 생성기 변경
    pub fn with_semaphore_factory(&self, factory: Arc<dyn SemaphoreFactory>) -> Self {
        let mut config = self.clone();
        config.semaphore_factory = Deferred::value(factory);
        config
    }
}

impl Default for DriverConfiguration {
    fn default() -> Self {
        Self {
            user_agent: None,
            ssl: SslConfiguration::default(),
            max_pool_size: None,
            acquire_connection_timeout: None,
            cache: Deferred::default_value(),
            semaphore_factory: Deferred::default_value(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
