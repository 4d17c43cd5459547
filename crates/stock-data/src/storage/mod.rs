//! 저장소 계층.
//!
//! 수집 엔진은 트레이트에만 의존합니다.
//! - `postgres`: 운영용 PostgreSQL 구현
//! - `memory`: 테스트/로컬 실행용 인메모리 구현
//! - `batch`: 제공자 레코드를 청크 단위로 저장하는 `BatchPersister`

pub mod batch;
pub mod memory;
pub mod postgres;
pub mod records;

use async_trait::async_trait;
use stock_core::{FetchTask, Frequency, Instrument, ProgressSnapshot, TaskPage, TaskStatus};

use crate::error::Result;

pub use batch::{BatchPersister, PersistOutcome, DEFAULT_BATCH_SIZE};
pub use memory::{MemoryBarStore, MemoryInstrumentStore, MemoryTaskStore};
pub use postgres::{Database, PgBarStore, PgInstrumentStore, PgTaskStore};
pub use records::{AdjustedRecord, DailyPage, DailyQuery, DailyRecord};

/// 시세 저장소.
///
/// 삽입은 `(ts_code, trade_date)`가 이미 있으면 건너뛰며 기존 행을 바꾸지 않습니다.
#[async_trait]
pub trait BarStore: Send + Sync {
    /// 일봉 청크 삽입. 새로 삽입된 행 수를 반환합니다.
    async fn insert_daily(&self, records: &[DailyRecord]) -> Result<u64>;

    /// 주봉/월봉 청크 삽입.
    async fn insert_adjusted(&self, frequency: Frequency, records: &[AdjustedRecord])
        -> Result<u64>;

    /// 일봉 조회 (거래일 내림차순).
    async fn query_daily(&self, query: &DailyQuery) -> Result<DailyPage>;
}

/// 수집 작업 저장소.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create(&self, task: &FetchTask) -> Result<()>;

    /// `running`으로 전환하고 계획된 작업 단위 수를 기록합니다.
    async fn mark_running(&self, task_id: &str, total: i32) -> Result<()>;

    /// 진행률과 카운터를 한 번에 덮어씁니다.
    async fn update_progress(&self, task_id: &str, snapshot: ProgressSnapshot) -> Result<()>;

    /// 종료 상태 기록. `end_time`은 처음 한 번만 설정됩니다.
    async fn finalize(
        &self,
        task_id: &str,
        status: TaskStatus,
        snapshot: ProgressSnapshot,
        error_msg: Option<String>,
    ) -> Result<()>;

    /// 작업 조회. 없으면 `DataError::NotFound`.
    async fn get(&self, task_id: &str) -> Result<FetchTask>;

    /// 최근 생성 순 목록.
    async fn list(&self, page: u32, page_size: u32) -> Result<TaskPage>;
}

/// 종목 기본 정보 저장소.
#[async_trait]
pub trait InstrumentStore: Send + Sync {
    /// `ts_code` 기준 upsert.
    async fn upsert(&self, instruments: &[Instrument]) -> Result<u64>;

    /// 상장 상태(`L`) 종목 목록 (`ts_code` 오름차순).
    async fn list_listed(&self) -> Result<Vec<Instrument>>;
}
