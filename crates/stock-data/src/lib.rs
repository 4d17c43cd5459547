//! 원격 데이터 조회와 저장.
//!
//! 이 crate는 다음을 제공합니다:
//! - Tushare Pro API 클라이언트 (재시도, 컬럼/행 테이블 해석)
//! - 거래일 캘린더 해석 (거래소 캘린더 + 주말 제외 대체 캘린더)
//! - 시세/작업/종목 저장소 (PostgreSQL, 인메모리)
//! - 청크 단위 일괄 저장

pub mod calendar;
pub mod error;
pub mod provider;
pub mod storage;

pub use calendar::{CalendarResolver, CalendarSource, ResolvedDates};
pub use error::{DataError, Result};
pub use provider::{DataProvider, RemoteTable, Row, TushareClient};
pub use storage::{
    BarStore, BatchPersister, Database, InstrumentStore, MemoryBarStore, MemoryInstrumentStore,
    MemoryTaskStore, PersistOutcome, PgBarStore, PgInstrumentStore, PgTaskStore, TaskStore,
};
