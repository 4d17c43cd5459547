//! 시세 데이터 수집 엔진.
//!
//! 이 crate는 수집 작업 실행을 담당합니다:
//! - 일봉/주봉/월봉 기간 수집 (`FetchEngine::start_fetch`)
//! - 종목별 일봉 수집 (`FetchEngine::start_instrument_fetch`)
//! - 종목 기본 정보 동기화 (`FetchEngine::fetch_stock_basic`)
//! - 작업 진행 상황 조회
//!
//! 동시 실행은 진입 게이트, 원격 호출 빈도는 작업별 속도 제한기로 제한합니다.

pub mod engine;
pub mod error;
pub mod stats;

pub use engine::{EngineSettings, FetchEngine, FetchJob};
pub use error::{CollectorError, Result};
pub use stats::CollectionStats;
