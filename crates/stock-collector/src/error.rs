//! 에러 타입 정의.

use stock_core::CoreError;
use stock_data::DataError;
use thiserror::Error;

/// Collector 에러 타입
#[derive(Debug, Error)]
pub enum CollectorError {
    /// 저장소/데이터 소스 에러
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// 설정 에러
    #[error("Configuration error: {0}")]
    Config(#[from] CoreError),

    /// 잘못된 요청 (날짜 형식, 범위)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// 작업 생성 실패. 작업 단위는 하나도 실행되지 않음
    #[error("Job setup failed: {0}")]
    JobSetup(String),

    /// 작업을 찾을 수 없음
    #[error("Task not found: {0}")]
    TaskNotFound(String),
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;
