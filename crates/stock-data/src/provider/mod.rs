//! 데이터 Provider 모듈.
//!
//! ## Tushare
//! - `TushareClient`: 단일 POST 엔드포인트 RPC 클라이언트 (토큰 필요)
//! - 거래일 캘린더, 일봉, 수정주가 주봉/월봉, 종목 기본 정보
//!
//! 수집 엔진은 `DataProvider` 트레이트에만 의존하므로 테스트에서는 스텁으로
//! 대체할 수 있습니다.

pub mod records;
pub mod table;
pub mod tushare;

use async_trait::async_trait;
use stock_core::{AdjustedBar, DailyBar, Frequency, Instrument, TradingCalendarEntry};

use crate::error::Result;

pub use table::{RemoteTable, Row};
pub use tushare::TushareClient;

/// 시세 데이터 제공자.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// 거래소 캘린더 조회 (개장/휴장일 모두 포함).
    async fn trade_calendar(
        &self,
        exchange: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<TradingCalendarEntry>>;

    /// 일봉 조회. `ts_code`가 없으면 해당 거래일의 전종목.
    async fn daily(&self, trade_date: &str, ts_code: Option<&str>) -> Result<Vec<DailyBar>>;

    /// 수정주가 주봉/월봉 조회.
    ///
    /// `Frequency::Daily`는 `DataError::InvalidData`를 반환합니다.
    async fn adjusted_bars(&self, frequency: Frequency, trade_date: &str)
        -> Result<Vec<AdjustedBar>>;

    /// 상장 종목 목록 조회.
    async fn stock_basic(&self) -> Result<Vec<Instrument>>;
}
