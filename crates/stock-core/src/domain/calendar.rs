//! 거래소 거래일 캘린더 항목.

use serde::{Deserialize, Serialize};

/// 기본 거래소 (상하이 증권거래소).
pub const DEFAULT_EXCHANGE: &str = "SSE";

/// 거래일 캘린더 항목.
///
/// 요청마다 데이터 제공자에서 조회하며 저장하지 않습니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingCalendarEntry {
    /// 거래소 (SSE, SZSE)
    pub exchange: String,
    /// 날짜 (YYYYMMDD)
    pub cal_date: String,
    /// 개장 여부
    pub is_open: bool,
    /// 직전 거래일 (YYYYMMDD)
    pub pretrade_date: String,
}
