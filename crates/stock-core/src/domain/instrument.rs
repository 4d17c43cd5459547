//! 종목 기본 정보.

use serde::{Deserialize, Serialize};

/// 상장 상태: 상장
pub const LIST_STATUS_LISTED: &str = "L";

/// 종목 기본 정보 (`stock_basic`).
///
/// 별도의 동기화 경로로 저장되며, 종목별 수집 모드에서 읽기 전용으로 사용됩니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    /// 종목 코드 (예: "000001.SZ")
    pub ts_code: String,
    /// 단축 코드
    pub symbol: String,
    pub name: String,
    /// 지역
    pub area: String,
    /// 업종
    pub industry: String,
    /// 시장 구분
    pub market: String,
    /// 상장일 (YYYYMMDD)
    pub list_date: String,
    /// 상장 상태 (L: 상장, D: 상장폐지, P: 상장중지)
    pub list_status: String,
}

impl Instrument {
    pub fn is_listed(&self) -> bool {
        self.list_status == LIST_STATUS_LISTED
    }
}
