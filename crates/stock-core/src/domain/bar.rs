//! 데이터 제공자에서 받은 시세 레코드.
//!
//! 날짜는 제공자가 보낸 `YYYYMMDD` 문자열 그대로 보관합니다.
//! 저장 계층에서 날짜를 파싱하며, 파싱에 실패한 레코드는 저장하지 않습니다.
//! 누락되거나 형식이 다른 숫자 필드는 0으로 채워집니다.

use serde::{Deserialize, Serialize};

/// 일봉 데이터 (미수정 주가).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    /// 종목 코드 (예: "000001.SZ")
    pub ts_code: String,
    /// 거래일 (YYYYMMDD)
    pub trade_date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// 전일 종가
    pub pre_close: f64,
    /// 전일 대비
    pub change: f64,
    /// 등락률 (%)
    pub pct_chg: f64,
    /// 거래량 (수)
    pub vol: f64,
    /// 거래대금 (천 위안)
    pub amount: f64,
}

/// 주봉/월봉 데이터 (미수정, 전방 수정, 후방 수정 주가).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdjustedBar {
    pub ts_code: String,
    /// 거래일 (주/월의 마지막 거래일, YYYYMMDD)
    pub trade_date: String,
    /// 집계 기준 종료일 (YYYYMMDD)
    pub end_date: String,

    // 미수정 주가
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub pre_close: f64,

    // 전방 수정 주가 (qfq)
    pub open_qfq: f64,
    pub high_qfq: f64,
    pub low_qfq: f64,
    pub close_qfq: f64,

    // 후방 수정 주가 (hfq)
    pub open_hfq: f64,
    pub high_hfq: f64,
    pub low_hfq: f64,
    pub close_hfq: f64,

    pub vol: f64,
    pub amount: f64,

    pub change: f64,
    pub pct_chg: f64,
}
