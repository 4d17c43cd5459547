//! 저장용 시세 레코드.
//!
//! 제공자 레코드의 `YYYYMMDD` 날짜를 파싱하고 실수 값을 컬럼 정밀도에 맞춘
//! `Decimal`로 변환합니다. 날짜를 파싱할 수 없는 레코드는 만들어지지 않습니다.

use chrono::NaiveDate;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

use stock_core::{parse_yyyymmdd, AdjustedBar, CoreResult, DailyBar};

/// 가격 컬럼 소수 자릿수 (`decimal(10,2)`)
const PRICE_SCALE: u32 = 2;
/// 등락률 컬럼 소수 자릿수 (`decimal(10,4)`)
const PCT_SCALE: u32 = 4;

/// 실수를 지정 자릿수의 `Decimal`로 변환. NaN/무한대는 0.
pub fn to_decimal(value: f64, scale: u32) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default().round_dp(scale)
}

fn price(value: f64) -> Decimal {
    to_decimal(value, PRICE_SCALE)
}

/// `stock_daily` 행.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct DailyRecord {
    pub ts_code: String,
    pub trade_date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub pre_close: Decimal,
    pub change: Decimal,
    pub pct_chg: Decimal,
    pub vol: Decimal,
    pub amount: Decimal,
}

impl DailyRecord {
    pub fn from_bar(bar: &DailyBar) -> CoreResult<Self> {
        Ok(Self {
            ts_code: bar.ts_code.clone(),
            trade_date: parse_yyyymmdd(&bar.trade_date)?,
            open: price(bar.open),
            high: price(bar.high),
            low: price(bar.low),
            close: price(bar.close),
            pre_close: price(bar.pre_close),
            change: price(bar.change),
            pct_chg: to_decimal(bar.pct_chg, PCT_SCALE),
            vol: price(bar.vol),
            amount: price(bar.amount),
        })
    }
}

/// `stock_weekly` / `stock_monthly` 행.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct AdjustedRecord {
    pub ts_code: String,
    pub trade_date: NaiveDate,
    pub end_date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub pre_close: Decimal,
    pub open_qfq: Decimal,
    pub high_qfq: Decimal,
    pub low_qfq: Decimal,
    pub close_qfq: Decimal,
    pub open_hfq: Decimal,
    pub high_hfq: Decimal,
    pub low_hfq: Decimal,
    pub close_hfq: Decimal,
    pub vol: Decimal,
    pub amount: Decimal,
    pub change: Decimal,
    pub pct_chg: Decimal,
}

impl AdjustedRecord {
    /// 거래일과 기준일 중 하나라도 파싱에 실패하면 에러.
    pub fn from_bar(bar: &AdjustedBar) -> CoreResult<Self> {
        Ok(Self {
            ts_code: bar.ts_code.clone(),
            trade_date: parse_yyyymmdd(&bar.trade_date)?,
            end_date: parse_yyyymmdd(&bar.end_date)?,
            open: price(bar.open),
            high: price(bar.high),
            low: price(bar.low),
            close: price(bar.close),
            pre_close: price(bar.pre_close),
            open_qfq: price(bar.open_qfq),
            high_qfq: price(bar.high_qfq),
            low_qfq: price(bar.low_qfq),
            close_qfq: price(bar.close_qfq),
            open_hfq: price(bar.open_hfq),
            high_hfq: price(bar.high_hfq),
            low_hfq: price(bar.low_hfq),
            close_hfq: price(bar.close_hfq),
            vol: price(bar.vol),
            amount: price(bar.amount),
            change: price(bar.change),
            pct_chg: to_decimal(bar.pct_chg, PCT_SCALE),
        })
    }
}

/// 일봉 조회 조건.
#[derive(Debug, Clone, Default)]
pub struct DailyQuery {
    pub ts_code: Option<String>,
    pub trade_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page: u32,
    pub page_size: u32,
}

impl DailyQuery {
    pub fn matches(&self, record: &DailyRecord) -> bool {
        self.ts_code.as_ref().map_or(true, |c| *c == record.ts_code)
            && self.trade_date.map_or(true, |d| d == record.trade_date)
            && self.start_date.map_or(true, |d| record.trade_date >= d)
            && self.end_date.map_or(true, |d| record.trade_date <= d)
    }
}

/// 일봉 조회 결과 페이지.
#[derive(Debug, Clone, Serialize)]
pub struct DailyPage {
    pub list: Vec<DailyRecord>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}
