//! 거래일 캘린더 해석.
//!
//! 요청 범위를 실제로 조회해야 하는 날짜 목록으로 바꿉니다.
//!
//! - 일봉: 범위 안의 모든 거래일
//! - 주봉: ISO 주별 마지막 거래일
//! - 월봉: 달력 월별 마지막 거래일
//!
//! 거래소 캘린더 호출이 실패하거나 항목이 하나도 없으면 주말만 제외한 근사
//! 캘린더로 대체합니다. 대체 경로는 `calendar_source = "fallback"` 경고 로그로
//! 구분되며 에러를 내지 않습니다.

pub mod partition;

use chrono::NaiveDate;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use stock_core::{format_yyyymmdd, parse_yyyymmdd, Frequency, DEFAULT_EXCHANGE};

use crate::provider::DataProvider;

pub use partition::{
    daily_trading_days, fallback_month_ends, fallback_week_ends, fallback_weekdays,
    monthly_last_trading_days, weekly_last_trading_days,
};

/// 날짜 목록의 출처.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarSource {
    /// 거래소 캘린더
    Exchange,
    /// 주말 제외 근사 캘린더
    Fallback,
}

impl CalendarSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalendarSource::Exchange => "exchange",
            CalendarSource::Fallback => "fallback",
        }
    }
}

impl fmt::Display for CalendarSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 해석된 조회 날짜 목록 (오름차순, 중복 없음).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDates {
    pub dates: Vec<NaiveDate>,
    pub source: CalendarSource,
}

impl ResolvedDates {
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// 거래일 캘린더 해석기.
#[derive(Clone)]
pub struct CalendarResolver {
    provider: Arc<dyn DataProvider>,
    exchange: String,
}

impl CalendarResolver {
    pub fn new(provider: Arc<dyn DataProvider>) -> Self {
        Self {
            provider,
            exchange: DEFAULT_EXCHANGE.to_string(),
        }
    }

    pub fn with_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = exchange.into();
        self
    }

    /// 주기별 조회 날짜를 해석합니다. 실패하지 않습니다.
    pub async fn resolve(
        &self,
        frequency: Frequency,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ResolvedDates {
        let start_str = format_yyyymmdd(start);
        let end_str = format_yyyymmdd(end);

        let entries = match self
            .provider
            .trade_calendar(&self.exchange, &start_str, &end_str)
            .await
        {
            Ok(entries) if !entries.is_empty() => entries,
            Ok(_) => {
                warn!(
                    calendar_source = "fallback",
                    start = %start_str,
                    end = %end_str,
                    "거래일 캘린더가 비어 있음, 주말 제외 캘린더 사용"
                );
                return Self::fallback(frequency, start, end);
            }
            Err(e) => {
                warn!(
                    calendar_source = "fallback",
                    start = %start_str,
                    end = %end_str,
                    error = %e,
                    "거래일 캘린더 조회 실패, 주말 제외 캘린더 사용"
                );
                return Self::fallback(frequency, start, end);
            }
        };

        let open_days: Vec<NaiveDate> = entries
            .iter()
            .filter(|e| e.is_open)
            .filter_map(|e| parse_yyyymmdd(&e.cal_date).ok())
            .collect();
        let trading_days = daily_trading_days(&open_days, start, end);

        let dates = match frequency {
            Frequency::Daily => trading_days,
            Frequency::Weekly => weekly_last_trading_days(&trading_days),
            Frequency::Monthly => monthly_last_trading_days(&trading_days, start, end),
        };

        info!(
            calendar_source = "exchange",
            frequency = %frequency,
            calendar_days = entries.len(),
            dates = dates.len(),
            "조회 날짜 해석 완료"
        );

        ResolvedDates {
            dates,
            source: CalendarSource::Exchange,
        }
    }

    fn fallback(frequency: Frequency, start: NaiveDate, end: NaiveDate) -> ResolvedDates {
        let dates = match frequency {
            Frequency::Daily => fallback_weekdays(start, end),
            Frequency::Weekly => fallback_week_ends(start, end),
            Frequency::Monthly => fallback_month_ends(start, end),
        };
        ResolvedDates {
            dates,
            source: CalendarSource::Fallback,
        }
    }
}
