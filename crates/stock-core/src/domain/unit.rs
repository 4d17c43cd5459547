//! 작업 단위(한 번의 원격 조회 + 저장) 정의.

use chrono::NaiveDate;
use std::fmt;

use crate::types::format_yyyymmdd;

/// 작업 단위.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FetchUnit {
    /// 날짜 하나의 전종목 데이터
    Date(NaiveDate),
    /// 종목 하나의 특정 날짜 데이터
    InstrumentDate { ts_code: String, date: NaiveDate },
}

impl FetchUnit {
    pub fn date(&self) -> NaiveDate {
        match self {
            FetchUnit::Date(date) => *date,
            FetchUnit::InstrumentDate { date, .. } => *date,
        }
    }

    pub fn ts_code(&self) -> Option<&str> {
        match self {
            FetchUnit::Date(_) => None,
            FetchUnit::InstrumentDate { ts_code, .. } => Some(ts_code),
        }
    }
}

impl fmt::Display for FetchUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchUnit::Date(date) => write!(f, "{}", format_yyyymmdd(*date)),
            FetchUnit::InstrumentDate { ts_code, date } => {
                write!(f, "{}@{}", ts_code, format_yyyymmdd(*date))
            }
        }
    }
}
