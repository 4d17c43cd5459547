//! `YYYYMMDD` 형식 날짜 유틸리티.
//!
//! 데이터 제공자와 작업 레코드는 날짜를 `YYYYMMDD` 문자열로 주고받습니다.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::error::{CoreError, CoreResult};

/// 데이터 제공자 날짜 형식.
pub const DATE_FORMAT: &str = "%Y%m%d";

/// `YYYYMMDD` 문자열을 날짜로 파싱합니다.
pub fn parse_yyyymmdd(s: &str) -> CoreResult<NaiveDate> {
    let trimmed = s.trim();
    if trimmed.len() != 8 {
        return Err(CoreError::InvalidDate(s.to_string()));
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT).map_err(|_| CoreError::InvalidDate(s.to_string()))
}

/// 날짜를 `YYYYMMDD` 문자열로 변환합니다.
pub fn format_yyyymmdd(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// 토요일/일요일 여부.
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yyyymmdd() {
        let date = parse_yyyymmdd("20231201").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2023, 12, 1).unwrap());
        assert_eq!(format_yyyymmdd(date), "20231201");
    }

    #[test]
    fn test_parse_yyyymmdd_rejects_other_formats() {
        assert!(parse_yyyymmdd("").is_err());
        assert!(parse_yyyymmdd("2023-12-01").is_err());
        assert!(parse_yyyymmdd("20231301").is_err());
        assert!(parse_yyyymmdd("2023121").is_err());
    }

    #[test]
    fn test_is_weekend() {
        // 2023-12-02 토요일, 2023-12-03 일요일, 2023-12-04 월요일
        assert!(is_weekend(NaiveDate::from_ymd_opt(2023, 12, 2).unwrap()));
        assert!(is_weekend(NaiveDate::from_ymd_opt(2023, 12, 3).unwrap()));
        assert!(!is_weekend(NaiveDate::from_ymd_opt(2023, 12, 4).unwrap()));
    }
}
