//! 거래일 목록 변환 함수.
//!
//! 모든 함수는 순수 함수이며 에러를 반환하지 않습니다. 범위가 비었거나
//! 뒤집힌 경우(`start > end`) 빈 목록을 반환합니다.

use chrono::{Datelike, Duration, Months, NaiveDate, Weekday};
use std::collections::BTreeMap;

use stock_core::is_weekend;

/// `[start, end]` 안의 날짜만 오름차순, 중복 없이 남깁니다.
pub fn daily_trading_days(days: &[NaiveDate], start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut out: Vec<NaiveDate> = days
        .iter()
        .copied()
        .filter(|d| *d >= start && *d <= end)
        .collect();
    out.sort_unstable();
    out.dedup();
    out
}

/// ISO 주(연도, 주차)별 마지막 거래일.
pub fn weekly_last_trading_days(days: &[NaiveDate]) -> Vec<NaiveDate> {
    let mut sorted = days.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut out: Vec<NaiveDate> = Vec::new();
    let mut current_week = None;
    for day in sorted {
        let week = day.iso_week();
        let key = (week.year(), week.week());
        if current_week == Some(key) {
            // 같은 주의 더 늦은 날짜로 교체
            if let Some(last) = out.last_mut() {
                *last = day;
            }
        } else {
            current_week = Some(key);
            out.push(day);
        }
    }
    out
}

/// `[start, end]`와 겹치는 달력 월별 마지막 거래일.
///
/// 범위 안에 거래일이 없는 달은 건너뜁니다.
pub fn monthly_last_trading_days(
    days: &[NaiveDate],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<NaiveDate> {
    let mut by_month: BTreeMap<(i32, u32), NaiveDate> = BTreeMap::new();
    for day in days.iter().filter(|d| **d >= start && **d <= end) {
        by_month
            .entry((day.year(), day.month()))
            .and_modify(|last| {
                if *day > *last {
                    *last = *day;
                }
            })
            .or_insert(*day);
    }
    by_month.into_values().collect()
}

/// 주말을 제외한 `[start, end]`의 모든 날짜 (공휴일은 구분하지 못함).
pub fn fallback_weekdays(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    if start > end {
        return Vec::new();
    }
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| !is_weekend(*d))
        .collect()
}

/// 주말 제외 캘린더의 ISO 주별 마지막 평일.
pub fn fallback_week_ends(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    weekly_last_trading_days(&fallback_weekdays(start, end))
}

/// `[start, end]`와 겹치는 달마다의 월말 근사치.
///
/// 월말(범위를 넘으면 `end`)이 토요일이면 1일, 일요일이면 2일 앞당겨 금요일로
/// 맞추고, `start`보다 앞서게 되면 버립니다.
pub fn fallback_month_ends(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut out = Vec::new();
    if start > end {
        return out;
    }

    let mut month_start = first_of_month(start);
    while let Some(current) = month_start.filter(|m| *m <= end) {
        let next = current.checked_add_months(Months::new(1));
        let month_end = next
            .and_then(|n| n.pred_opt())
            .map_or(end, |last| last.min(end));

        let candidate = match month_end.weekday() {
            Weekday::Sat => month_end - Duration::days(1),
            Weekday::Sun => month_end - Duration::days(2),
            _ => month_end,
        };
        if candidate >= start {
            out.push(candidate);
        }

        month_start = next;
    }
    out
}

fn first_of_month(date: NaiveDate) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
}
