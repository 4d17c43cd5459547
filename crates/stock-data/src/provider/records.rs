//! 테이블 행을 도메인 레코드로 변환.

use stock_core::{AdjustedBar, DailyBar, Instrument, TradingCalendarEntry};

use super::table::{RemoteTable, Row};

pub fn decode_daily(table: &RemoteTable) -> Vec<DailyBar> {
    table
        .rows()
        .map(|row| DailyBar {
            ts_code: row.get_str("ts_code"),
            trade_date: row.get_str("trade_date"),
            open: row.get_f64("open"),
            high: row.get_f64("high"),
            low: row.get_f64("low"),
            close: row.get_f64("close"),
            pre_close: row.get_f64("pre_close"),
            change: row.get_f64("change"),
            pct_chg: row.get_f64("pct_chg"),
            vol: row.get_f64("vol"),
            amount: row.get_f64("amount"),
        })
        .collect()
}

/// 주봉/월봉 (`stk_week_month_adj`) 행. 두 주기의 컬럼 구성은 같습니다.
pub fn decode_adjusted(table: &RemoteTable) -> Vec<AdjustedBar> {
    table.rows().map(|row| adjusted_from_row(&row)).collect()
}

fn adjusted_from_row(row: &Row<'_>) -> AdjustedBar {
    AdjustedBar {
        ts_code: row.get_str("ts_code"),
        trade_date: row.get_str("trade_date"),
        end_date: row.get_str("end_date"),
        open: row.get_f64("open"),
        high: row.get_f64("high"),
        low: row.get_f64("low"),
        close: row.get_f64("close"),
        pre_close: row.get_f64("pre_close"),
        open_qfq: row.get_f64("open_qfq"),
        high_qfq: row.get_f64("high_qfq"),
        low_qfq: row.get_f64("low_qfq"),
        close_qfq: row.get_f64("close_qfq"),
        open_hfq: row.get_f64("open_hfq"),
        high_hfq: row.get_f64("high_hfq"),
        low_hfq: row.get_f64("low_hfq"),
        close_hfq: row.get_f64("close_hfq"),
        vol: row.get_f64("vol"),
        amount: row.get_f64("amount"),
        change: row.get_f64("change"),
        pct_chg: row.get_f64("pct_chg"),
    }
}

pub fn decode_calendar(table: &RemoteTable) -> Vec<TradingCalendarEntry> {
    table
        .rows()
        .map(|row| TradingCalendarEntry {
            exchange: row.get_str("exchange"),
            cal_date: row.get_str("cal_date"),
            // 숫자 1 또는 문자열 "1"
            is_open: row.get_i64("is_open") == 1 || row.get_str("is_open") == "1",
            pretrade_date: row.get_str("pretrade_date"),
        })
        .collect()
}

pub fn decode_instruments(table: &RemoteTable) -> Vec<Instrument> {
    table
        .rows()
        .map(|row| Instrument {
            ts_code: row.get_str("ts_code"),
            symbol: row.get_str("symbol"),
            name: row.get_str("name"),
            area: row.get_str("area"),
            industry: row.get_str("industry"),
            market: row.get_str("market"),
            list_date: row.get_str("list_date"),
            list_status: row.get_str("list_status"),
        })
        .collect()
}
