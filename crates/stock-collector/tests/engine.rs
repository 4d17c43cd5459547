//! 스텁 제공자와 인메모리 저장소를 사용한 FetchEngine 시나리오 테스트.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use stock_collector::{CollectorError, EngineSettings, FetchEngine, FetchJob};
use stock_core::{
    format_yyyymmdd, is_weekend, parse_yyyymmdd, AdjustedBar, DailyBar, FetchTask, Frequency,
    Instrument, TaskStatus, TradingCalendarEntry,
};
use stock_data::{
    DataError, DataProvider, MemoryBarStore, MemoryInstrumentStore, MemoryTaskStore, Result,
};

const CODES: [&str; 2] = ["000001.SZ", "600000.SH"];

#[derive(Default)]
struct StubProvider {
    /// 휴장으로 표시할 날짜 (YYYYMMDD)
    closed: HashSet<String>,
    /// 에러를 돌려줄 거래일
    failing: HashSet<String>,
    /// 날짜를 해석할 수 없는 행을 하나 섞어 보낼 거래일
    malformed: HashSet<String>,
    fail_all: bool,
    delay_ms: u64,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    requested_codes: Mutex<Vec<Option<String>>>,
}

impl StubProvider {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self, trade_date: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_all || self.failing.contains(trade_date) {
            return Err(DataError::ApiError {
                code: 40203,
                msg: format!("no data for {trade_date}"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DataProvider for StubProvider {
    async fn trade_calendar(
        &self,
        exchange: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<TradingCalendarEntry>> {
        let start = parse_yyyymmdd(start_date)?;
        let end = parse_yyyymmdd(end_date)?;
        let mut entries = Vec::new();
        let mut day = start;
        while day <= end {
            let cal_date = format_yyyymmdd(day);
            entries.push(TradingCalendarEntry {
                exchange: exchange.to_string(),
                is_open: !is_weekend(day) && !self.closed.contains(&cal_date),
                cal_date,
                pretrade_date: String::new(),
            });
            day += Duration::days(1);
        }
        Ok(entries)
    }

    async fn daily(&self, trade_date: &str, ts_code: Option<&str>) -> Result<Vec<DailyBar>> {
        self.requested_codes
            .lock()
            .unwrap()
            .push(ts_code.map(str::to_string));
        self.enter(trade_date).await?;

        let codes: Vec<&str> = match ts_code {
            Some(code) => vec![code],
            None => CODES.to_vec(),
        };
        let mut bars: Vec<DailyBar> = codes
            .into_iter()
            .map(|code| DailyBar {
                ts_code: code.to_string(),
                trade_date: trade_date.to_string(),
                open: 10.0,
                close: 10.5,
                ..Default::default()
            })
            .collect();
        if self.malformed.contains(trade_date) {
            bars.push(DailyBar {
                ts_code: "000002.SZ".to_string(),
                trade_date: String::new(),
                ..Default::default()
            });
        }
        Ok(bars)
    }

    async fn adjusted_bars(
        &self,
        frequency: Frequency,
        trade_date: &str,
    ) -> Result<Vec<AdjustedBar>> {
        if frequency == Frequency::Daily {
            return Err(DataError::InvalidData("daily has no adjusted bars".to_string()));
        }
        self.enter(trade_date).await?;
        Ok(CODES
            .iter()
            .map(|code| AdjustedBar {
                ts_code: code.to_string(),
                trade_date: trade_date.to_string(),
                end_date: trade_date.to_string(),
                close: 11.0,
                close_qfq: 10.8,
                close_hfq: 120.4,
                ..Default::default()
            })
            .collect())
    }

    async fn stock_basic(&self) -> Result<Vec<Instrument>> {
        Ok(["000001.SZ", "000002.SZ", "600000.SH"]
            .iter()
            .map(|code| listed(code))
            .collect())
    }
}

fn listed(code: &str) -> Instrument {
    Instrument {
        ts_code: code.to_string(),
        list_status: "L".to_string(),
        ..Default::default()
    }
}

struct Harness {
    engine: FetchEngine,
    provider: Arc<StubProvider>,
    bars: Arc<MemoryBarStore>,
    tasks: Arc<MemoryTaskStore>,
}

fn settings(concurrency: usize) -> EngineSettings {
    EngineSettings {
        concurrency,
        batch_size: 1000,
        // 1ms 간격
        rate_limit: 60_000,
    }
}

async fn harness_with(
    provider: StubProvider,
    instruments: MemoryInstrumentStore,
    concurrency: usize,
) -> Harness {
    let provider = Arc::new(provider);
    let bars = Arc::new(MemoryBarStore::new());
    let tasks = Arc::new(MemoryTaskStore::new());
    let engine = FetchEngine::new(
        provider.clone(),
        bars.clone(),
        tasks.clone(),
        Arc::new(instruments),
        settings(concurrency),
    );
    Harness {
        engine,
        provider,
        bars,
        tasks,
    }
}

async fn harness(provider: StubProvider, concurrency: usize) -> Harness {
    harness_with(provider, MemoryInstrumentStore::new(), concurrency).await
}

async fn finish(h: &Harness, job: FetchJob) -> FetchTask {
    let task_id = job.task_id.clone();
    job.wait().await;
    h.engine.get_progress(&task_id).await.unwrap()
}

fn dates(list: &[&str]) -> HashSet<String> {
    list.iter().map(|d| d.to_string()).collect()
}

/// 2023년 12월 평일 수
const DEC_2023_WEEKDAYS: i32 = 21;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_daily_fetch_counts_every_unit_under_concurrency() {
    let provider = StubProvider {
        failing: dates(&["20231205", "20231213", "20231227"]),
        delay_ms: 5,
        ..Default::default()
    };
    let h = harness(provider, 4).await;

    let job = h
        .engine
        .spawn_fetch(Frequency::Daily, "20231201", "20231231", None)
        .await
        .unwrap();
    assert!(job.task_id.starts_with("daily_task_"));
    let task = finish(&h, job).await;

    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.total_count, DEC_2023_WEEKDAYS);
    assert_eq!(task.success_count, DEC_2023_WEEKDAYS - 3);
    assert_eq!(task.failed_count, 3);
    assert_eq!(task.completed_count(), DEC_2023_WEEKDAYS);
    assert_eq!(task.progress, 100);
    assert_eq!(task.error_msg.as_deref(), Some("3 of 21 units failed"));
    assert!(task.end_time.is_some());

    assert_eq!(h.provider.calls(), DEC_2023_WEEKDAYS as usize);
    assert!(h.provider.max_in_flight.load(Ordering::SeqCst) <= 4);
    assert_eq!(h.bars.daily_len().await, (DEC_2023_WEEKDAYS as usize - 3) * 2);
    assert!(h.tasks.progress_writes() >= 1);
}

#[tokio::test]
async fn test_closed_single_day_completes_immediately() {
    let provider = StubProvider {
        closed: dates(&["20231201"]),
        ..Default::default()
    };
    let h = harness(provider, 2).await;

    let job = h
        .engine
        .spawn_fetch(Frequency::Daily, "20231201", "20231201", None)
        .await
        .unwrap();
    let task = finish(&h, job).await;

    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.total_count, 0);
    assert_eq!(task.progress, 100);
    assert_eq!(task.error_msg, None);
    assert_eq!(h.provider.calls(), 0);
}

#[tokio::test]
async fn test_every_unit_failing_marks_task_failed() {
    let provider = StubProvider {
        fail_all: true,
        ..Default::default()
    };
    let h = harness(provider, 3).await;

    let job = h
        .engine
        .spawn_fetch(Frequency::Daily, "20231204", "20231208", Some(2))
        .await
        .unwrap();
    let task = finish(&h, job).await;

    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.total_count, 5);
    assert_eq!(task.failed_count, 5);
    assert_eq!(task.progress, 100);
    assert_eq!(task.error_msg.as_deref(), Some("5 of 5 units failed"));
    assert_eq!(h.bars.daily_len().await, 0);
}

#[tokio::test]
async fn test_insert_failure_counts_as_unit_failure() {
    let h = harness(StubProvider::default(), 2).await;
    h.bars.fail_inserts(true);

    let job = h
        .engine
        .spawn_fetch(Frequency::Daily, "20231204", "20231205", None)
        .await
        .unwrap();
    let task = finish(&h, job).await;

    assert_eq!(task.failed_count, 2);
    assert_eq!(task.status, TaskStatus::Failed);
}

#[tokio::test]
async fn test_cancellation_stops_admission() {
    let provider = StubProvider {
        delay_ms: 50,
        ..Default::default()
    };
    let h = harness(provider, 1).await;

    let job = h
        .engine
        .spawn_fetch(Frequency::Daily, "20231201", "20231231", None)
        .await
        .unwrap();
    assert!(h.engine.cancel(&job.task_id).await);
    let task = finish(&h, job).await;

    assert_eq!(task.status, TaskStatus::Failed);
    assert!(task.completed_count() < DEC_2023_WEEKDAYS);
    let msg = task.error_msg.unwrap();
    assert!(msg.starts_with("cancelled: "), "{msg}");
    assert!(task.end_time.is_some());
}

#[tokio::test]
async fn test_task_store_failure_is_returned_synchronously() {
    let h = harness(StubProvider::default(), 2).await;
    h.tasks.fail_create(true);

    let result = h
        .engine
        .start_fetch(Frequency::Daily, "20231201", "20231231", None)
        .await;

    assert!(matches!(result, Err(CollectorError::JobSetup(_))));
    tokio::task::yield_now().await;
    assert_eq!(h.provider.calls(), 0);
    assert!(h.engine.list_tasks(1, 10).await.unwrap().list.is_empty());
}

#[tokio::test]
async fn test_invalid_range_is_rejected() {
    let h = harness(StubProvider::default(), 2).await;

    let inverted = h
        .engine
        .start_fetch(Frequency::Weekly, "20231231", "20231201", None)
        .await;
    assert!(matches!(inverted, Err(CollectorError::InvalidRequest(_))));

    let malformed = h
        .engine
        .start_fetch(Frequency::Daily, "2023-12-01", "20231231", None)
        .await;
    assert!(matches!(malformed, Err(CollectorError::InvalidRequest(_))));
}

#[tokio::test]
async fn test_weekly_fetch_uses_last_trading_day_per_week() {
    let provider = StubProvider {
        // 금요일 휴장 → 그 주는 목요일
        closed: dates(&["20231215"]),
        ..Default::default()
    };
    let h = harness(provider, 2).await;

    let job = h
        .engine
        .spawn_fetch(Frequency::Weekly, "20231201", "20231231", None)
        .await
        .unwrap();
    assert!(job.task_id.starts_with("weekly_task_"));
    let task = finish(&h, job).await;

    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.total_count, 5);

    let trade_dates: HashSet<NaiveDate> = h
        .bars
        .adjusted(Frequency::Weekly)
        .await
        .iter()
        .map(|r| r.trade_date)
        .collect();
    let expected: HashSet<NaiveDate> = ["20231201", "20231208", "20231214", "20231222", "20231229"]
        .iter()
        .map(|d| parse_yyyymmdd(d).unwrap())
        .collect();
    assert_eq!(trade_dates, expected);
}

#[tokio::test]
async fn test_monthly_fetch_spans_year_boundary() {
    let h = harness(StubProvider::default(), 2).await;

    let job = h
        .engine
        .spawn_fetch(Frequency::Monthly, "20231115", "20240110", None)
        .await
        .unwrap();
    let task = finish(&h, job).await;

    assert_eq!(task.total_count, 3);
    assert_eq!(task.success_count, 3);
    assert_eq!(h.bars.adjusted(Frequency::Monthly).await.len(), 6);
}

#[tokio::test]
async fn test_dropped_records_are_noted() {
    let provider = StubProvider {
        malformed: dates(&["20231204"]),
        ..Default::default()
    };
    let h = harness(provider, 2).await;

    let job = h
        .engine
        .spawn_fetch(Frequency::Daily, "20231204", "20231205", None)
        .await
        .unwrap();
    let task = finish(&h, job).await;

    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.success_count, 2);
    assert_eq!(
        task.error_msg.as_deref(),
        Some("1 records dropped (unparseable date)")
    );
    assert_eq!(h.bars.daily_len().await, 4);
}

#[tokio::test]
async fn test_instrument_fetch_runs_one_unit_per_listed_instrument_and_day() {
    let mut delisted = listed("000003.SZ");
    delisted.list_status = "D".to_string();
    let instruments = MemoryInstrumentStore::with_instruments(&[
        listed("000001.SZ"),
        listed("000002.SZ"),
        listed("600000.SH"),
        delisted,
    ])
    .await;
    let h = harness_with(StubProvider::default(), instruments, 3).await;

    let job = h
        .engine
        .start_instrument_fetch("20231204", "20231205", None)
        .await
        .unwrap();
    assert!(job.task_id.starts_with("daily_stock_task_"));
    let task = finish(&h, job).await;

    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.total_count, 6);
    assert_eq!(task.success_count, 6);
    assert_eq!(h.bars.daily_len().await, 6);

    let codes = h.provider.requested_codes.lock().unwrap().clone();
    assert_eq!(codes.len(), 6);
    assert!(codes.iter().all(|c| c.is_some()));
    assert!(!codes.contains(&Some("000003.SZ".to_string())));
}

#[tokio::test]
async fn test_stock_basic_sync_reports_saved_count() {
    let instruments = Arc::new(MemoryInstrumentStore::new());
    let provider = Arc::new(StubProvider::default());
    let engine = FetchEngine::new(
        provider,
        Arc::new(MemoryBarStore::new()),
        Arc::new(MemoryTaskStore::new()),
        instruments.clone(),
        settings(2),
    );

    assert_eq!(engine.fetch_stock_basic().await.unwrap(), 3);
    use stock_data::InstrumentStore;
    assert_eq!(instruments.list_listed().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_unknown_task_is_not_found() {
    let h = harness(StubProvider::default(), 2).await;
    let result = h.engine.get_progress("daily_task_0_deadbeef").await;
    assert!(matches!(result, Err(CollectorError::TaskNotFound(_))));
}

#[tokio::test]
async fn test_list_tasks_returns_newest_first() {
    let h = harness(StubProvider::default(), 2).await;

    let first = h
        .engine
        .spawn_fetch(Frequency::Daily, "20231204", "20231204", None)
        .await
        .unwrap();
    let first_id = first.task_id.clone();
    first.wait().await;
    let second = h
        .engine
        .spawn_fetch(Frequency::Monthly, "20231201", "20231231", None)
        .await
        .unwrap();
    let second_id = second.task_id.clone();
    second.wait().await;

    let page = h.engine.list_tasks(0, 500).await.unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.page, 1);
    assert_eq!(page.page_size, 100);
    let ids: Vec<&str> = page.list.iter().map(|t| t.task_id.as_str()).collect();
    assert_eq!(ids, vec![second_id.as_str(), first_id.as_str()]);
}

#[tokio::test]
async fn test_refetch_does_not_duplicate_rows() {
    let h = harness(StubProvider::default(), 2).await;

    for _ in 0..2 {
        let job = h
            .engine
            .spawn_fetch(Frequency::Daily, "20231204", "20231205", None)
            .await
            .unwrap();
        let task = finish(&h, job).await;
        assert_eq!(task.status, TaskStatus::Completed);
    }
    assert_eq!(h.bars.daily_len().await, 4);
}
