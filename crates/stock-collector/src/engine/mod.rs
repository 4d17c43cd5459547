//! 수집 작업 오케스트레이션.
//!
//! 작업 하나의 흐름:
//! 1. 작업 레코드 생성 (`pending`). 실패하면 호출자에게 즉시 에러 반환
//! 2. 거래일 캘린더 해석 → 작업 단위 목록 확정 → `running`
//! 3. 진입 게이트 + 속도 제한 아래에서 작업 단위 병렬 실행
//! 4. 최종 카운터와 종료 상태 기록

pub mod gate;
pub mod progress;
pub mod rate_limiter;
pub mod runner;

use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use stock_core::{
    fetch_span, format_yyyymmdd, parse_yyyymmdd, FetchTask, FetcherConfig, FetchUnit, Frequency,
    ProgressSnapshot, TaskPage, TaskStatus,
};
use stock_data::storage::{DailyPage, DailyQuery};
use stock_data::{
    BarStore, BatchPersister, CalendarResolver, DataError, DataProvider, InstrumentStore,
    TaskStore,
};

use crate::error::{CollectorError, Result};
use crate::stats::CollectionStats;

pub use gate::AdmissionGate;
pub use progress::{JobCounters, ProgressTracker};
pub use rate_limiter::RateLimiter;
pub use runner::{run_units, terminal_status, RunReport, UnitWorker};

/// 종목별 일봉 수집 모드의 작업 ID 접두어.
pub const INSTRUMENT_TASK_PREFIX: &str = "daily_stock";

/// 엔진 실행 설정.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// 기본 동시 실행 작업 단위 수
    pub concurrency: usize,
    /// 일괄 저장 크기
    pub batch_size: usize,
    /// 분당 최대 원격 호출 수
    pub rate_limit: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&FetcherConfig::default())
    }
}

impl From<&FetcherConfig> for EngineSettings {
    fn from(config: &FetcherConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            batch_size: config.batch_size,
            rate_limit: config.rate_limit,
        }
    }
}

/// 작업 ID 생성: `{prefix}_task_{unix_millis}_{8자리 hex}`.
pub fn new_task_id(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}_task_{}_{}",
        prefix,
        Utc::now().timestamp_millis(),
        &suffix[..8]
    )
}

/// 작업 단위 구성 방식.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitPlan {
    /// 해석된 날짜마다 전종목 1회
    Dates(Frequency),
    /// 상장 종목 × 거래일
    InstrumentDates,
}

impl UnitPlan {
    fn frequency(&self) -> Frequency {
        match self {
            UnitPlan::Dates(frequency) => *frequency,
            UnitPlan::InstrumentDates => Frequency::Daily,
        }
    }

    fn task_prefix(&self) -> &'static str {
        match self {
            UnitPlan::Dates(frequency) => frequency.task_prefix(),
            UnitPlan::InstrumentDates => INSTRUMENT_TASK_PREFIX,
        }
    }
}

/// 시작된 작업 핸들.
///
/// 핸들을 버려도 작업은 계속 실행됩니다.
#[derive(Debug)]
pub struct FetchJob {
    pub task_id: String,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl FetchJob {
    /// 새 작업 단위의 진입을 멈춥니다.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 종료 상태 기록까지 대기.
    pub async fn wait(self) {
        if let Err(e) = self.handle.await {
            error!(task_id = %self.task_id, error = %e, "수집 작업 태스크 비정상 종료");
        }
    }
}

struct EngineInner {
    provider: Arc<dyn DataProvider>,
    resolver: CalendarResolver,
    persister: BatchPersister,
    bars: Arc<dyn BarStore>,
    tasks: Arc<dyn TaskStore>,
    instruments: Arc<dyn InstrumentStore>,
    settings: EngineSettings,
    /// 실행 중인 작업의 취소 토큰
    jobs: Mutex<HashMap<String, CancellationToken>>,
}

/// 수집 엔진.
#[derive(Clone)]
pub struct FetchEngine {
    inner: Arc<EngineInner>,
}

impl FetchEngine {
    pub fn new(
        provider: Arc<dyn DataProvider>,
        bars: Arc<dyn BarStore>,
        tasks: Arc<dyn TaskStore>,
        instruments: Arc<dyn InstrumentStore>,
        settings: EngineSettings,
    ) -> Self {
        let resolver = CalendarResolver::new(provider.clone());
        let persister = BatchPersister::new(bars.clone(), instruments.clone(), settings.batch_size);
        Self {
            inner: Arc::new(EngineInner {
                provider,
                resolver,
                persister,
                bars,
                tasks,
                instruments,
                settings,
                jobs: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn settings(&self) -> EngineSettings {
        self.inner.settings
    }

    /// 기간 수집 작업을 시작하고 작업 ID를 즉시 반환합니다.
    pub async fn start_fetch(
        &self,
        frequency: Frequency,
        start_date: &str,
        end_date: &str,
        concurrency: Option<usize>,
    ) -> Result<String> {
        self.spawn_fetch(frequency, start_date, end_date, concurrency)
            .await
            .map(|job| job.task_id)
    }

    /// `start_fetch`와 같지만 작업 핸들을 반환합니다.
    pub async fn spawn_fetch(
        &self,
        frequency: Frequency,
        start_date: &str,
        end_date: &str,
        concurrency: Option<usize>,
    ) -> Result<FetchJob> {
        self.spawn_job(UnitPlan::Dates(frequency), start_date, end_date, concurrency)
            .await
    }

    /// 종목별 일봉 수집 작업 시작 (상장 종목 × 거래일).
    pub async fn start_instrument_fetch(
        &self,
        start_date: &str,
        end_date: &str,
        concurrency: Option<usize>,
    ) -> Result<FetchJob> {
        self.spawn_job(UnitPlan::InstrumentDates, start_date, end_date, concurrency)
            .await
    }

    /// 실행 중인 작업 취소. 해당 작업이 없으면 `false`.
    pub async fn cancel(&self, task_id: &str) -> bool {
        match self.inner.jobs.lock().await.get(task_id) {
            Some(token) => {
                info!(task_id = %task_id, "작업 취소 요청");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// 상장 종목 기본 정보 동기화. 저장된 종목 수를 반환합니다.
    pub async fn fetch_stock_basic(&self) -> Result<u64> {
        let started = Instant::now();
        let instruments = self.inner.provider.stock_basic().await?;
        let saved = self.inner.persister.persist_instruments(&instruments).await?;

        info!(
            fetched = instruments.len(),
            saved,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "종목 기본 정보 동기화 완료"
        );
        Ok(saved)
    }

    /// 작업 진행 상황 조회.
    pub async fn get_progress(&self, task_id: &str) -> Result<FetchTask> {
        self.inner.tasks.get(task_id).await.map_err(|e| match e {
            DataError::NotFound(_) => CollectorError::TaskNotFound(task_id.to_string()),
            other => other.into(),
        })
    }

    /// 최근 생성 순 작업 목록.
    pub async fn list_tasks(&self, page: u32, page_size: u32) -> Result<TaskPage> {
        Ok(self.inner.tasks.list(page, page_size).await?)
    }

    /// 저장된 일봉 조회.
    pub async fn query_daily(&self, query: &DailyQuery) -> Result<DailyPage> {
        Ok(self.inner.bars.query_daily(query).await?)
    }

    async fn spawn_job(
        &self,
        plan: UnitPlan,
        start_date: &str,
        end_date: &str,
        concurrency: Option<usize>,
    ) -> Result<FetchJob> {
        let (start, end) = parse_range(start_date, end_date)?;
        let concurrency = concurrency
            .filter(|c| *c > 0)
            .unwrap_or(self.inner.settings.concurrency);

        let task_id = new_task_id(plan.task_prefix());
        let task = FetchTask::new_pending(&task_id, format_yyyymmdd(start), format_yyyymmdd(end));
        self.inner
            .tasks
            .create(&task)
            .await
            .map_err(|e| CollectorError::JobSetup(e.to_string()))?;

        let cancel = CancellationToken::new();
        self.inner
            .jobs
            .lock()
            .await
            .insert(task_id.clone(), cancel.clone());

        info!(
            task_id = %task_id,
            frequency = %plan.frequency(),
            start = %task.start_date,
            end = %task.end_date,
            concurrency,
            "수집 작업 생성"
        );

        let inner = self.inner.clone();
        let span = fetch_span!("fetch_job", task_id, plan.frequency());
        let job_task_id = task_id.clone();
        let job_cancel = cancel.clone();
        let handle = tokio::spawn(
            async move {
                inner
                    .run_job(&job_task_id, plan, start, end, concurrency, job_cancel)
                    .await;
                inner.jobs.lock().await.remove(&job_task_id);
            }
            .instrument(span),
        );

        Ok(FetchJob {
            task_id,
            cancel,
            handle,
        })
    }
}

impl EngineInner {
    async fn run_job(
        &self,
        task_id: &str,
        plan: UnitPlan,
        start: NaiveDate,
        end: NaiveDate,
        concurrency: usize,
        cancel: CancellationToken,
    ) {
        let started = Instant::now();

        let units = match self.plan_units(plan, start, end).await {
            Ok(units) => units,
            Err(e) => {
                error!(error = %e, "작업 단위 구성 실패");
                self.finalize(
                    task_id,
                    TaskStatus::Failed,
                    ProgressSnapshot::default(),
                    Some(format!("planning failed: {e}")),
                )
                .await;
                return;
            }
        };

        let total = units.len() as u64;
        if let Err(e) = self.tasks.mark_running(task_id, total as i32).await {
            warn!(error = %e, "running 상태 기록 실패");
        }

        if total == 0 {
            info!("수집할 날짜 없음, 즉시 완료");
            self.finalize(task_id, TaskStatus::Completed, ProgressSnapshot::new(0), None)
                .await;
            return;
        }

        let tracker = Arc::new(ProgressTracker::new(total));
        let writer = tracker.spawn_writer(task_id.to_string(), self.tasks.clone());
        let worker = UnitWorker::new(
            self.provider.clone(),
            self.persister.clone(),
            plan.frequency(),
        );
        let limiter = Arc::new(RateLimiter::per_minute(self.settings.rate_limit));

        let report = run_units(
            units,
            worker,
            AdmissionGate::new(concurrency),
            limiter,
            tracker.clone(),
            cancel,
        )
        .await;

        // 송신측을 닫아 writer가 마지막 스냅샷을 반영하고 끝나도록 함
        drop(tracker);
        if let Err(e) = writer.await {
            warn!(error = %e, "진행률 writer 비정상 종료");
        }

        let (status, error_msg) = terminal_status(&report);
        self.finalize(task_id, status, report.counters.snapshot, error_msg)
            .await;

        let stats = CollectionStats {
            not_dispatched: report.not_dispatched,
            inserted: report.counters.inserted,
            dropped: report.counters.dropped,
            elapsed: started.elapsed(),
            ..CollectionStats::from_snapshot(report.counters.snapshot)
        };
        stats.log_summary(plan.task_prefix());
    }

    async fn plan_units(
        &self,
        plan: UnitPlan,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<FetchUnit>> {
        let resolved = self.resolver.resolve(plan.frequency(), start, end).await;
        info!(
            calendar_source = %resolved.source,
            dates = resolved.dates.len(),
            "조회 날짜 확정"
        );

        match plan {
            UnitPlan::Dates(_) => Ok(resolved.dates.into_iter().map(FetchUnit::Date).collect()),
            UnitPlan::InstrumentDates => {
                let instruments = self.instruments.list_listed().await?;
                info!(instruments = instruments.len(), "상장 종목 로드");
                let units = resolved
                    .dates
                    .iter()
                    .flat_map(|date| {
                        instruments.iter().map(move |instrument| FetchUnit::InstrumentDate {
                            ts_code: instrument.ts_code.clone(),
                            date: *date,
                        })
                    })
                    .collect();
                Ok(units)
            }
        }
    }

    async fn finalize(
        &self,
        task_id: &str,
        status: TaskStatus,
        snapshot: ProgressSnapshot,
        error_msg: Option<String>,
    ) {
        match self
            .tasks
            .finalize(task_id, status, snapshot, error_msg.clone())
            .await
        {
            Ok(()) => info!(
                status = %status,
                progress = snapshot.progress(),
                error_msg = error_msg.as_deref().unwrap_or(""),
                "수집 작업 종료"
            ),
            Err(e) => error!(status = %status, error = %e, "종료 상태 기록 실패"),
        }
    }
}

/// 시작일/종료일 검증.
fn parse_range(start_date: &str, end_date: &str) -> Result<(NaiveDate, NaiveDate)> {
    let start = parse_yyyymmdd(start_date)
        .map_err(|_| CollectorError::InvalidRequest(format!("invalid start date: {start_date}")))?;
    let end = parse_yyyymmdd(end_date)
        .map_err(|_| CollectorError::InvalidRequest(format!("invalid end date: {end_date}")))?;
    if start > end {
        return Err(CollectorError::InvalidRequest(format!(
            "start date {start_date} is after end date {end_date}"
        )));
    }
    Ok((start, end))
}
