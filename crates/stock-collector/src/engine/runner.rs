//! 작업 단위 실행과 종료 상태 판정.

use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use stock_core::{format_yyyymmdd, FetchUnit, Frequency, TaskStatus};
use stock_data::{BatchPersister, DataProvider, PersistOutcome};

use super::gate::AdmissionGate;
use super::progress::{JobCounters, ProgressTracker};
use super::rate_limiter::RateLimiter;

/// 작업 단위 하나를 조회하고 저장합니다.
#[derive(Clone)]
pub struct UnitWorker {
    provider: Arc<dyn DataProvider>,
    persister: BatchPersister,
    frequency: Frequency,
}

impl UnitWorker {
    pub fn new(
        provider: Arc<dyn DataProvider>,
        persister: BatchPersister,
        frequency: Frequency,
    ) -> Self {
        Self {
            provider,
            persister,
            frequency,
        }
    }

    pub async fn run(&self, unit: &FetchUnit) -> stock_data::Result<PersistOutcome> {
        let trade_date = format_yyyymmdd(unit.date());
        match self.frequency {
            Frequency::Daily => {
                let bars = self.provider.daily(&trade_date, unit.ts_code()).await?;
                self.persister.persist_daily(&bars).await
            }
            frequency => {
                let bars = self.provider.adjusted_bars(frequency, &trade_date).await?;
                self.persister.persist_adjusted(frequency, &bars).await
            }
        }
    }
}

/// 작업 단위 실행 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub counters: JobCounters,
    /// 취소로 디스패치되지 않은 작업 단위 수
    pub not_dispatched: u64,
}

/// 모든 작업 단위를 게이트와 속도 제한 아래에서 실행합니다.
///
/// 단위 하나의 실패는 카운터에만 반영되고 다른 단위는 계속 실행됩니다.
/// 취소되면 새 단위의 진입만 멈추고 이미 진입한 단위는 끝까지 기다립니다.
pub async fn run_units(
    units: Vec<FetchUnit>,
    worker: UnitWorker,
    gate: AdmissionGate,
    limiter: Arc<RateLimiter>,
    tracker: Arc<ProgressTracker>,
    cancel: CancellationToken,
) -> RunReport {
    let total = units.len() as u64;
    let mut dispatched = 0u64;
    let mut in_flight = JoinSet::new();

    for unit in units {
        let Some(permit) = gate.admit(&cancel).await else {
            warn!(dispatched, total, "취소 신호 수신, 남은 작업 단위 진입 중단");
            break;
        };
        dispatched += 1;

        let worker = worker.clone();
        let limiter = limiter.clone();
        let unit_tracker = tracker.clone();
        in_flight.spawn(async move {
            let _permit = permit;
            limiter.acquire().await;
            match worker.run(&unit).await {
                Ok(outcome) => {
                    debug!(unit = %unit, inserted = outcome.inserted, "작업 단위 완료");
                    unit_tracker.record_success(outcome);
                }
                Err(e) => {
                    warn!(unit = %unit, error = %e, "작업 단위 실패");
                    unit_tracker.record_failure();
                }
            }
        });

        while let Some(joined) = in_flight.try_join_next() {
            record_join_error(joined, &tracker);
        }
    }

    while let Some(joined) = in_flight.join_next().await {
        record_join_error(joined, &tracker);
    }

    RunReport {
        counters: tracker.counters(),
        not_dispatched: total - dispatched,
    }
}

fn record_join_error(joined: Result<(), tokio::task::JoinError>, tracker: &ProgressTracker) {
    if let Err(e) = joined {
        error!(error = %e, "작업 단위 태스크 비정상 종료");
        tracker.record_failure();
    }
}

/// 종료 상태와 집계 메모 결정.
///
/// - 취소로 디스패치되지 않은 단위가 있으면 `failed`
/// - 단위가 있고 모두 실패하면 `failed`
/// - 그 외에는 `completed` (일부 실패 포함)
pub fn terminal_status(report: &RunReport) -> (TaskStatus, Option<String>) {
    let snapshot = report.counters.snapshot;
    let mut notes = Vec::new();

    let status = if report.not_dispatched > 0 {
        notes.push(format!(
            "cancelled: {} units not dispatched",
            report.not_dispatched
        ));
        TaskStatus::Failed
    } else if snapshot.total > 0 && snapshot.failed == snapshot.total {
        TaskStatus::Failed
    } else {
        TaskStatus::Completed
    };

    if snapshot.failed > 0 {
        notes.push(format!(
            "{} of {} units failed",
            snapshot.failed, snapshot.total
        ));
    }
    if report.counters.dropped > 0 {
        notes.push(format!(
            "{} records dropped (unparseable date)",
            report.counters.dropped
        ));
    }

    let error_msg = if notes.is_empty() {
        None
    } else {
        Some(notes.join("; "))
    };
    (status, error_msg)
}
