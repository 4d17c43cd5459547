//! 작업 진행 상황 추적.
//!
//! 모든 작업 단위는 `watch` 채널의 `send_modify`만으로 카운터를 갱신합니다.
//! 저장소 반영은 채널을 구독하는 단일 writer 태스크가 최신 스냅샷을 덮어쓰는
//! 방식이라 갱신이 유실되지 않습니다. 종료 시에는 정확한 최종값을 따로 기록합니다.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use stock_core::ProgressSnapshot;
use stock_data::{PersistOutcome, TaskStore};

/// 작업 카운터.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobCounters {
    pub snapshot: ProgressSnapshot,
    /// 저장된 행 수
    pub inserted: u64,
    /// 날짜 파싱 실패로 제외된 레코드 수
    pub dropped: u64,
}

/// 진행 상황 추적기.
#[derive(Debug)]
pub struct ProgressTracker {
    tx: watch::Sender<JobCounters>,
}

impl ProgressTracker {
    pub fn new(total: u64) -> Self {
        let (tx, _rx) = watch::channel(JobCounters {
            snapshot: ProgressSnapshot::new(total),
            ..Default::default()
        });
        Self { tx }
    }

    pub fn record_success(&self, outcome: PersistOutcome) {
        self.tx.send_modify(|c| {
            c.snapshot.success += 1;
            c.inserted += outcome.inserted;
            c.dropped += outcome.dropped;
        });
    }

    pub fn record_failure(&self) {
        self.tx.send_modify(|c| c.snapshot.failed += 1);
    }

    pub fn counters(&self) -> JobCounters {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<JobCounters> {
        self.tx.subscribe()
    }

    /// 최신 스냅샷을 저장소에 반영하는 writer 태스크 시작.
    ///
    /// 추적기(송신측)가 drop되면 남은 변경을 반영한 뒤 종료합니다.
    pub fn spawn_writer(
        &self,
        task_id: String,
        store: Arc<dyn TaskStore>,
    ) -> JoinHandle<()> {
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let counters = *rx.borrow_and_update();
                if let Err(e) = store.update_progress(&task_id, counters.snapshot).await {
                    warn!(task_id = %task_id, error = %e, "진행률 저장 실패");
                } else {
                    debug!(
                        task_id = %task_id,
                        progress = counters.snapshot.progress(),
                        success = counters.snapshot.success,
                        failed = counters.snapshot.failed,
                        "진행률 갱신"
                    );
                }
            }
        })
    }
}
