//! 수집 통계 구조체.

use serde::Serialize;
use std::time::Duration;

use stock_core::ProgressSnapshot;

/// 수집 작업 통계
#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectionStats {
    /// 계획된 작업 단위 수
    pub total: u64,
    /// 성공한 작업 단위 수
    pub success: u64,
    /// 실패한 작업 단위 수
    pub failed: u64,
    /// 실행되지 않은 작업 단위 수 (취소)
    pub not_dispatched: u64,
    /// 저장된 행 수
    pub inserted: u64,
    /// 날짜 파싱 실패로 제외된 레코드 수
    pub dropped: u64,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl CollectionStats {
    pub fn from_snapshot(snapshot: ProgressSnapshot) -> Self {
        Self {
            total: snapshot.total,
            success: snapshot.success,
            failed: snapshot.failed,
            ..Default::default()
        }
    }

    /// 성공률 계산 (%)
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.success as f64 / self.total as f64) * 100.0
        }
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            total = self.total,
            success = self.success,
            failed = self.failed,
            not_dispatched = self.not_dispatched,
            inserted = self.inserted,
            dropped = self.dropped,
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "수집 완료"
        );
    }
}
