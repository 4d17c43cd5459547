//! 동시 실행 작업 단위 수를 제한하는 진입 게이트.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// 세마포어 기반 진입 게이트.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

impl AdmissionGate {
    /// 최대 `limit`개 동시 진입. 0은 1로 취급합니다.
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// 진입 슬롯 획득.
    ///
    /// 취소 신호가 먼저 오면 `None`. 이미 취소된 토큰이면 슬롯이 남아 있어도 `None`입니다.
    pub async fn admit(&self, cancel: &CancellationToken) -> Option<OwnedSemaphorePermit> {
        if cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            permit = self.semaphore.clone().acquire_owned() => permit.ok(),
        }
    }
}
