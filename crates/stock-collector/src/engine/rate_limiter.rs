//! 작업 단위의 원격 호출 속도 제한.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// 고정 간격 티커 기반 속도 제한기.
///
/// 작업(job)마다 하나를 만들어 모든 작업 단위가 공유합니다. 첫 슬롯은 즉시,
/// 이후 슬롯은 `60 / rate_per_minute`초 간격으로 열리며 밀린 틱을 몰아서
/// 내보내지 않습니다.
#[derive(Debug)]
pub struct RateLimiter {
    ticker: Mutex<Interval>,
    period: Duration,
}

impl RateLimiter {
    /// 분당 최대 `rate_per_minute`회. 0은 1로 취급합니다.
    ///
    /// tokio 런타임 안에서 호출해야 합니다.
    pub fn per_minute(rate_per_minute: u32) -> Self {
        Self::with_period(Duration::from_secs(60) / rate_per_minute.max(1))
    }

    pub fn with_period(period: Duration) -> Self {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            ticker: Mutex::new(ticker),
            period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// 다음 슬롯까지 대기.
    pub async fn acquire(&self) {
        self.ticker.lock().await.tick().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_slots_are_spaced_by_period() {
        let limiter = RateLimiter::per_minute(60);
        assert_eq!(limiter.period(), Duration::from_secs(1));

        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(1));

        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_limiter_caps_concurrent_callers() {
        let limiter = Arc::new(RateLimiter::per_minute(120));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..5 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
                Instant::now()
            }));
        }

        let mut times = Vec::new();
        for handle in handles {
            times.push(handle.await.unwrap());
        }
        times.sort();

        // 5개 슬롯 = 즉시 1개 + 500ms 간격 4개
        assert!(times[4] - start >= Duration::from_secs(2));
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(500));
        }
    }
}
