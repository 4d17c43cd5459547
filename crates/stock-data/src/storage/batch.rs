//! 청크 단위 일괄 저장.
//!
//! 응답 크기와 관계없이 하나의 INSERT 문이 `batch_size`개를 넘지 않도록 나눠서
//! 저장합니다. 날짜를 파싱할 수 없는 레코드는 해당 청크에서 빠지고(로그 기록)
//! 나머지 레코드는 그대로 저장됩니다. 청크 삽입 자체가 실패하면 에러를 반환합니다.

use std::sync::Arc;
use tracing::{debug, warn};

use stock_core::{AdjustedBar, CoreResult, DailyBar, Frequency, Instrument};

use super::records::{AdjustedRecord, DailyRecord};
use super::{BarStore, InstrumentStore};
use crate::error::Result;

/// 기본 청크 크기.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// 저장 결과.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistOutcome {
    /// 새로 삽입된 행 수
    pub inserted: u64,
    /// 날짜 파싱 실패로 제외된 레코드 수
    pub dropped: u64,
    /// 나눈 청크 수
    pub chunks: usize,
}

impl std::ops::AddAssign for PersistOutcome {
    fn add_assign(&mut self, rhs: Self) {
        self.inserted += rhs.inserted;
        self.dropped += rhs.dropped;
        self.chunks += rhs.chunks;
    }
}

/// 일괄 저장기.
#[derive(Clone)]
pub struct BatchPersister {
    bars: Arc<dyn BarStore>,
    instruments: Arc<dyn InstrumentStore>,
    batch_size: usize,
}

impl BatchPersister {
    /// `batch_size == 0`이면 기본값을 사용합니다.
    pub fn new(
        bars: Arc<dyn BarStore>,
        instruments: Arc<dyn InstrumentStore>,
        batch_size: usize,
    ) -> Self {
        let batch_size = if batch_size == 0 {
            DEFAULT_BATCH_SIZE
        } else {
            batch_size
        };
        Self {
            bars,
            instruments,
            batch_size,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub async fn persist_daily(&self, bars: &[DailyBar]) -> Result<PersistOutcome> {
        let mut outcome = PersistOutcome::default();
        for chunk in bars.chunks(self.batch_size) {
            outcome.chunks += 1;
            let (records, dropped) = convert_chunk(chunk, DailyRecord::from_bar, |b| {
                (b.ts_code.as_str(), b.trade_date.as_str())
            });
            outcome.dropped += dropped;
            if !records.is_empty() {
                outcome.inserted += self.bars.insert_daily(&records).await?;
            }
        }

        debug!(
            records = bars.len(),
            inserted = outcome.inserted,
            dropped = outcome.dropped,
            chunks = outcome.chunks,
            "일봉 저장"
        );
        Ok(outcome)
    }

    pub async fn persist_adjusted(
        &self,
        frequency: Frequency,
        bars: &[AdjustedBar],
    ) -> Result<PersistOutcome> {
        let mut outcome = PersistOutcome::default();
        for chunk in bars.chunks(self.batch_size) {
            outcome.chunks += 1;
            let (records, dropped) = convert_chunk(chunk, AdjustedRecord::from_bar, |b| {
                (b.ts_code.as_str(), b.trade_date.as_str())
            });
            outcome.dropped += dropped;
            if !records.is_empty() {
                outcome.inserted += self.bars.insert_adjusted(frequency, &records).await?;
            }
        }

        debug!(
            frequency = %frequency,
            records = bars.len(),
            inserted = outcome.inserted,
            dropped = outcome.dropped,
            chunks = outcome.chunks,
            "수정주가 저장"
        );
        Ok(outcome)
    }

    /// 종목 기본 정보 upsert. 저장된 종목 수를 반환합니다.
    pub async fn persist_instruments(&self, instruments: &[Instrument]) -> Result<u64> {
        let mut saved = 0;
        for chunk in instruments.chunks(self.batch_size) {
            saved += self.instruments.upsert(chunk).await?;
        }
        Ok(saved)
    }
}

fn convert_chunk<B, R>(
    chunk: &[B],
    convert: impl Fn(&B) -> CoreResult<R>,
    key: impl Fn(&B) -> (&str, &str),
) -> (Vec<R>, u64) {
    let mut records = Vec::with_capacity(chunk.len());
    let mut dropped = 0;
    for bar in chunk {
        match convert(bar) {
            Ok(record) => records.push(record),
            Err(e) => {
                let (ts_code, trade_date) = key(bar);
                warn!(ts_code, trade_date, error = %e, "날짜 파싱 실패, 레코드 제외");
                dropped += 1;
            }
        }
    }
    (records, dropped)
}
