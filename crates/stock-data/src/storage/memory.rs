//! 인메모리 저장소.
//!
//! 데이터베이스 없이 수집 엔진을 실행하거나 테스트할 때 사용합니다.
//! 삽입 규칙(키 중복 시 건너뜀)은 PostgreSQL 구현과 같습니다.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

use stock_core::{
    compute_progress, normalize_page, page_offset, FetchTask, Frequency, Instrument,
    ProgressSnapshot, TaskPage, TaskStatus,
};

use super::records::{AdjustedRecord, DailyPage, DailyQuery, DailyRecord};
use super::{BarStore, InstrumentStore, TaskStore};
use crate::error::{DataError, Result};

type BarKey = (String, NaiveDate);

/// 인메모리 시세 저장소.
#[derive(Debug, Default)]
pub struct MemoryBarStore {
    daily: RwLock<BTreeMap<BarKey, DailyRecord>>,
    weekly: RwLock<BTreeMap<BarKey, AdjustedRecord>>,
    monthly: RwLock<BTreeMap<BarKey, AdjustedRecord>>,
    insert_calls: AtomicUsize,
    fail_inserts: AtomicBool,
}

impl MemoryBarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 이후 모든 삽입을 실패시킵니다.
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// 지금까지의 청크 삽입 호출 수.
    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub async fn daily_len(&self) -> usize {
        self.daily.read().await.len()
    }

    pub async fn adjusted(&self, frequency: Frequency) -> Vec<AdjustedRecord> {
        match frequency {
            Frequency::Weekly => self.weekly.read().await.values().cloned().collect(),
            Frequency::Monthly => self.monthly.read().await.values().cloned().collect(),
            Frequency::Daily => Vec::new(),
        }
    }

    fn begin_insert(&self) -> Result<()> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(DataError::InsertError("insert disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BarStore for MemoryBarStore {
    async fn insert_daily(&self, records: &[DailyRecord]) -> Result<u64> {
        self.begin_insert()?;
        let mut daily = self.daily.write().await;
        let mut inserted = 0;
        for record in records {
            let key = (record.ts_code.clone(), record.trade_date);
            if let Entry::Vacant(slot) = daily.entry(key) {
                slot.insert(record.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn insert_adjusted(
        &self,
        frequency: Frequency,
        records: &[AdjustedRecord],
    ) -> Result<u64> {
        self.begin_insert()?;
        let table = match frequency {
            Frequency::Weekly => &self.weekly,
            Frequency::Monthly => &self.monthly,
            Frequency::Daily => {
                return Err(DataError::InvalidData(
                    "일봉은 수정주가 테이블에 저장할 수 없습니다".to_string(),
                ))
            }
        };

        let mut table = table.write().await;
        let mut inserted = 0;
        for record in records {
            let key = (record.ts_code.clone(), record.trade_date);
            if let Entry::Vacant(slot) = table.entry(key) {
                slot.insert(record.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn query_daily(&self, query: &DailyQuery) -> Result<DailyPage> {
        let (page, page_size) = normalize_page(query.page, query.page_size);
        let daily = self.daily.read().await;

        let mut matched: Vec<&DailyRecord> = daily.values().filter(|r| query.matches(r)).collect();
        matched.sort_by(|a, b| {
            b.trade_date
                .cmp(&a.trade_date)
                .then_with(|| a.ts_code.cmp(&b.ts_code))
        });

        let offset = usize::try_from(page_offset(page, page_size)).unwrap_or(usize::MAX);
        let list = matched
            .iter()
            .skip(offset)
            .take(page_size as usize)
            .map(|r| (*r).clone())
            .collect();

        Ok(DailyPage {
            list,
            total: matched.len() as i64,
            page,
            page_size,
        })
    }
}

/// 인메모리 작업 저장소.
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    /// 생성 순서대로 보관
    tasks: RwLock<Vec<FetchTask>>,
    progress_writes: AtomicUsize,
    fail_create: AtomicBool,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 이후 작업 생성을 실패시킵니다.
    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// `update_progress` 호출 수.
    pub fn progress_writes(&self) -> usize {
        self.progress_writes.load(Ordering::SeqCst)
    }

    async fn with_task<F>(&self, task_id: &str, apply: F) -> Result<()>
    where
        F: FnOnce(&mut FetchTask),
    {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .iter_mut()
            .find(|t| t.task_id == task_id)
            .ok_or_else(|| DataError::NotFound(format!("task {task_id}")))?;
        apply(task);
        Ok(())
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn create(&self, task: &FetchTask) -> Result<()> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(DataError::ConnectionError("task store unavailable".to_string()));
        }
        let mut tasks = self.tasks.write().await;
        if tasks.iter().any(|t| t.task_id == task.task_id) {
            return Err(DataError::DuplicateError(task.task_id.clone()));
        }
        tasks.push(task.clone());
        Ok(())
    }

    async fn mark_running(&self, task_id: &str, total: i32) -> Result<()> {
        self.with_task(task_id, |task| {
            task.status = TaskStatus::Running;
            task.total_count = total;
        })
        .await
    }

    async fn update_progress(&self, task_id: &str, snapshot: ProgressSnapshot) -> Result<()> {
        self.progress_writes.fetch_add(1, Ordering::SeqCst);
        self.with_task(task_id, |task| {
            task.progress = snapshot.progress();
            task.success_count = snapshot.success as i32;
            task.failed_count = snapshot.failed as i32;
        })
        .await
    }

    async fn finalize(
        &self,
        task_id: &str,
        status: TaskStatus,
        snapshot: ProgressSnapshot,
        error_msg: Option<String>,
    ) -> Result<()> {
        self.with_task(task_id, |task| {
            task.status = status;
            task.total_count = snapshot.total as i32;
            task.success_count = snapshot.success as i32;
            task.failed_count = snapshot.failed as i32;
            task.progress = compute_progress(snapshot.completed(), snapshot.total);
            task.error_msg = error_msg;
            if task.end_time.is_none() {
                task.end_time = Some(Utc::now());
            }
        })
        .await
    }

    async fn get(&self, task_id: &str) -> Result<FetchTask> {
        self.tasks
            .read()
            .await
            .iter()
            .find(|t| t.task_id == task_id)
            .cloned()
            .ok_or_else(|| DataError::NotFound(format!("task {task_id}")))
    }

    async fn list(&self, page: u32, page_size: u32) -> Result<TaskPage> {
        let (page, page_size) = normalize_page(page, page_size);
        let tasks = self.tasks.read().await;
        let offset = usize::try_from(page_offset(page, page_size)).unwrap_or(usize::MAX);
        let list = tasks
            .iter()
            .rev()
            .skip(offset)
            .take(page_size as usize)
            .cloned()
            .collect();

        Ok(TaskPage {
            list,
            total: tasks.len() as i64,
            page,
            page_size,
        })
    }
}

/// 인메모리 종목 저장소.
#[derive(Debug, Default)]
pub struct MemoryInstrumentStore {
    instruments: RwLock<HashMap<String, Instrument>>,
}

impl MemoryInstrumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_instruments(instruments: &[Instrument]) -> Self {
        let store = Self::new();
        // 인메모리 upsert는 실패하지 않음
        let _ = store.upsert(instruments).await;
        store
    }
}

#[async_trait]
impl InstrumentStore for MemoryInstrumentStore {
    async fn upsert(&self, instruments: &[Instrument]) -> Result<u64> {
        let mut map = self.instruments.write().await;
        for instrument in instruments {
            map.insert(instrument.ts_code.clone(), instrument.clone());
        }
        Ok(instruments.len() as u64)
    }

    async fn list_listed(&self) -> Result<Vec<Instrument>> {
        let map = self.instruments.read().await;
        let mut listed: Vec<Instrument> = map.values().filter(|i| i.is_listed()).cloned().collect();
        listed.sort_by(|a, b| a.ts_code.cmp(&b.ts_code));
        Ok(listed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn record(ts_code: &str, date: &str) -> DailyRecord {
        DailyRecord {
            ts_code: ts_code.into(),
            trade_date: stock_core::parse_yyyymmdd(date).unwrap(),
            open: Decimal::ONE,
            high: Decimal::ONE,
            low: Decimal::ONE,
            close: Decimal::ONE,
            pre_close: Decimal::ONE,
            change: Decimal::ZERO,
            pct_chg: Decimal::ZERO,
            vol: Decimal::ONE,
            amount: Decimal::ONE,
        }
    }

    #[tokio::test]
    async fn test_duplicate_key_not_overwritten() {
        let store = MemoryBarStore::new();
        assert_eq!(store.insert_daily(&[record("000001.SZ", "20231201")]).await.unwrap(), 1);

        let mut changed = record("000001.SZ", "20231201");
        changed.close = Decimal::TEN;
        assert_eq!(store.insert_daily(&[changed]).await.unwrap(), 0);

        let page = store.query_daily(&DailyQuery::default()).await.unwrap();
        assert_eq!(page.list[0].close, Decimal::ONE);
    }

    #[tokio::test]
    async fn test_query_daily_filters_and_orders() {
        let store = MemoryBarStore::new();
        store
            .insert_daily(&[
                record("000001.SZ", "20231201"),
                record("000001.SZ", "20231204"),
                record("000002.SZ", "20231204"),
            ])
            .await
            .unwrap();

        let page = store
            .query_daily(&DailyQuery {
                ts_code: Some("000001.SZ".into()),
                page: 1,
                page_size: 10,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.list[0].trade_date.to_string(), "2023-12-04");
    }

    #[tokio::test]
    async fn test_task_finalize_sets_end_time_once() {
        let store = MemoryTaskStore::new();
        store
            .create(&FetchTask::new_pending("t1", "20231201", "20231201"))
            .await
            .unwrap();
        let snapshot = ProgressSnapshot::new(0);

        store
            .finalize("t1", TaskStatus::Completed, snapshot, None)
            .await
            .unwrap();
        let first = store.get("t1").await.unwrap().end_time;

        store
            .finalize("t1", TaskStatus::Completed, snapshot, None)
            .await
            .unwrap();
        assert_eq!(store.get("t1").await.unwrap().end_time, first);
        assert_eq!(store.get("t1").await.unwrap().progress, 100);
    }

    #[tokio::test]
    async fn test_get_missing_task_is_not_found() {
        let store = MemoryTaskStore::new();
        assert!(matches!(store.get("nope").await, Err(DataError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_task_list_newest_first() {
        let store = MemoryTaskStore::new();
        for id in ["a", "b", "c"] {
            store
                .create(&FetchTask::new_pending(id, "20231201", "20231201"))
                .await
                .unwrap();
        }
        let page = store.list(0, 2).await.unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.total, 3);
        let ids: Vec<&str> = page.list.iter().map(|t| t.task_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[tokio::test]
    async fn test_huge_page_is_empty() {
        let tasks = MemoryTaskStore::new();
        tasks
            .create(&FetchTask::new_pending("a", "20231201", "20231201"))
            .await
            .unwrap();
        let page = tasks.list(50_000_000, 100).await.unwrap();
        assert!(page.list.is_empty());
        assert_eq!(page.total, 1);
        assert_eq!(page.page, 50_000_000);

        let bars = MemoryBarStore::new();
        bars.insert_daily(&[record("000001.SZ", "20231201")])
            .await
            .unwrap();
        let page = bars
            .query_daily(&DailyQuery {
                page: u32::MAX,
                page_size: 100,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(page.list.is_empty());
        assert_eq!(page.total, 1);
    }
}
