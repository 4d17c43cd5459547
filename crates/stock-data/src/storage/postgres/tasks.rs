//! 수집 작업 테이블 (`fetch_tasks`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use tracing::instrument;

use stock_core::{normalize_page, page_offset, FetchTask, ProgressSnapshot, TaskPage, TaskStatus};

use crate::error::{DataError, Result};
use crate::storage::TaskStore;

/// `fetch_tasks` 행.
#[derive(Debug, Clone, FromRow)]
struct TaskRow {
    task_id: String,
    start_date: String,
    end_date: String,
    status: String,
    progress: i32,
    total_count: i32,
    success_count: i32,
    failed_count: i32,
    error_msg: Option<String>,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
}

impl TryFrom<TaskRow> for FetchTask {
    type Error = DataError;

    fn try_from(row: TaskRow) -> Result<Self> {
        let status: TaskStatus = row.status.parse().map_err(DataError::InvalidData)?;
        Ok(FetchTask {
            task_id: row.task_id,
            start_date: row.start_date,
            end_date: row.end_date,
            status,
            progress: row.progress,
            total_count: row.total_count,
            success_count: row.success_count,
            failed_count: row.failed_count,
            error_msg: row.error_msg,
            start_time: row.start_time,
            end_time: row.end_time,
        })
    }
}

const TASK_COLUMNS: &str = "task_id, start_date, end_date, status, progress, total_count, \
     success_count, failed_count, error_msg, start_time, end_time";

#[derive(Clone)]
pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn ensure_updated(task_id: &str, rows_affected: u64) -> Result<()> {
        if rows_affected == 0 {
            return Err(DataError::NotFound(format!("task {task_id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    #[instrument(skip(self, task), fields(task_id = %task.task_id))]
    async fn create(&self, task: &FetchTask) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO fetch_tasks
                (task_id, start_date, end_date, status, progress, total_count,
                 success_count, failed_count, error_msg, start_time, end_time)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&task.task_id)
        .bind(&task.start_date)
        .bind(&task.end_date)
        .bind(task.status.as_str())
        .bind(task.progress)
        .bind(task.total_count)
        .bind(task.success_count)
        .bind(task.failed_count)
        .bind(&task.error_msg)
        .bind(task.start_time)
        .bind(task.end_time)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_running(&self, task_id: &str, total: i32) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE fetch_tasks
            SET status = $2, total_count = $3, updated_at = NOW()
            WHERE task_id = $1
            "#,
        )
        .bind(task_id)
        .bind(TaskStatus::Running.as_str())
        .bind(total)
        .execute(&self.pool)
        .await?;

        Self::ensure_updated(task_id, result.rows_affected())
    }

    async fn update_progress(&self, task_id: &str, snapshot: ProgressSnapshot) -> Result<()> {
        // 세 필드를 하나의 문장으로 덮어씀
        let result = sqlx::query(
            r#"
            UPDATE fetch_tasks
            SET progress = $2, success_count = $3, failed_count = $4, updated_at = NOW()
            WHERE task_id = $1
            "#,
        )
        .bind(task_id)
        .bind(snapshot.progress())
        .bind(snapshot.success as i32)
        .bind(snapshot.failed as i32)
        .execute(&self.pool)
        .await?;

        Self::ensure_updated(task_id, result.rows_affected())
    }

    #[instrument(skip(self, snapshot, error_msg))]
    async fn finalize(
        &self,
        task_id: &str,
        status: TaskStatus,
        snapshot: ProgressSnapshot,
        error_msg: Option<String>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE fetch_tasks
            SET status = $2,
                progress = $3,
                total_count = $4,
                success_count = $5,
                failed_count = $6,
                error_msg = $7,
                end_time = COALESCE(end_time, NOW()),
                updated_at = NOW()
            WHERE task_id = $1
            "#,
        )
        .bind(task_id)
        .bind(status.as_str())
        .bind(snapshot.progress())
        .bind(snapshot.total as i32)
        .bind(snapshot.success as i32)
        .bind(snapshot.failed as i32)
        .bind(error_msg)
        .execute(&self.pool)
        .await?;

        Self::ensure_updated(task_id, result.rows_affected())
    }

    async fn get(&self, task_id: &str) -> Result<FetchTask> {
        let row: Option<TaskRow> =
            sqlx::query_as(&format!("SELECT {TASK_COLUMNS} FROM fetch_tasks WHERE task_id = $1"))
                .bind(task_id)
                .fetch_optional(&self.pool)
                .await?;

        row.ok_or_else(|| DataError::NotFound(format!("task {task_id}")))?
            .try_into()
    }

    async fn list(&self, page: u32, page_size: u32) -> Result<TaskPage> {
        let (page, page_size) = normalize_page(page, page_size);
        let offset = i64::try_from(page_offset(page, page_size)).unwrap_or(i64::MAX);

        let rows: Vec<TaskRow> = sqlx::query_as(&format!(
            "SELECT {TASK_COLUMNS} FROM fetch_tasks ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(page_size))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM fetch_tasks")
            .fetch_one(&self.pool)
            .await?;

        let list = rows
            .into_iter()
            .map(FetchTask::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(TaskPage {
            list,
            total,
            page,
            page_size,
        })
    }
}
