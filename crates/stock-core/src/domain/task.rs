//! 비동기 수집 작업(FetchTask) 모델.
//!
//! 작업 하나는 `fetch_tasks` 테이블의 한 행에 대응합니다.
//!
//! # 상태 전이
//!
//! ```text
//! pending → running → completed
//!                   ↘ failed
//! ```
//!
//! - 모든 작업 단위가 보고를 마치면 `completed` (일부 실패 포함)
//! - 취소로 일부 단위가 디스패치되지 않았거나, 모든 단위가 실패하면 `failed`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 작업 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// 생성됨 (작업 단위 목록 미확정)
    Pending,
    /// 실행 중
    Running,
    /// 완료 (모든 단위 보고 완료)
    Completed,
    /// 실패
    Failed,
}

impl TaskStatus {
    /// 문자열로 변환
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// 종료 상태인지 확인.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown task status: {}", s)),
        }
    }
}

/// 수집 작업 레코드.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchTask {
    /// 작업 ID (생성 후 불변)
    pub task_id: String,
    /// 시작일 (YYYYMMDD)
    pub start_date: String,
    /// 종료일 (YYYYMMDD)
    pub end_date: String,
    pub status: TaskStatus,
    /// 진행률 (0-100)
    pub progress: i32,
    /// 계획된 작업 단위 수
    pub total_count: i32,
    pub success_count: i32,
    pub failed_count: i32,
    /// 집계 메모 (실패/드롭 요약)
    pub error_msg: Option<String>,
    pub start_time: DateTime<Utc>,
    /// 종료 시각 (종료 시 단 한 번 설정)
    pub end_time: Option<DateTime<Utc>>,
}

impl FetchTask {
    /// `pending` 상태의 새 작업 생성.
    pub fn new_pending(
        task_id: impl Into<String>,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            start_date: start_date.into(),
            end_date: end_date.into(),
            status: TaskStatus::Pending,
            progress: 0,
            total_count: 0,
            success_count: 0,
            failed_count: 0,
            error_msg: None,
            start_time: Utc::now(),
            end_time: None,
        }
    }

    /// 보고를 마친 작업 단위 수.
    pub fn completed_count(&self) -> i32 {
        self.success_count + self.failed_count
    }
}

/// 진행 상황 스냅샷.
///
/// 여러 작업 단위가 동시에 갱신하는 카운터 묶음입니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub total: u64,
    pub success: u64,
    pub failed: u64,
}

impl ProgressSnapshot {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn completed(&self) -> u64 {
        self.success + self.failed
    }

    /// 진행률 (%). `completed * 100 / total`, 소수점 버림.
    pub fn progress(&self) -> i32 {
        compute_progress(self.completed(), self.total)
    }
}

/// 진행률 계산.
///
/// `total == 0`이면 즉시 완료된 작업이므로 100을 반환합니다.
pub fn compute_progress(completed: u64, total: u64) -> i32 {
    if total == 0 {
        return 100;
    }
    (completed.min(total) * 100 / total) as i32
}

/// 작업 목록 페이지.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPage {
    pub list: Vec<FetchTask>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}

/// 페이지 파라미터 정규화 (page ≥ 1, page_size 1..=100).
pub fn normalize_page(page: u32, page_size: u32) -> (u32, u32) {
    (page.max(1), page_size.clamp(1, 100))
}

/// 정규화된 페이지의 시작 위치. `u32` 범위를 넘는 곱도 넘치지 않습니다.
pub fn page_offset(page: u32, page_size: u32) -> u64 {
    u64::from(page.saturating_sub(1)) * u64::from(page_size)
}
