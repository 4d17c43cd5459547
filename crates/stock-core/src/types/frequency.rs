//! 수집 주기(일봉/주봉/월봉) 정의.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 수집 작업의 데이터 주기.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// 일봉
    Daily,
    /// 주봉 (주별 마지막 거래일)
    Weekly,
    /// 월봉 (월별 마지막 거래일)
    Monthly,
}

impl Frequency {
    /// 작업 ID 접두어.
    pub fn task_prefix(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }

    /// 데이터 제공자의 `freq` 파라미터 값 (주봉/월봉만 해당).
    pub fn provider_freq(&self) -> Option<&'static str> {
        match self {
            Frequency::Daily => None,
            Frequency::Weekly => Some("week"),
            Frequency::Monthly => Some("month"),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.task_prefix())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" | "day" | "d" => Ok(Frequency::Daily),
            "weekly" | "week" | "w" => Ok(Frequency::Weekly),
            "monthly" | "month" | "m" => Ok(Frequency::Monthly),
            _ => Err(format!("Unknown frequency: {}", s)),
        }
    }
}
