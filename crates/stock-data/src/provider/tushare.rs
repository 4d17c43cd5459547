//! Tushare Pro API 클라이언트.
//!
//! 모든 API는 하나의 엔드포인트로 `{api_name, token, params, fields}`를 POST하고
//! `{code, msg, data: {fields, items}}`를 받습니다. `code != 0`은 응용 에러이며
//! 메시지는 그대로 전달됩니다.
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! use stock_data::provider::{DataProvider, TushareClient};
//!
//! let client = TushareClient::new(&config.tushare)?;
//! let bars = client.daily("20231201", None).await?;
//! ```

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use stock_core::{AdjustedBar, DailyBar, Frequency, Instrument, TradingCalendarEntry, TushareConfig};

use super::records::{decode_adjusted, decode_calendar, decode_daily, decode_instruments};
use super::table::RemoteTable;
use super::DataProvider;
use crate::error::{DataError, Result};

/// 응답 봉투.
#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Option<RemoteTable>,
}

/// Tushare Pro API 클라이언트.
///
/// `reqwest::Client`를 공유하므로 clone 비용이 작습니다.
#[derive(Clone)]
pub struct TushareClient {
    client: reqwest::Client,
    token: SecretString,
    base_url: String,
    retry: u32,
    retry_backoff: Duration,
}

impl std::fmt::Debug for TushareClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TushareClient")
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .field("retry_backoff", &self.retry_backoff)
            .finish_non_exhaustive()
    }
}

impl TushareClient {
    /// 설정으로 클라이언트 생성.
    pub fn new(config: &TushareConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| DataError::Network(format!("HTTP 클라이언트 생성 실패: {e}")))?;

        Ok(Self {
            client,
            token: SecretString::from(config.token.clone()),
            base_url: config.base_url.clone(),
            retry: config.retry,
            retry_backoff: config.retry_backoff(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// API 호출.
    ///
    /// 전송 실패와 `code != 0` 응답은 최대 `retry`번 재시도합니다.
    /// i번째 재시도 전에는 `i * retry_backoff`만큼 대기하며, 모두 실패하면 마지막
    /// 에러를 반환합니다.
    #[instrument(skip(self, params), fields(api = api_name))]
    pub async fn call(
        &self,
        api_name: &str,
        params: Map<String, Value>,
        fields: Option<&str>,
    ) -> Result<RemoteTable> {
        let mut body = json!({
            "api_name": api_name,
            "token": self.token.expose_secret(),
            "params": params,
        });
        if let Some(fields) = fields {
            body["fields"] = Value::String(fields.to_string());
        }

        let mut last_err = None;
        for attempt in 0..=self.retry {
            if attempt > 0 {
                tokio::time::sleep(self.retry_backoff * attempt).await;
            }

            match self.send_once(&body).await {
                Ok(table) => {
                    debug!(attempt, rows = table.len(), "API 응답 수신");
                    return Ok(table);
                }
                Err(e) if e.is_retryable() => {
                    warn!(attempt, max_retry = self.retry, error = %e, "API 호출 실패");
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| DataError::Network(format!("{api_name}: 호출되지 않음"))))
    }

    async fn send_once(&self, body: &Value) -> Result<RemoteTable> {
        let response = self
            .client
            .post(&self.base_url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(DataError::Network(format!("HTTP {status}: {text}")));
        }

        let envelope: ApiEnvelope = serde_json::from_str(&text)?;
        if envelope.code != 0 {
            return Err(DataError::ApiError {
                code: envelope.code,
                msg: envelope.msg.unwrap_or_default(),
            });
        }

        Ok(envelope.data.unwrap_or_default())
    }
}

#[async_trait]
impl DataProvider for TushareClient {
    async fn trade_calendar(
        &self,
        exchange: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<TradingCalendarEntry>> {
        let mut params = Map::new();
        params.insert("exchange".into(), json!(exchange));
        params.insert("start_date".into(), json!(start_date));
        params.insert("end_date".into(), json!(end_date));

        let table = self.call("trade_cal", params, None).await?;
        Ok(decode_calendar(&table))
    }

    async fn daily(&self, trade_date: &str, ts_code: Option<&str>) -> Result<Vec<DailyBar>> {
        let mut params = Map::new();
        if !trade_date.is_empty() {
            params.insert("trade_date".into(), json!(trade_date));
        }
        if let Some(ts_code) = ts_code.filter(|c| !c.is_empty()) {
            params.insert("ts_code".into(), json!(ts_code));
        }

        let table = self.call("daily", params, None).await?;
        Ok(decode_daily(&table))
    }

    async fn adjusted_bars(
        &self,
        frequency: Frequency,
        trade_date: &str,
    ) -> Result<Vec<AdjustedBar>> {
        let freq = frequency.provider_freq().ok_or_else(|| {
            DataError::InvalidData(format!("{frequency}: 수정주가 주기가 아닙니다"))
        })?;

        let mut params = Map::new();
        params.insert("freq".into(), json!(freq));
        if !trade_date.is_empty() {
            params.insert("trade_date".into(), json!(trade_date));
        }

        let table = self.call("stk_week_month_adj", params, None).await?;
        Ok(decode_adjusted(&table))
    }

    async fn stock_basic(&self) -> Result<Vec<Instrument>> {
        let mut params = Map::new();
        params.insert("list_status".into(), json!(stock_core::LIST_STATUS_LISTED));

        let table = self.call("stock_basic", params, None).await?;
        Ok(decode_instruments(&table))
    }
}
