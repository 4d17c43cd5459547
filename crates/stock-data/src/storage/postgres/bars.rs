//! 시세 테이블 (`stock_daily`, `stock_weekly`, `stock_monthly`).

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use tracing::instrument;

use stock_core::{normalize_page, page_offset, Frequency};

use crate::error::{DataError, Result};
use crate::storage::records::{AdjustedRecord, DailyPage, DailyQuery, DailyRecord};
use crate::storage::BarStore;

#[derive(Clone)]
pub struct PgBarStore {
    pool: PgPool,
}

impl PgBarStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn column<T, R>(records: &[R], f: impl Fn(&R) -> T) -> Vec<T> {
    records.iter().map(f).collect()
}

fn adjusted_table(frequency: Frequency) -> Result<&'static str> {
    match frequency {
        Frequency::Weekly => Ok("stock_weekly"),
        Frequency::Monthly => Ok("stock_monthly"),
        Frequency::Daily => Err(DataError::InvalidData(
            "일봉은 수정주가 테이블에 저장할 수 없습니다".to_string(),
        )),
    }
}

#[async_trait]
impl BarStore for PgBarStore {
    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn insert_daily(&self, records: &[DailyRecord]) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        // UNNEST 일괄 삽입, 기존 행은 유지
        let result = sqlx::query(
            r#"
            INSERT INTO stock_daily
                (ts_code, trade_date, open, high, low, close, pre_close, change, pct_chg, vol, amount)
            SELECT * FROM UNNEST(
                $1::text[], $2::date[],
                $3::numeric[], $4::numeric[], $5::numeric[], $6::numeric[], $7::numeric[],
                $8::numeric[], $9::numeric[], $10::numeric[], $11::numeric[]
            )
            ON CONFLICT (ts_code, trade_date) DO NOTHING
            "#,
        )
        .bind(column(records, |r| r.ts_code.clone()))
        .bind(column(records, |r| r.trade_date))
        .bind(column(records, |r| r.open))
        .bind(column(records, |r| r.high))
        .bind(column(records, |r| r.low))
        .bind(column(records, |r| r.close))
        .bind(column(records, |r| r.pre_close))
        .bind(column(records, |r| r.change))
        .bind(column(records, |r| r.pct_chg))
        .bind(column(records, |r| r.vol))
        .bind(column(records, |r| r.amount))
        .execute(&self.pool)
        .await
        .map_err(|e| DataError::InsertError(e.to_string()))?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn insert_adjusted(
        &self,
        frequency: Frequency,
        records: &[AdjustedRecord],
    ) -> Result<u64> {
        let table = adjusted_table(frequency)?;
        if records.is_empty() {
            return Ok(0);
        }

        let sql = format!(
            r#"
            INSERT INTO {table}
                (ts_code, trade_date, end_date,
                 open, high, low, close, pre_close,
                 open_qfq, high_qfq, low_qfq, close_qfq,
                 open_hfq, high_hfq, low_hfq, close_hfq,
                 vol, amount, change, pct_chg)
            SELECT * FROM UNNEST(
                $1::text[], $2::date[], $3::date[],
                $4::numeric[], $5::numeric[], $6::numeric[], $7::numeric[], $8::numeric[],
                $9::numeric[], $10::numeric[], $11::numeric[], $12::numeric[],
                $13::numeric[], $14::numeric[], $15::numeric[], $16::numeric[],
                $17::numeric[], $18::numeric[], $19::numeric[], $20::numeric[]
            )
            ON CONFLICT (ts_code, trade_date) DO NOTHING
            "#
        );

        let result = sqlx::query(&sql)
            .bind(column(records, |r| r.ts_code.clone()))
            .bind(column(records, |r| r.trade_date))
            .bind(column(records, |r| r.end_date))
            .bind(column(records, |r| r.open))
            .bind(column(records, |r| r.high))
            .bind(column(records, |r| r.low))
            .bind(column(records, |r| r.close))
            .bind(column(records, |r| r.pre_close))
            .bind(column(records, |r| r.open_qfq))
            .bind(column(records, |r| r.high_qfq))
            .bind(column(records, |r| r.low_qfq))
            .bind(column(records, |r| r.close_qfq))
            .bind(column(records, |r| r.open_hfq))
            .bind(column(records, |r| r.high_hfq))
            .bind(column(records, |r| r.low_hfq))
            .bind(column(records, |r| r.close_hfq))
            .bind(column(records, |r| r.vol))
            .bind(column(records, |r| r.amount))
            .bind(column(records, |r| r.change))
            .bind(column(records, |r| r.pct_chg))
            .execute(&self.pool)
            .await
            .map_err(|e| DataError::InsertError(e.to_string()))?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn query_daily(&self, query: &DailyQuery) -> Result<DailyPage> {
        let (page, page_size) = normalize_page(query.page, query.page_size);
        let offset = i64::try_from(page_offset(page, page_size)).unwrap_or(i64::MAX);

        let list: Vec<DailyRecord> = sqlx::query_as(
            r#"
            SELECT ts_code, trade_date, open, high, low, close, pre_close, change, pct_chg, vol, amount
            FROM stock_daily
            WHERE ($1::text IS NULL OR ts_code = $1)
                AND ($2::date IS NULL OR trade_date = $2)
                AND ($3::date IS NULL OR trade_date >= $3)
                AND ($4::date IS NULL OR trade_date <= $4)
            ORDER BY trade_date DESC, ts_code
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(&query.ts_code)
        .bind(query.trade_date)
        .bind(query.start_date)
        .bind(query.end_date)
        .bind(i64::from(page_size))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM stock_daily
            WHERE ($1::text IS NULL OR ts_code = $1)
                AND ($2::date IS NULL OR trade_date = $2)
                AND ($3::date IS NULL OR trade_date >= $3)
                AND ($4::date IS NULL OR trade_date <= $4)
            "#,
        )
        .bind(&query.ts_code)
        .bind(query.trade_date)
        .bind(query.start_date)
        .bind(query.end_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(DailyPage {
            list,
            total,
            page,
            page_size,
        })
    }
}

