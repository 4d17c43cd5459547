//! 종목 기본 정보 테이블 (`stock_basic`).

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use tracing::instrument;

use stock_core::{Instrument, LIST_STATUS_LISTED};

use crate::error::{DataError, Result};
use crate::storage::InstrumentStore;

#[derive(Debug, Clone, FromRow)]
struct InstrumentRow {
    ts_code: String,
    symbol: Option<String>,
    name: Option<String>,
    area: Option<String>,
    industry: Option<String>,
    market: Option<String>,
    list_date: Option<String>,
    list_status: Option<String>,
}

impl From<InstrumentRow> for Instrument {
    fn from(row: InstrumentRow) -> Self {
        Instrument {
            ts_code: row.ts_code,
            symbol: row.symbol.unwrap_or_default(),
            name: row.name.unwrap_or_default(),
            area: row.area.unwrap_or_default(),
            industry: row.industry.unwrap_or_default(),
            market: row.market.unwrap_or_default(),
            list_date: row.list_date.unwrap_or_default(),
            list_status: row.list_status.unwrap_or_default(),
        }
    }
}

#[derive(Clone)]
pub struct PgInstrumentStore {
    pool: PgPool,
}

impl PgInstrumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InstrumentStore for PgInstrumentStore {
    #[instrument(skip(self, instruments), fields(count = instruments.len()))]
    async fn upsert(&self, instruments: &[Instrument]) -> Result<u64> {
        if instruments.is_empty() {
            return Ok(0);
        }

        let col = |f: fn(&Instrument) -> &String| -> Vec<String> {
            instruments.iter().map(|i| f(i).clone()).collect()
        };

        let result = sqlx::query(
            r#"
            INSERT INTO stock_basic
                (ts_code, symbol, name, area, industry, market, list_date, list_status)
            SELECT * FROM UNNEST(
                $1::text[], $2::text[], $3::text[], $4::text[],
                $5::text[], $6::text[], $7::text[], $8::text[]
            )
            ON CONFLICT (ts_code) DO UPDATE SET
                symbol = EXCLUDED.symbol,
                name = EXCLUDED.name,
                area = EXCLUDED.area,
                industry = EXCLUDED.industry,
                market = EXCLUDED.market,
                list_date = EXCLUDED.list_date,
                list_status = EXCLUDED.list_status,
                updated_at = NOW()
            "#,
        )
        .bind(col(|i| &i.ts_code))
        .bind(col(|i| &i.symbol))
        .bind(col(|i| &i.name))
        .bind(col(|i| &i.area))
        .bind(col(|i| &i.industry))
        .bind(col(|i| &i.market))
        .bind(col(|i| &i.list_date))
        .bind(col(|i| &i.list_status))
        .execute(&self.pool)
        .await
        .map_err(|e| DataError::InsertError(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn list_listed(&self) -> Result<Vec<Instrument>> {
        let rows: Vec<InstrumentRow> = sqlx::query_as(
            r#"
            SELECT ts_code, symbol, name, area, industry, market, list_date, list_status
            FROM stock_basic
            WHERE list_status = $1
            ORDER BY ts_code
            "#,
        )
        .bind(LIST_STATUS_LISTED)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Instrument::from).collect())
    }
}
