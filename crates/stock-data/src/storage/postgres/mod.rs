//! PostgreSQL 저장소 구현.

mod bars;
mod instruments;
mod tasks;

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

use stock_core::DatabaseConfig;

use crate::error::{DataError, Result};

pub use bars::PgBarStore;
pub use instruments::PgInstrumentStore;
pub use tasks::PgTaskStore;

/// 데이터베이스 연결 풀 래퍼.
///
/// 풀은 모든 작업의 모든 작업 단위가 공유합니다.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "데이터베이스 연결 중"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.url)
            .await
            .map_err(|e| DataError::ConnectionError(e.to_string()))?;

        info!("데이터베이스 연결 완료");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// `migrations/` 디렉터리의 스키마 마이그레이션 실행.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DataError::MigrationError(e.to_string()))?;

        info!("마이그레이션 완료");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub fn bar_store(&self) -> PgBarStore {
        PgBarStore::new(self.pool.clone())
    }

    pub fn task_store(&self) -> PgTaskStore {
        PgTaskStore::new(self.pool.clone())
    }

    pub fn instrument_store(&self) -> PgInstrumentStore {
        PgInstrumentStore::new(self.pool.clone())
    }
}
