//! 시세 데이터 수집기 CLI.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use stock_collector::{EngineSettings, FetchEngine, FetchJob};
use stock_core::{
    init_logging, parse_yyyymmdd, AppConfig, FetchTask, Frequency, LogConfig, DEFAULT_CONFIG_PATH,
};
use stock_data::storage::DailyQuery;
use stock_data::{
    BarStore, Database, InstrumentStore, MemoryBarStore, MemoryInstrumentStore, MemoryTaskStore,
    TaskStore, TushareClient,
};

/// 진행률 조회 주기
const POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(name = "stock-collector")]
#[command(about = "A-share stock data collector", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 설정 파일 경로
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// 로그 레벨 (trace, debug, info, warn, error). 설정 파일보다 우선
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// 데이터베이스 대신 인메모리 저장소 사용
    #[arg(long, global = true)]
    in_memory: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// 스키마 마이그레이션 실행
    Migrate,

    /// 기간 시세 수집 (일봉/주봉/월봉)
    Fetch {
        /// 주기 (daily, weekly, monthly)
        #[arg(long, default_value = "daily")]
        freq: Frequency,
        /// 시작일 (YYYYMMDD). 없으면 설정의 fetcher.start_date
        #[arg(long)]
        start: Option<String>,
        /// 종료일 (YYYYMMDD). 없으면 설정의 fetcher.end_date
        #[arg(long)]
        end: Option<String>,
        /// 동시 실행 작업 단위 수
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// 종목별 일봉 수집 (상장 종목 × 거래일)
    FetchInstruments {
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// 상장 종목 기본 정보 동기화
    SyncStockBasic,

    /// 작업 진행 상황 조회
    Progress {
        task_id: String,
    },

    /// 작업 목록
    Tasks {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },

    /// 저장된 일봉 조회
    Bars {
        #[arg(long)]
        ts_code: Option<String>,
        #[arg(long)]
        trade_date: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },
}

/// 선택된 저장소 구현.
struct Stores {
    bars: Arc<dyn BarStore>,
    tasks: Arc<dyn TaskStore>,
    instruments: Arc<dyn InstrumentStore>,
    database: Option<Database>,
}

impl Stores {
    async fn open(config: &AppConfig, in_memory: bool) -> anyhow::Result<Self> {
        if in_memory {
            tracing::warn!("인메모리 저장소 사용, 종료 시 데이터가 사라집니다");
            return Ok(Self {
                bars: Arc::new(MemoryBarStore::new()),
                tasks: Arc::new(MemoryTaskStore::new()),
                instruments: Arc::new(MemoryInstrumentStore::new()),
                database: None,
            });
        }

        if config.database.url.is_empty() {
            bail!("database.url이 비어 있습니다 (STOCK__DATABASE__URL)");
        }
        let database = Database::connect(&config.database).await?;
        Ok(Self {
            bars: Arc::new(database.bar_store()),
            tasks: Arc::new(database.task_store()),
            instruments: Arc::new(database.instrument_store()),
            database: Some(database),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("설정 로드 실패: {}", cli.config.display()))?;

    let mut log_config = LogConfig::from_settings(&config.logging);
    if let Some(level) = &cli.log_level {
        log_config.level = level.clone();
    }
    if let Ok(format) = std::env::var("LOG_FORMAT") {
        log_config.format = format.parse().unwrap_or_default();
    }
    init_logging(log_config)?;

    tracing::info!("Stock Data Collector 시작");

    let stores = Stores::open(&config, cli.in_memory).await?;

    if let Commands::Migrate = cli.command {
        match &stores.database {
            Some(database) => database.migrate().await?,
            None => tracing::warn!("인메모리 저장소는 마이그레이션이 필요 없습니다"),
        }
        return Ok(());
    }

    let provider = Arc::new(TushareClient::new(&config.tushare)?);
    let engine = FetchEngine::new(
        provider,
        stores.bars.clone(),
        stores.tasks.clone(),
        stores.instruments.clone(),
        EngineSettings::from(&config.fetcher),
    );

    match cli.command {
        Commands::Migrate => {}
        Commands::Fetch {
            freq,
            start,
            end,
            concurrency,
        } => {
            let (start, end) = date_range(&config, start, end)?;
            let job = engine.spawn_fetch(freq, &start, &end, concurrency).await?;
            let task = follow_job(&engine, job).await?;
            print_json(&task)?;
        }
        Commands::FetchInstruments {
            start,
            end,
            concurrency,
        } => {
            let (start, end) = date_range(&config, start, end)?;
            let job = engine
                .start_instrument_fetch(&start, &end, concurrency)
                .await?;
            let task = follow_job(&engine, job).await?;
            print_json(&task)?;
        }
        Commands::SyncStockBasic => {
            let saved = engine.fetch_stock_basic().await?;
            print_json(&serde_json::json!({ "saved": saved }))?;
        }
        Commands::Progress { task_id } => {
            let task = engine.get_progress(&task_id).await?;
            print_json(&task)?;
        }
        Commands::Tasks { page, page_size } => {
            let tasks = engine.list_tasks(page, page_size).await?;
            print_json(&tasks)?;
        }
        Commands::Bars {
            ts_code,
            trade_date,
            start,
            end,
            page,
            page_size,
        } => {
            let query = DailyQuery {
                ts_code,
                trade_date: optional_date(trade_date)?,
                start_date: optional_date(start)?,
                end_date: optional_date(end)?,
                page,
                page_size,
            };
            let bars = engine.query_daily(&query).await?;
            print_json(&bars)?;
        }
    }

    if let Some(database) = stores.database {
        database.pool().close().await;
    }
    tracing::info!("Stock Data Collector 종료");

    Ok(())
}

/// 명령행 인자, 없으면 설정 기본값.
fn date_range(
    config: &AppConfig,
    start: Option<String>,
    end: Option<String>,
) -> anyhow::Result<(String, String)> {
    let start = start
        .or_else(|| config.fetcher.start_date.clone())
        .context("시작일이 필요합니다 (--start 또는 fetcher.start_date)")?;
    let end = end
        .or_else(|| config.fetcher.end_date.clone())
        .context("종료일이 필요합니다 (--end 또는 fetcher.end_date)")?;
    Ok((start, end))
}

fn optional_date(value: Option<String>) -> anyhow::Result<Option<chrono::NaiveDate>> {
    value
        .map(|v| parse_yyyymmdd(&v).with_context(|| format!("잘못된 날짜: {v}")))
        .transpose()
}

/// 작업이 끝날 때까지 진행률을 출력합니다. Ctrl-C는 새 작업 단위 진입을 멈춥니다.
async fn follow_job(engine: &FetchEngine, job: FetchJob) -> anyhow::Result<FetchTask> {
    let task_id = job.task_id.clone();
    let cancel = job.cancellation_token();
    tracing::info!(task_id = %task_id, "수집 작업 시작");

    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    let mut interrupted = false;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                tracing::warn!(task_id = %task_id, "종료 신호 수신, 진행 중인 작업 단위만 마무리합니다");
                cancel.cancel();
                interrupted = true;
            }
            _ = ticker.tick() => {
                let task = engine.get_progress(&task_id).await?;
                tracing::info!(
                    task_id = %task_id,
                    status = %task.status,
                    progress = task.progress,
                    success = task.success_count,
                    failed = task.failed_count,
                    total = task.total_count,
                    "진행 상황"
                );
                if task.status.is_terminal() {
                    break;
                }
            }
        }
    }

    job.wait().await;
    Ok(engine.get_progress(&task_id).await?)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
