use crate::cache::FileCacheStore;
use crate::error::AppError;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_POOL_ID: &str = "pool10eltx2wej46e62ulmwzm35xfu0azu47yvpjper7gwhncqe74vg6";

/// Report blocks minted by a stake pool in the current epoch to a chat webhook
#[derive(Debug, Clone, Parser)]
#[command(name = "pool-block-notifier", version, long_about = None)]
pub struct Cli {
    /// Base URL of the REST gateway over the chain indexer
    #[arg(long, env = "DBSYNC_API_URL", default_value = "http://api:3000")]
    pub api_url: Url,

    /// Bech32 pool id to report on
    #[arg(long, env = "POOL_ID", default_value = DEFAULT_POOL_ID)]
    pub pool_id: String,

    /// Chat webhook receiving the notification
    #[arg(long, env = "DISCORD_REPORT_EPOCH_WEBHOOK_URL", hide_env_values = true)]
    pub webhook_url: Option<Url>,

    /// Redis holding the last reported count, e.g. redis://redis:6379
    #[arg(long, env = "CACHE_URL")]
    pub cache_url: Option<Url>,

    /// File holding the last reported count when no cache URL is set
    #[arg(long, env = "NOTIFIER_CACHE_PATH")]
    pub cache_path: Option<PathBuf>,

    /// Per-request HTTP timeout
    #[arg(long, env = "NOTIFIER_HTTP_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Compute and log the message without writing the cache or calling the webhook
    #[arg(long)]
    pub dry_run: bool,
}

/// Where the notification goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Webhook(Url),
    DryRun,
}

/// Where the last reported count lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheBackend {
    Redis(Url),
    File(PathBuf),
}

/// Everything one invocation needs, resolved from flags and environment
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: Url,
    pub pool_id: String,
    pub delivery: Delivery,
    pub cache: CacheBackend,
    pub timeout: Duration,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self, AppError> {
        let pool_id = cli.pool_id.trim().to_string();
        if pool_id.is_empty() {
            return Err(AppError::Config("pool id must not be empty".into()));
        }

        let delivery = match (cli.dry_run, cli.webhook_url) {
            (true, _) => Delivery::DryRun,
            (false, Some(url)) => Delivery::Webhook(url),
            (false, None) => {
                return Err(AppError::Config(
                    "DISCORD_REPORT_EPOCH_WEBHOOK_URL is not set (use --dry-run to skip delivery)"
                        .into(),
                ))
            }
        };

        let cache = match (cli.cache_url, cli.cache_path) {
            (Some(url), _) => CacheBackend::Redis(url),
            (None, Some(path)) => CacheBackend::File(path),
            (None, None) => CacheBackend::File(FileCacheStore::default_path()?),
        };

        if cli.timeout_secs == 0 {
            return Err(AppError::Config("timeout must be at least one second".into()));
        }

        Ok(Self {
            api_url: cli.api_url,
            pool_id,
            delivery,
            cache,
            timeout: Duration::from_secs(cli.timeout_secs),
        })
    }

    /// Load `.env` if present, then parse flags and environment
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_cli(Cli::parse())
    }
}
