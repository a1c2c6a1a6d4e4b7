pub mod cache;
pub mod check;
pub mod config;
pub mod dbsync_api;
pub mod detector;
pub mod error;
pub mod fetcher;
pub mod message;
pub mod notifier;
#[cfg(test)]
mod test_support;

use cache::{CacheStore, FileCacheStore, ReadOnlyCache, RedisCacheStore};
use check::{CheckContext, CheckOutcome};
use config::{CacheBackend, Config, Delivery};
use dbsync_api::DbSyncClient;
use error::AppError;
use notifier::{DiscordWebhook, LogNotifier, Notifier};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Entry point for the binary: one check, then exit.
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    // single invocation, sequential calls
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(execute(&config)) {
        Ok(outcome) => {
            match serde_json::to_string(&outcome) {
                Ok(summary) => tracing::info!(%summary, "check finished"),
                Err(e) => tracing::warn!("Failed to encode run summary: {e}"),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "check failed");
            ExitCode::FAILURE
        }
    }
}

async fn execute(config: &Config) -> Result<CheckOutcome, AppError> {
    let source = DbSyncClient::new(config.api_url.as_str(), config.timeout);
    let store: Box<dyn CacheStore> = match &config.cache {
        CacheBackend::Redis(url) => {
            tracing::debug!(cache = %url.host_str().unwrap_or_default(), "using redis cache");
            Box::new(RedisCacheStore::new(url.as_str(), config.timeout)?)
        }
        CacheBackend::File(path) => {
            tracing::debug!(cache = %path.display(), "using file cache");
            Box::new(FileCacheStore::new(path))
        }
    };
    tracing::debug!(api = source.base_url(), "wired");

    let (cache, notifier): (Box<dyn CacheStore>, Box<dyn Notifier>) = match &config.delivery {
        Delivery::Webhook(url) => (
            store,
            Box::new(DiscordWebhook::new(url.as_str(), config.timeout)),
        ),
        // compare against the real cache but never write it back
        Delivery::DryRun => (Box::new(ReadOnlyCache::new(store)), Box::new(LogNotifier)),
    };

    let ctx = CheckContext {
        source: &source,
        cache: cache.as_ref(),
        notifier: notifier.as_ref(),
        pool_id: &config.pool_id,
    };
    check::run_check(&ctx).await
}
