//! One notifier invocation.
//!
//! Ordering: epoch lookup, pool hash lookup, slot leaders, block counts,
//! cache read, conditional cache write, compose, deliver. The cache is
//! written before delivery, so a failed delivery still records the count
//! and the next run with the same count stays silent.

use crate::cache::CacheStore;
use crate::dbsync_api::DataSource;
use crate::detector::ChangeDetector;
use crate::error::AppError;
use crate::fetcher;
use crate::message;
use crate::notifier::Notifier;
use serde::Serialize;
use tracing::info;

/// What a single run observed and did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    pub epoch: i64,
    pub count: i64,
    pub previous: Option<i64>,
    /// Set only when a notification was delivered
    pub message: Option<String>,
}

impl CheckOutcome {
    pub fn notified(&self) -> bool {
        self.message.is_some()
    }
}

/// Capabilities a run is wired with
pub struct CheckContext<'a> {
    pub source: &'a dyn DataSource,
    pub cache: &'a dyn CacheStore,
    pub notifier: &'a dyn Notifier,
    pub pool_id: &'a str,
}

pub async fn run_check(ctx: &CheckContext<'_>) -> Result<CheckOutcome, AppError> {
    let (epoch, count) = fetcher::total_blocks_for_pool_last_epoch(ctx.source, ctx.pool_id).await?;
    info!(epoch, count, pool = ctx.pool_id, "fetched block count");

    let change = ChangeDetector::new(ctx.cache).check(count)?;
    if !change.changed {
        info!(epoch, count, "block count unchanged, nothing to send");
        return Ok(CheckOutcome {
            epoch,
            count,
            previous: change.previous,
            message: None,
        });
    }

    let text = message::compose(epoch, count);
    info!(epoch, count, cached = ?change.previous, message = %text, "block count changed");

    ctx.notifier.notify(&text).await?;

    Ok(CheckOutcome {
        epoch,
        count,
        previous: change.previous,
        message: Some(text),
    })
}
