//! Fetch chain: epoch -> pool hashes -> slot leaders -> blocks.
//!
//! Every step is a sequential round trip against the [`DataSource`]; any
//! failure aborts the whole chain so a partial total is never reported.

use crate::dbsync_api::{DataSource, RowId};
use crate::error::AppError;
use tracing::debug;

/// Number of the last epoch in ascending id order
pub async fn latest_epoch_number(source: &dyn DataSource) -> Result<i64, AppError> {
    let epochs = source.epochs().await?;
    epochs
        .last()
        .map(|e| e.no)
        .ok_or_else(|| AppError::EmptyResult("epoch table returned no rows".into()))
}

/// Ids of every pool hash registered under `pool_identity`, in server order.
/// A pool with no hash rows yields an empty list.
pub async fn pool_hash_ids(
    source: &dyn DataSource,
    pool_identity: &str,
) -> Result<Vec<RowId>, AppError> {
    let hashes = source.pool_hashes(pool_identity).await?;
    Ok(hashes.into_iter().map(|h| h.id).collect())
}

pub async fn slot_leader_ids(
    source: &dyn DataSource,
    pool_hash_id: RowId,
) -> Result<Vec<RowId>, AppError> {
    let leaders = source.slot_leaders(pool_hash_id).await?;
    Ok(leaders.into_iter().map(|l| l.id).collect())
}

/// Blocks minted by one slot leader in `epoch_number`, counted client-side
pub async fn block_count(
    source: &dyn DataSource,
    epoch_number: i64,
    slot_leader_id: RowId,
) -> Result<i64, AppError> {
    let blocks = source.blocks(epoch_number, slot_leader_id).await?;
    Ok(blocks.len() as i64)
}

/// Resolve the latest epoch and sum the blocks of every slot leader of
/// every pool hash registered for `pool_identity`.
pub async fn total_blocks_for_pool_last_epoch(
    source: &dyn DataSource,
    pool_identity: &str,
) -> Result<(i64, i64), AppError> {
    let epoch = latest_epoch_number(source).await?;
    let hash_ids = pool_hash_ids(source, pool_identity).await?;
    debug!(epoch, pool = pool_identity, hashes = hash_ids.len(), "resolved pool hashes");

    let mut total = 0i64;
    for hash_id in hash_ids {
        for leader_id in slot_leader_ids(source, hash_id).await? {
            let count = block_count(source, epoch, leader_id).await?;
            debug!(hash_id, leader_id, count, "slot leader blocks");
            total += count;
        }
    }

    Ok((epoch, total))
}
