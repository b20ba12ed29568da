//! One-shot move of a snapshot out of the legacy key/value area.
//!
//! Older clients kept the snapshot in the size-limited synchronous area. On
//! boot the blob is copied into the block store and the legacy key is
//! removed straight after, so the copy can only succeed once.

use tracing::{info, warn};

use crate::block_store::BlockStore;
use crate::kv::KvArea;
use crate::Result;

/// What a migration pass did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// No legacy snapshot present.
    NothingToMigrate,
    /// The legacy snapshot was copied into the block store and erased.
    Migrated { bytes: usize },
    /// The block store already held a snapshot; the stale legacy copy was
    /// erased without being copied.
    DiscardedStale,
}

/// Move the snapshot under `legacy_key` into `blocks`, if present.
///
/// Safe to call on every boot. If the copy fails the legacy key is kept so
/// the next boot can retry.
pub async fn migrate(
    legacy: &dyn KvArea,
    blocks: &dyn BlockStore,
    legacy_key: &str,
) -> Result<MigrationOutcome> {
    let Some(blob) = legacy.get(legacy_key)? else {
        return Ok(MigrationOutcome::NothingToMigrate);
    };

    if blocks.get_snapshot().await?.is_some() {
        warn!(key = legacy_key, "block store already holds a snapshot, dropping legacy copy");
        legacy.remove(legacy_key)?;
        return Ok(MigrationOutcome::DiscardedStale);
    }

    let bytes = blob.len();
    blocks.put_snapshot(blob).await?;
    legacy.remove(legacy_key)?;

    info!(key = legacy_key, bytes, "migrated legacy snapshot into block store");
    Ok(MigrationOutcome::Migrated { bytes })
}
