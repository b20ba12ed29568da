//! Integration tests for the nook offline store.
//!
//! Holds the fixtures the tests under `tests/` share: one browsing profile
//! (block store, KV area and window channel) that several windows can open.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p nook-integration-tests
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use nook_store::{MemoryBlockStore, MemoryKvArea, Store, StoreConfig, WindowChannel};

/// How long a test waits for a background reconcile.
pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Config with seeding and periodic reconcile off, so tests control both.
pub fn quiet_config() -> StoreConfig {
    StoreConfig {
        seed_fixtures: false,
        reconcile_interval_secs: 0,
        ..StoreConfig::default()
    }
}

/// Shared backends of one profile.
#[derive(Clone, Default)]
pub struct Profile {
    pub blocks: MemoryBlockStore,
    pub kv: MemoryKvArea,
    pub channel: WindowChannel,
}

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new, not yet initialized window on this profile.
    pub fn window(&self, config: StoreConfig) -> Store {
        Store::new(
            config,
            Arc::new(self.blocks.clone()),
            Arc::new(self.kv.clone()),
            self.channel.clone(),
        )
    }

    /// An initialized window with seeding off.
    pub async fn open(&self) -> Store {
        let store = self.window(quiet_config());
        store.init().await;
        store
    }
}

/// Await `fut` for at most [`SETTLE_TIMEOUT`].
pub async fn settle<T>(fut: impl Future<Output = T>) -> Result<T, tokio::time::error::Elapsed> {
    tokio::time::timeout(SETTLE_TIMEOUT, fut).await
}
