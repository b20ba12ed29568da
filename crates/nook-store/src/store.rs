//! The engine context: one per window.
//!
//! A [`Store`] owns the in-memory engine and the snapshot it was loaded from.
//! Writes apply to the engine synchronously, notify local subscribers, then
//! persist a fresh export and tell the other windows which table changed.
//! Reads go straight to the engine.
//!
//! Across windows the last persisted snapshot wins. Two windows writing at
//! the same time each store their own full export and the later `put`
//! silently replaces the earlier one.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::block_store::{BlockStore, FileBlockStore};
use crate::bus::{ChangeBus, ChangeEvent, ChangeKind, Subscription, Topic};
use crate::config::StoreConfig;
use crate::kv::{FileKvArea, KvArea};
use crate::queries::documents;
use crate::window::{Incoming, WindowChannel, WindowId, WindowMessage};
use crate::{codec, legacy, memory_engine, open_engine, seed, snapshot};
use crate::{EngineFactory, Result, StoreError, Table};

/// Lifecycle state of a [`Store`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// Constructed, `init()` not yet run.
    Uninitialized,
    Ready,
    /// The engine failed to load. Reads are empty and writes are dropped.
    Unavailable,
    Closed,
}

struct Engine {
    conn: Option<Connection>,
    /// Snapshot string the in-memory engine currently corresponds to.
    loaded: Option<String>,
    /// The last persist failed, so the block store is behind this window.
    dirty: bool,
    status: Status,
}

/// Engine context for one window.
pub struct Store {
    config: StoreConfig,
    window: WindowId,
    factory: EngineFactory,
    engine: Mutex<Engine>,
    blocks: Arc<dyn BlockStore>,
    kv: Arc<dyn KvArea>,
    bus: ChangeBus,
    channel: WindowChannel,
    /// Serializes export+put and pull+hydrate so a stale export can never
    /// land after a newer one from the same window.
    persist_lock: tokio::sync::Mutex<()>,
    unavailable_logged: AtomicBool,
    shutdown: broadcast::Sender<()>,
}

impl Store {
    /// Create an unloaded store. Call [`init`](Self::init) before use.
    pub fn new(
        config: StoreConfig,
        blocks: Arc<dyn BlockStore>,
        kv: Arc<dyn KvArea>,
        channel: WindowChannel,
    ) -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Self {
            config,
            window: WindowId::random(),
            factory: memory_engine,
            engine: Mutex::new(Engine {
                conn: None,
                loaded: None,
                dirty: false,
                status: Status::Uninitialized,
            }),
            blocks,
            kv,
            bus: ChangeBus::new(),
            channel,
            persist_lock: tokio::sync::Mutex::new(()),
            unavailable_logged: AtomicBool::new(false),
            shutdown,
        }
    }

    /// File-backed store for the profile directory named by `config`.
    pub fn for_profile(config: StoreConfig, channel: WindowChannel) -> Result<Self> {
        let dir = config.data_dir();
        let blocks = FileBlockStore::new(&dir, &config.snapshot_key)?;
        let kv = FileKvArea::open(dir.join("kv"), config.kv_quota_bytes)?;
        Ok(Self::new(config, Arc::new(blocks), Arc::new(kv), channel))
    }

    /// Replace the engine loader.
    pub fn with_engine_factory(mut self, factory: EngineFactory) -> Self {
        self.factory = factory;
        self
    }

    pub fn window_id(&self) -> WindowId {
        self.window
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn status(&self) -> Status {
        self.lock_engine().status
    }

    pub(crate) fn kv(&self) -> &dyn KvArea {
        self.kv.as_ref()
    }

    // ------------------------------------------------------------------
    // Bootstrap
    // ------------------------------------------------------------------

    /// Load the engine, migrate the legacy snapshot, restore the stored
    /// snapshot (or keep a fresh schema) and seed fixtures into an empty
    /// engine. Safe to call again; later calls only pick up a changed
    /// snapshot.
    pub async fn init(&self) {
        {
            let mut engine = self.lock_engine();
            if engine.conn.is_none() {
                match open_engine(self.factory) {
                    Ok(conn) => {
                        engine.conn = Some(conn);
                        engine.loaded = None;
                        engine.dirty = false;
                    }
                    Err(e) => {
                        engine.status = Status::Unavailable;
                        drop(engine);
                        self.report_unavailable(&e);
                        return;
                    }
                }
            }
        }

        if let Err(e) =
            legacy::migrate(self.kv.as_ref(), self.blocks.as_ref(), &self.config.legacy_key).await
        {
            warn!(window = %self.window, "legacy snapshot migration failed: {e}");
        }

        let stored = match self.blocks.get_snapshot().await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(window = %self.window, "could not read stored snapshot: {e}");
                None
            }
        };

        let mut seeded = false;
        {
            let mut guard = self.lock_engine();
            let engine = &mut *guard;

            if let Some(blob) = stored {
                if engine.loaded.as_deref() != Some(blob.as_str()) {
                    match snapshot::hydrate_blob(self.factory, &blob) {
                        Ok(conn) => {
                            engine.conn = Some(conn);
                            engine.loaded = Some(blob);
                            engine.dirty = false;
                            debug!(window = %self.window, "restored stored snapshot");
                        }
                        Err(e) => {
                            error!(window = %self.window, "stored snapshot unusable, keeping fresh schema: {e}");
                        }
                    }
                }
            }

            if self.config.seed_fixtures {
                if let Some(conn) = engine.conn.as_ref() {
                    match seed::seed(conn) {
                        Ok(did_seed) => seeded = did_seed,
                        Err(e) => warn!(window = %self.window, "seeding failed: {e}"),
                    }
                }
            }

            engine.status = Status::Ready;
        }

        if seeded {
            self.bus.notify(&ChangeEvent::full_reload());
            self.persist(Table::Users).await;
        }

        info!(window = %self.window, "store ready");
    }

    /// Drop the engine and stop the background reconciler.
    pub fn close(&self) {
        let mut engine = self.lock_engine();
        engine.conn = None;
        engine.loaded = None;
        engine.status = Status::Closed;
        drop(engine);
        // No receivers just means no reconciler was spawned.
        let _ = self.shutdown.send(());
        debug!(window = %self.window, "store closed");
    }

    fn report_unavailable(&self, err: &StoreError) {
        if !self.unavailable_logged.swap(true, Ordering::SeqCst) {
            error!(window = %self.window, "engine failed to load, running without a store: {err}");
        }
    }

    // ------------------------------------------------------------------
    // Relational core
    // ------------------------------------------------------------------

    /// Upsert `document` under `key`.
    ///
    /// The row is written and local subscribers are notified before this
    /// returns; the returned future persists the snapshot and notifies the
    /// other windows.
    pub fn set<T: Serialize + ?Sized>(
        &self,
        table: Table,
        key: &str,
        document: &T,
        timestamp: Option<i64>,
    ) -> impl Future<Output = ()> + Send + '_ {
        let applied = self.apply(table, ChangeKind::Upsert, |conn| {
            documents::upsert(conn, table, key, document, timestamp)
        });
        self.persist_if(applied, table)
    }

    /// Remove the row under `key`. Same write path as [`set`](Self::set).
    pub fn delete(&self, table: Table, key: &str) -> impl Future<Output = ()> + Send + '_ {
        let applied = self.apply(table, ChangeKind::Delete, |conn| {
            documents::delete(conn, table, key).map(|_| ())
        });
        self.persist_if(applied, table)
    }

    /// Point lookup. Absent on any failure.
    pub fn get<T: DeserializeOwned>(&self, table: Table, key: &str) -> Option<T> {
        self.read(table, |conn| documents::get(conn, table, key))
            .flatten()
    }

    /// Full scan, capped at `limit` rows when `limit > 0`.
    pub fn get_all<T: DeserializeOwned>(&self, table: Table, limit: i64) -> Vec<T> {
        self.read(table, |conn| documents::get_all(conn, table, limit))
            .unwrap_or_default()
    }

    /// Newest-first page of a timestamped table; rows strictly older than
    /// `cursor` when one is given.
    pub fn get_cursor_paginated<T: DeserializeOwned>(
        &self,
        table: Table,
        limit: i64,
        cursor: Option<i64>,
    ) -> Vec<T> {
        self.read(table, |conn| documents::page(conn, table, limit, cursor))
            .unwrap_or_default()
    }

    pub fn exists(&self, table: Table, key: &str) -> bool {
        self.read(table, |conn| documents::exists(conn, table, key))
            .unwrap_or(false)
    }

    pub fn count(&self, table: Table) -> i64 {
        self.read(table, |conn| documents::count(conn, table))
            .unwrap_or(0)
    }

    /// Register a change callback. See [`ChangeBus::subscribe`].
    pub fn subscribe(
        &self,
        topic: impl Into<Topic>,
        callback: impl Fn(&ChangeEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.bus.subscribe(topic, callback)
    }

    /// Fresh export of the in-memory engine.
    pub fn export_snapshot(&self) -> Option<String> {
        let engine = self.lock_engine();
        let conn = engine.conn.as_ref()?;
        snapshot::export_blob(conn)
            .map_err(|e| warn!(window = %self.window, "export failed: {e}"))
            .ok()
    }

    /// Run a read against the engine, logging and swallowing failures.
    pub(crate) fn read<T>(
        &self,
        table: Table,
        query: impl FnOnce(&Connection) -> Result<T>,
    ) -> Option<T> {
        let engine = self.lock_engine();
        let Some(conn) = engine.conn.as_ref() else {
            debug!(table = %table, status = ?engine.status, "read skipped, no engine");
            return None;
        };
        match query(conn) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(table = %table, "query failed: {e}");
                None
            }
        }
    }

    /// Run an arbitrary write with the standard persist-and-notify path.
    pub(crate) fn write_with<F>(
        &self,
        table: Table,
        kind: ChangeKind,
        write: F,
    ) -> impl Future<Output = ()> + Send + '_
    where
        F: FnOnce(&Connection) -> Result<()>,
    {
        let applied = self.apply(table, kind, write);
        self.persist_if(applied, table)
    }

    /// Apply a write to the engine and notify local subscribers.
    fn apply<F>(&self, table: Table, kind: ChangeKind, write: F) -> bool
    where
        F: FnOnce(&Connection) -> Result<()>,
    {
        let result = {
            let engine = self.lock_engine();
            match engine.conn.as_ref() {
                Some(conn) => write(conn),
                None => {
                    debug!(table = %table, status = ?engine.status, "write dropped, no engine");
                    return false;
                }
            }
        };

        match result {
            Ok(()) => {
                self.bus.notify(&ChangeEvent::table(table, kind));
                true
            }
            Err(e) => {
                warn!(table = %table, "write failed: {e}");
                false
            }
        }
    }

    async fn persist_if(&self, applied: bool, table: Table) {
        if applied {
            self.persist(table).await;
        }
    }

    /// Export the engine, store it and announce the change.
    async fn persist(&self, table: Table) {
        let _serial = self.persist_lock.lock().await;

        let blob = {
            let mut guard = self.lock_engine();
            let engine = &mut *guard;
            let Some(conn) = engine.conn.as_ref() else {
                return;
            };
            let blob = match snapshot::export_blob(conn) {
                Ok(blob) => blob,
                Err(e) => {
                    error!(table = %table, "snapshot export failed: {e}");
                    return;
                }
            };
            if !engine.dirty && engine.loaded.as_deref() == Some(blob.as_str()) {
                debug!(table = %table, "snapshot unchanged, nothing to persist");
                return;
            }
            engine.loaded = Some(blob.clone());
            blob
        };

        match self.blocks.put_snapshot(blob).await {
            Ok(()) => {
                self.lock_engine().dirty = false;
                let reached = self
                    .channel
                    .post(self.window, WindowMessage::DbUpdate { table });
                debug!(table = %table, reached, "snapshot persisted");
            }
            Err(e) => {
                self.lock_engine().dirty = true;
                warn!(table = %table, "persist failed, keeping in-memory state: {e}");
            }
        }
    }

    // ------------------------------------------------------------------
    // Reconciliation
    // ------------------------------------------------------------------

    /// Re-read the block store and reload if another window stored a
    /// different snapshot. Returns whether the engine was replaced.
    ///
    /// Unpersisted local changes are kept: a window whose last persist
    /// failed does not reload on refresh.
    pub async fn refresh(&self) -> bool {
        self.pull(None, false).await
    }

    /// Handle a `DB_UPDATE` for `table` from another window.
    pub async fn reconcile(&self, table: Table) -> bool {
        self.pull(Some(table), true).await
    }

    async fn pull(&self, hint: Option<Table>, from_peer: bool) -> bool {
        let _serial = self.persist_lock.lock().await;

        let stored = match self.blocks.get_snapshot().await {
            Ok(Some(blob)) => blob,
            Ok(None) => return false,
            Err(e) => {
                warn!(window = %self.window, "reconcile read failed: {e}");
                return false;
            }
        };

        let reloaded = {
            let mut guard = self.lock_engine();
            let engine = &mut *guard;
            if engine.conn.is_none() || engine.loaded.as_deref() == Some(stored.as_str()) {
                return false;
            }
            if engine.dirty && !from_peer {
                debug!(window = %self.window, "unpersisted local changes, skipping refresh");
                return false;
            }
            let current = engine.conn.as_ref().map(snapshot::export);
            let incoming = codec::decode(&stored)
                .and_then(|image| snapshot::hydrate(self.factory, &image).map(|conn| (image, conn)));
            match incoming {
                Ok((image, conn)) => {
                    let changed = match current {
                        Some(Ok(before)) => Some(snapshot::changed_tables(&before, &image)),
                        _ => None,
                    };
                    engine.conn = Some(conn);
                    engine.loaded = Some(stored);
                    engine.dirty = false;
                    Some(changed)
                }
                Err(e) => {
                    error!(window = %self.window, "reconcile failed, keeping current state: {e}");
                    None
                }
            }
        };

        let Some(changed) = reloaded else {
            return false;
        };
        debug!(window = %self.window, table = ?hint, "reloaded snapshot from block store");
        match (hint, changed) {
            // The stored snapshot may differ from ours in more tables than
            // the peer named.
            (Some(table), Some(changed)) => {
                let tables = if changed.is_empty() { vec![table] } else { changed };
                for table in tables {
                    self.bus.notify(&ChangeEvent::table(table, ChangeKind::Reload));
                }
            }
            _ => self.bus.notify(&ChangeEvent::full_reload()),
        }
        true
    }

    /// Spawn the background task that reacts to other windows' writes and
    /// periodically refreshes. Stops on [`close`](Self::close).
    pub fn spawn_reconciler(self: &Arc<Self>) -> JoinHandle<()> {
        let store = Arc::clone(self);
        let mut listener = self.channel.listen(self.window);
        let mut shutdown = self.shutdown.subscribe();
        let mut ticker = periodic(self.config.reconcile_interval_secs);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    incoming = listener.recv() => match incoming {
                        Some(Incoming::Message(WindowMessage::DbUpdate { table })) => {
                            store.reconcile(table).await;
                        }
                        Some(Incoming::Lagged(missed)) => {
                            debug!(window = %store.window, missed, "window channel lagged");
                            store.pull(None, true).await;
                        }
                        None => break,
                    },
                    _ = next_tick(&mut ticker) => {
                        store.refresh().await;
                    }
                    _ = shutdown.recv() => break,
                }
            }
            debug!(window = %store.window, "reconciler stopped");
        })
    }

    fn lock_engine(&self) -> MutexGuard<'_, Engine> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("window", &self.window)
            .field("status", &self.status())
            .field("bus", &self.bus)
            .finish()
    }
}

fn periodic(secs: u64) -> Option<Interval> {
    (secs > 0).then(|| {
        let period = Duration::from_secs(secs);
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval
    })
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
