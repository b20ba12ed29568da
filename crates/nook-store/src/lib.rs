//! # nook-store
//!
//! Offline data engine for the nook client.
//!
//! A single in-memory SQLite engine per window, persisted as one snapshot blob
//! in a durable [`BlockStore`](block_store::BlockStore) and kept consistent
//! across sibling windows by an invalidate-then-pull protocol over a
//! [`WindowChannel`](window::WindowChannel).
//!
//! ## Write path
//!
//! Table facade → relational core → local subscribers → snapshot export →
//! block store → `DB_UPDATE` broadcast to the other windows.
//!
//! ## Read path
//!
//! Table facade → relational core. Reads never touch the block store.
//!
//! Nothing on the public [`Store`] surface returns an error: reads degrade to
//! empty results and failed writes are logged.

pub mod block_store;
pub mod bus;
pub mod codec;
pub mod config;
pub mod kv;
pub mod legacy;
pub mod migrations;
pub mod queries;
pub mod schema;
pub mod seed;
pub mod snapshot;
pub mod store;
pub mod sync;
pub mod tables;
pub mod window;

use rusqlite::Connection;

pub use block_store::{BlockStore, FileBlockStore, MemoryBlockStore};
pub use bus::{ChangeEvent, ChangeKind, Subscription, Topic};
pub use config::StoreConfig;
pub use kv::{FileKvArea, KvArea, MemoryKvArea};
pub use schema::Table;
pub use store::{Status, Store};
pub use window::{WindowChannel, WindowId, WindowMessage};

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Loads a blank engine instance. Swappable so a failing engine module can be
/// simulated.
pub type EngineFactory = fn() -> rusqlite::Result<Connection>;

/// Store error types.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("snapshot codec error: {0}")]
    Codec(String),

    #[error("block store error: {0}")]
    BlockStore(String),

    #[error("value for '{key}' is {size} bytes, quota is {quota}")]
    QuotaExceeded { key: String, size: usize, quota: usize },

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("store unavailable")]
    Unavailable,

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// The default engine loader: a private in-memory SQLite database.
pub fn memory_engine() -> rusqlite::Result<Connection> {
    Connection::open_in_memory()
}

/// Open a blank engine through `factory` and bring its schema up to date.
pub fn open_engine(factory: EngineFactory) -> Result<Connection> {
    let conn = factory()?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Open an in-memory engine with the current schema (for testing).
pub fn open_memory() -> Result<Connection> {
    open_engine(memory_engine)
}

/// Configure SQLite pragmas.
fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA temp_store = MEMORY;",
    )?;
    Ok(())
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
