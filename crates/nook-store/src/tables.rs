//! Typed table facades.
//!
//! Each facade borrows the [`Store`] and maps domain method names onto the
//! relational core. Facades hold no state of their own.

pub mod chats;
pub mod commerce;
pub mod groups;
pub mod notifications;
pub mod posts;
pub mod profile;
pub mod relationships;
pub mod session;
pub mod users;
pub mod vip;

use std::marker::PhantomData;

use nook_types::{Ad, Chat, Group, Listing, Notification, Post, Relationship, User, VipAccess};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{Store, Table};

pub use chats::Chats;
pub use commerce::{Ads, Marketplace};
pub use groups::Groups;
pub use notifications::Notifications;
pub use posts::Posts;
pub use profile::{Permissions, Profiles};
pub use relationships::Relationships;
pub use session::Sessions;
pub use users::Users;
pub use vip::VipGrants;

/// A document type stored in one table.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    const TABLE: Table;

    /// Primary key value.
    fn key(&self) -> String;

    /// Value mirrored into the `timestamp` column, for tables that have one.
    fn timestamp(&self) -> Option<i64> {
        None
    }
}

/// Typed view of one document table.
pub struct Repository<'a, R> {
    store: &'a Store,
    _record: PhantomData<fn() -> R>,
}

impl<'a, R: Record> Repository<'a, R> {
    pub fn new(store: &'a Store) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    pub fn store(&self) -> &'a Store {
        self.store
    }

    pub fn get(&self, key: &str) -> Option<R> {
        self.store.get(R::TABLE, key)
    }

    pub fn get_all(&self, limit: i64) -> Vec<R> {
        self.store.get_all(R::TABLE, limit)
    }

    pub fn page(&self, limit: i64, cursor: Option<i64>) -> Vec<R> {
        self.store.get_cursor_paginated(R::TABLE, limit, cursor)
    }

    pub fn exists(&self, key: &str) -> bool {
        self.store.exists(R::TABLE, key)
    }

    pub fn count(&self) -> i64 {
        self.store.count(R::TABLE)
    }

    pub async fn set(&self, record: &R) {
        let key = record.key();
        self.store
            .set(R::TABLE, &key, record, record.timestamp())
            .await;
    }

    pub async fn delete(&self, key: &str) {
        self.store.delete(R::TABLE, key).await;
    }

    /// Read-modify-write of one record. Returns false if `key` is absent.
    pub async fn update(&self, key: &str, change: impl FnOnce(&mut R)) -> bool {
        let Some(mut record) = self.get(key) else {
            return false;
        };
        change(&mut record);
        self.set(&record).await;
        true
    }
}

impl Record for User {
    const TABLE: Table = Table::Users;

    fn key(&self) -> String {
        self.email.clone()
    }
}

impl Record for Post {
    const TABLE: Table = Table::Posts;

    fn key(&self) -> String {
        self.id.clone()
    }

    fn timestamp(&self) -> Option<i64> {
        Some(self.timestamp)
    }
}

impl Record for Group {
    const TABLE: Table = Table::Groups;

    fn key(&self) -> String {
        self.id.clone()
    }
}

impl Record for Chat {
    const TABLE: Table = Table::Chats;

    fn key(&self) -> String {
        self.id.clone()
    }
}

impl Record for Notification {
    const TABLE: Table = Table::Notifications;

    fn key(&self) -> String {
        self.id.clone()
    }

    fn timestamp(&self) -> Option<i64> {
        Some(self.timestamp)
    }
}

impl Record for Relationship {
    const TABLE: Table = Table::Relationships;

    fn key(&self) -> String {
        Relationship::key(self)
    }
}

impl Record for VipAccess {
    const TABLE: Table = Table::VipAccess;

    fn key(&self) -> String {
        VipAccess::key(self)
    }
}

impl Record for Listing {
    const TABLE: Table = Table::Marketplace;

    fn key(&self) -> String {
        self.id.clone()
    }

    fn timestamp(&self) -> Option<i64> {
        Some(self.timestamp)
    }
}

impl Record for Ad {
    const TABLE: Table = Table::Ads;

    fn key(&self) -> String {
        self.id.clone()
    }

    fn timestamp(&self) -> Option<i64> {
        Some(self.timestamp)
    }
}

impl Store {
    pub fn users(&self) -> Users<'_> {
        Users::new(self)
    }

    pub fn posts(&self) -> Posts<'_> {
        Posts::new(self)
    }

    pub fn groups(&self) -> Groups<'_> {
        Groups::new(self)
    }

    pub fn chats(&self) -> Chats<'_> {
        Chats::new(self)
    }

    pub fn notifications(&self) -> Notifications<'_> {
        Notifications::new(self)
    }

    pub fn relationships(&self) -> Relationships<'_> {
        Relationships::new(self)
    }

    pub fn vip_access(&self) -> VipGrants<'_> {
        VipGrants::new(self)
    }

    pub fn marketplace(&self) -> Marketplace<'_> {
        Marketplace::new(self)
    }

    pub fn ads(&self) -> Ads<'_> {
        Ads::new(self)
    }

    pub fn profiles(&self) -> Profiles<'_> {
        Profiles::new(self)
    }

    pub fn permissions(&self) -> Permissions<'_> {
        Permissions::new(self)
    }

    pub fn sessions(&self) -> Sessions<'_> {
        Sessions::new(self)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::{MemoryBlockStore, MemoryKvArea, Store, StoreConfig, WindowChannel};

    /// A ready, unseeded store on in-memory backends.
    pub async fn store() -> Store {
        let config = StoreConfig {
            seed_fixtures: false,
            reconcile_interval_secs: 0,
            ..StoreConfig::default()
        };
        let store = Store::new(
            config,
            Arc::new(MemoryBlockStore::new()),
            Arc::new(MemoryKvArea::new()),
            WindowChannel::default(),
        );
        store.init().await;
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_repository_update() {
        let store = test_support::store().await;
        let repo = Repository::<Group>::new(&store);
        repo.set(&Group {
            id: "g1".into(),
            name: "before".into(),
            ..Group::default()
        })
        .await;

        assert!(repo.update("g1", |g| g.name = "after".into()).await);
        assert!(!repo.update("g2", |g| g.name = "never".into()).await);
        assert_eq!(repo.get("g1").map(|g| g.name), Some("after".to_string()));
        assert_eq!(repo.count(), 1);
    }

    #[tokio::test]
    async fn test_timestamp_column_follows_document() {
        let store = test_support::store().await;
        let repo = Repository::<Post>::new(&store);
        for (id, ts) in [("a", 100), ("b", 300), ("c", 200)] {
            repo.set(&Post {
                id: id.into(),
                timestamp: ts,
                ..Post::default()
            })
            .await;
        }
        let ids: Vec<String> = repo.page(0, None).into_iter().map(|p| p.id).collect();
        assert_eq!(ids, ["b", "c", "a"]);
    }
}
