use nook_types::{Ad, Listing};

use super::Repository;
use crate::Store;

/// Facade over the `marketplace` table.
pub struct Marketplace<'a> {
    repo: Repository<'a, Listing>,
}

impl<'a> Marketplace<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self {
            repo: Repository::new(store),
        }
    }

    pub fn get(&self, id: &str) -> Option<Listing> {
        self.repo.get(id)
    }

    pub fn get_all(&self, limit: i64) -> Vec<Listing> {
        self.repo.get_all(limit)
    }

    /// Newest-first page of listings older than `cursor`.
    pub fn page(&self, limit: i64, cursor: Option<i64>) -> Vec<Listing> {
        self.repo.page(limit, cursor)
    }

    pub async fn set(&self, listing: &Listing) {
        self.repo.set(listing).await;
    }

    /// Returns false if there is no listing `id`.
    pub async fn mark_sold(&self, id: &str) -> bool {
        self.repo.update(id, |l| l.sold = true).await
    }

    pub async fn delete(&self, id: &str) {
        self.repo.delete(id).await;
    }
}

/// Facade over the `ads` table.
pub struct Ads<'a> {
    repo: Repository<'a, Ad>,
}

impl<'a> Ads<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self {
            repo: Repository::new(store),
        }
    }

    pub fn get(&self, id: &str) -> Option<Ad> {
        self.repo.get(id)
    }

    pub fn get_all(&self, limit: i64) -> Vec<Ad> {
        self.repo.get_all(limit)
    }

    /// Newest-first page of up to `limit` active ads older than `cursor`.
    ///
    /// Inactive ads are skipped by reading further back, so a short page
    /// means the table is exhausted. The last ad's timestamp is the cursor
    /// for the next page.
    pub fn page(&self, limit: i64, cursor: Option<i64>) -> Vec<Ad> {
        if limit <= 0 {
            return self
                .repo
                .page(limit, cursor)
                .into_iter()
                .filter(|ad| ad.active)
                .collect();
        }

        let wanted = usize::try_from(limit).unwrap_or(usize::MAX);
        let mut active = Vec::new();
        let mut cursor = cursor;
        loop {
            let batch = self.repo.page(limit, cursor);
            let exhausted = (batch.len() as i64) < limit;
            cursor = batch.last().map(|ad| ad.timestamp);
            active.extend(batch.into_iter().filter(|ad| ad.active));
            if active.len() >= wanted || exhausted || cursor.is_none() {
                break;
            }
        }
        active.truncate(wanted);
        active
    }

    pub async fn set(&self, ad: &Ad) {
        self.repo.set(ad).await;
    }

    pub async fn delete(&self, id: &str) {
        self.repo.delete(id).await;
    }
}
