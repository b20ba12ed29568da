use nook_types::Notification;

use super::Repository;
use crate::Store;

/// Facade over the `notifications` table.
pub struct Notifications<'a> {
    repo: Repository<'a, Notification>,
}

impl<'a> Notifications<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self {
            repo: Repository::new(store),
        }
    }

    pub fn get(&self, id: &str) -> Option<Notification> {
        self.repo.get(id)
    }

    pub fn get_all(&self, limit: i64) -> Vec<Notification> {
        self.repo.get_all(limit)
    }

    /// Notifications addressed to `email`, newest first.
    pub fn for_user(&self, email: &str) -> Vec<Notification> {
        self.repo
            .get_all(0)
            .into_iter()
            .filter(|n| n.user_email == email)
            .collect()
    }

    pub fn unread_count(&self, email: &str) -> usize {
        self.for_user(email).iter().filter(|n| !n.read).count()
    }

    pub async fn add(&self, notification: &Notification) {
        self.repo.set(notification).await;
    }

    /// Returns false if there is no notification `id`.
    pub async fn mark_read(&self, id: &str) -> bool {
        self.repo.update(id, |n| n.read = true).await
    }

    pub async fn delete(&self, id: &str) {
        self.repo.delete(id).await;
    }
}
