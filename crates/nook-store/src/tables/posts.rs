use nook_types::Post;

use super::Repository;
use crate::Store;

/// Facade over the `posts` table.
pub struct Posts<'a> {
    repo: Repository<'a, Post>,
}

impl<'a> Posts<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self {
            repo: Repository::new(store),
        }
    }

    pub fn find_by_id(&self, id: &str) -> Option<Post> {
        self.repo.get(id)
    }

    /// Every post, newest first, capped at `limit` when positive.
    pub fn get_all(&self, limit: i64) -> Vec<Post> {
        self.repo.get_all(limit)
    }

    /// One page of the feed. Pass the last seen post's timestamp as `cursor`.
    pub fn feed(&self, limit: i64, cursor: Option<i64>) -> Vec<Post> {
        self.repo.page(limit, cursor)
    }

    /// Posts by one author, newest first.
    pub fn by_author(&self, email: &str) -> Vec<Post> {
        self.repo
            .get_all(0)
            .into_iter()
            .filter(|p| p.author_email == email)
            .collect()
    }

    pub async fn set(&self, post: &Post) {
        self.repo.set(post).await;
    }

    pub async fn delete(&self, id: &str) {
        self.repo.delete(id).await;
    }
}
