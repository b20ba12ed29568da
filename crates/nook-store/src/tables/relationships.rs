//! The follow graph.
//!
//! Each edge is keyed `follower_following`, so "does X follow Y" is a single
//! key lookup.

use nook_types::{composite_key, Relationship, RelationshipStatus};

use super::Repository;
use crate::Store;

/// Facade over the `relationships` table.
pub struct Relationships<'a> {
    repo: Repository<'a, Relationship>,
}

impl<'a> Relationships<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self {
            repo: Repository::new(store),
        }
    }

    pub fn get(&self, follower: &str, following: &str) -> Option<Relationship> {
        self.repo.get(&composite_key(follower, following))
    }

    pub fn get_all(&self) -> Vec<Relationship> {
        self.repo.get_all(0)
    }

    /// True only for an accepted edge.
    pub fn is_following(&self, follower: &str, following: &str) -> bool {
        self.get(follower, following)
            .is_some_and(|r| r.status == RelationshipStatus::Accepted)
    }

    /// Edges pointing at `user`, any status.
    pub fn followers_of(&self, user: &str) -> Vec<Relationship> {
        self.repo
            .get_all(0)
            .into_iter()
            .filter(|r| r.following_id == user)
            .collect()
    }

    /// Edges leaving `user`, any status.
    pub fn following_of(&self, user: &str) -> Vec<Relationship> {
        self.repo
            .get_all(0)
            .into_iter()
            .filter(|r| r.follower_id == user)
            .collect()
    }

    pub async fn add(&self, relationship: &Relationship) {
        self.repo.set(relationship).await;
    }

    /// Accept a pending request. Returns false if there is no such edge.
    pub async fn accept(&self, follower: &str, following: &str) -> bool {
        self.repo
            .update(&composite_key(follower, following), |r| {
                r.status = RelationshipStatus::Accepted
            })
            .await
    }

    pub async fn remove(&self, follower: &str, following: &str) {
        self.repo.delete(&composite_key(follower, following)).await;
    }
}
