use nook_types::User;

use super::Repository;
use crate::Store;

/// Facade over the `users` table, keyed by email.
pub struct Users<'a> {
    repo: Repository<'a, User>,
}

impl<'a> Users<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self {
            repo: Repository::new(store),
        }
    }

    pub fn get(&self, email: &str) -> Option<User> {
        self.repo.get(email)
    }

    pub fn get_all(&self) -> Vec<User> {
        self.repo.get_all(0)
    }

    pub fn exists(&self, email: &str) -> bool {
        self.repo.exists(email)
    }

    pub fn count(&self) -> i64 {
        self.repo.count()
    }

    pub async fn set(&self, user: &User) {
        self.repo.set(user).await;
    }

    pub async fn delete(&self, email: &str) {
        self.repo.delete(email).await;
    }
}

#[cfg(test)]
mod tests {
    use crate::tables::test_support;
    use nook_types::User;

    #[tokio::test]
    async fn test_set_then_get() {
        let store = test_support::store().await;
        let users = store.users();
        users.set(&User::new("a@test.com", "alice")).await;

        let user = users.get("a@test.com").expect("user");
        assert_eq!(user.profile.name, "alice");
        assert!(users.exists("a@test.com"));
        assert!(!users.exists("b@test.com"));
    }

    #[tokio::test]
    async fn test_upsert_replaces() {
        let store = test_support::store().await;
        let users = store.users();
        users.set(&User::new("a@test.com", "alice")).await;
        users.set(&User::new("a@test.com", "alicia")).await;

        assert_eq!(users.count(), 1);
        assert_eq!(users.get_all()[0].profile.name, "alicia");
    }

    #[tokio::test]
    async fn test_delete() {
        let store = test_support::store().await;
        let users = store.users();
        users.set(&User::new("a@test.com", "alice")).await;
        users.delete("a@test.com").await;
        assert_eq!(users.get("a@test.com"), None);
    }
}
