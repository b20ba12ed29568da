use nook_types::{composite_key, Millis, VipAccess, VipStatus};

use super::Repository;
use crate::Store;

/// Facade over the `vip_access` table, keyed `user_group`.
pub struct VipGrants<'a> {
    repo: Repository<'a, VipAccess>,
}

impl<'a> VipGrants<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self {
            repo: Repository::new(store),
        }
    }

    pub fn get(&self, user: &str, group: &str) -> Option<VipAccess> {
        self.repo.get(&composite_key(user, group))
    }

    pub fn get_all(&self) -> Vec<VipAccess> {
        self.repo.get_all(0)
    }

    /// Whether `user` holds an unexpired active grant for `group` at `now`.
    pub fn has_active(&self, user: &str, group: &str, now: Millis) -> bool {
        self.get(user, group).is_some_and(|g| g.is_active_at(now))
    }

    pub async fn grant(&self, access: &VipAccess) {
        self.repo.set(access).await;
    }

    /// Mark a grant expired. Returns false if there is no grant.
    pub async fn revoke(&self, user: &str, group: &str) -> bool {
        self.repo
            .update(&composite_key(user, group), |g| g.status = VipStatus::Expired)
            .await
    }
}

#[cfg(test)]
mod tests {
    use crate::tables::test_support;
    use nook_types::{VipAccess, VipStatus};

    fn grant(expires_at: Option<i64>) -> VipAccess {
        VipAccess {
            user_id: "u1".into(),
            group_id: "g1".into(),
            status: VipStatus::Active,
            granted_at: 100,
            expires_at,
        }
    }

    #[tokio::test]
    async fn test_grant_and_expiry() {
        let store = test_support::store().await;
        let vip = store.vip_access();
        vip.grant(&grant(Some(1_000))).await;

        assert!(vip.has_active("u1", "g1", 500));
        assert!(!vip.has_active("u1", "g1", 1_000));
        assert!(!vip.has_active("u2", "g1", 500));
        assert_eq!(vip.get_all().len(), 1);
    }

    #[tokio::test]
    async fn test_revoke() {
        let store = test_support::store().await;
        let vip = store.vip_access();
        vip.grant(&grant(None)).await;

        assert!(vip.revoke("u1", "g1").await);
        assert!(!vip.has_active("u1", "g1", 0));
        assert_eq!(vip.get("u1", "g1").map(|g| g.status), Some(VipStatus::Expired));
        assert!(!vip.revoke("u1", "g2").await);
    }
}
