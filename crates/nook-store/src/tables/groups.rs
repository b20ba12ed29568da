use nook_types::Group;

use super::Repository;
use crate::Store;

/// Facade over the `groups` table.
pub struct Groups<'a> {
    repo: Repository<'a, Group>,
}

impl<'a> Groups<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self {
            repo: Repository::new(store),
        }
    }

    pub fn get(&self, id: &str) -> Option<Group> {
        self.repo.get(id)
    }

    pub fn get_all(&self) -> Vec<Group> {
        self.repo.get_all(0)
    }

    /// Groups `email` belongs to.
    pub fn member_of(&self, email: &str) -> Vec<Group> {
        self.repo
            .get_all(0)
            .into_iter()
            .filter(|g| g.members.iter().any(|m| m == email))
            .collect()
    }

    pub async fn set(&self, group: &Group) {
        self.repo.set(group).await;
    }

    pub async fn delete(&self, id: &str) {
        self.repo.delete(id).await;
    }
}

#[cfg(test)]
mod tests {
    use crate::tables::test_support;
    use nook_types::Group;

    #[tokio::test]
    async fn test_member_of() {
        let store = test_support::store().await;
        let groups = store.groups();
        groups
            .set(&Group {
                id: "g1".into(),
                members: vec!["a@test.com".into(), "b@test.com".into()],
                ..Group::default()
            })
            .await;
        groups
            .set(&Group {
                id: "g2".into(),
                members: vec!["b@test.com".into()],
                ..Group::default()
            })
            .await;

        let ids: Vec<String> = groups.member_of("a@test.com").into_iter().map(|g| g.id).collect();
        assert_eq!(ids, ["g1"]);
        assert_eq!(groups.member_of("b@test.com").len(), 2);

        groups.delete("g1").await;
        assert!(groups.get("g1").is_none());
        assert_eq!(groups.get_all().len(), 1);
    }
}
