//! Posts, notifications and the follow graph.

use serde::{Deserialize, Serialize};

use crate::{composite_key, Millis};

/// A feed post. Keyed by `id`, paginated by `timestamp`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub author_email: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub timestamp: Millis,
}

/// A comment embedded in its post.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub author_email: String,
    pub text: String,
    pub timestamp: Millis,
}

/// A notification addressed to one user. Keyed by `id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_email: String,
    pub kind: NotificationKind,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub read: bool,
    pub timestamp: Millis,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Like,
    Comment,
    Follow,
    Message,
    System,
}

/// A directed follow edge. Keyed by `followerId_followingId`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub follower_id: String,
    pub following_id: String,
    pub status: RelationshipStatus,
    #[serde(default)]
    pub created_at: Millis,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipStatus {
    Pending,
    Accepted,
}

impl Relationship {
    pub fn new(
        follower_id: impl Into<String>,
        following_id: impl Into<String>,
        status: RelationshipStatus,
    ) -> Self {
        Self {
            follower_id: follower_id.into(),
            following_id: following_id.into(),
            status,
            created_at: 0,
        }
    }

    /// Row key for this edge.
    pub fn key(&self) -> String {
        composite_key(&self.follower_id, &self.following_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relationship_key() {
        let rel = Relationship::new("u1", "u2", RelationshipStatus::Accepted);
        assert_eq!(rel.key(), "u1_u2");
    }

    #[test]
    fn test_relationship_wire_shape() {
        let rel = Relationship::new("u1", "u2", RelationshipStatus::Pending);
        let json = serde_json::to_value(&rel).expect("serialize");
        assert_eq!(json["followerId"], "u1");
        assert_eq!(json["followingId"], "u2");
        assert_eq!(json["status"], "pending");
    }

    #[test]
    fn test_post_defaults() {
        let post: Post = serde_json::from_str(r#"{"id":"p1","authorEmail":"a@test.com","timestamp":5}"#)
            .expect("parse");
        assert!(post.likes.is_empty());
        assert_eq!(post.group_id, None);
    }
}
