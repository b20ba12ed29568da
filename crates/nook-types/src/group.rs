//! Groups, chats and VIP access grants.

use serde::{Deserialize, Serialize};

use crate::{composite_key, Millis};

/// A community group. Keyed by `id`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub owner_email: String,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub is_vip: bool,
    #[serde(default)]
    pub created_at: Millis,
}

/// A conversation. Keyed by `id`: a private chat uses the two participants
/// joined with `_`, a group chat reuses the group id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub updated_at: Millis,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub sender_email: String,
    pub text: String,
    pub timestamp: Millis,
}

/// Paid access of a user to a VIP group. Keyed by `userId_groupId`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct VipAccess {
    pub user_id: String,
    pub group_id: String,
    pub status: VipStatus,
    #[serde(default)]
    pub granted_at: Millis,
    /// `None` means the grant never lapses on its own.
    #[serde(default)]
    pub expires_at: Option<Millis>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum VipStatus {
    Active,
    Expired,
}

impl VipAccess {
    /// Row key for this grant.
    pub fn key(&self) -> String {
        composite_key(&self.user_id, &self.group_id)
    }

    /// True when the grant is active and not past its expiry at `now`.
    pub fn is_active_at(&self, now: Millis) -> bool {
        self.status == VipStatus::Active && self.expires_at.map_or(true, |at| now < at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(expires_at: Option<Millis>) -> VipAccess {
        VipAccess {
            user_id: "u1".into(),
            group_id: "g1".into(),
            status: VipStatus::Active,
            granted_at: 0,
            expires_at,
        }
    }

    #[test]
    fn test_vip_key() {
        assert_eq!(grant(None).key(), "u1_g1");
    }

    #[test]
    fn test_vip_expiry() {
        assert!(grant(None).is_active_at(i64::MAX));
        assert!(grant(Some(100)).is_active_at(99));
        assert!(!grant(Some(100)).is_active_at(100));

        let mut expired = grant(None);
        expired.status = VipStatus::Expired;
        assert!(!expired.is_active_at(0));
    }
}
