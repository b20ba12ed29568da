//! User documents. Keyed by `email`.

use serde::{Deserialize, Serialize};

use crate::Millis;

/// An application user.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub email: String,
    #[serde(default)]
    pub profile: UserProfile,
    #[serde(default)]
    pub is_vip: bool,
    #[serde(default)]
    pub created_at: Millis,
}

/// Public profile fields shown next to a user's content.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl User {
    /// A user with only an email and display name set.
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            profile: UserProfile {
                name: name.into(),
                ..UserProfile::default()
            },
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_default() {
        let user: User =
            serde_json::from_str(r#"{"email":"a@test.com","profile":{"name":"alice"}}"#)
                .expect("parse");
        assert_eq!(user.profile.name, "alice");
        assert!(!user.is_vip);
        assert_eq!(user.profile.avatar, None);
    }

    #[test]
    fn test_camel_case_fields() {
        let json = serde_json::to_value(User::new("a@test.com", "alice")).expect("serialize");
        assert!(json.get("isVip").is_some());
        assert!(json.get("createdAt").is_some());
    }
}
