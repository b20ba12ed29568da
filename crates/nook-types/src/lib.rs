//! # nook-types
//!
//! Document types stored by the nook client engine.
//!
//! Every type here is persisted as one serialized document per row, keyed by
//! the field documented on the type. Field names serialize in camelCase so the
//! same documents round-trip through the UI and the remote service unchanged.

pub mod commerce;
pub mod group;
pub mod profile;
pub mod social;
pub mod user;

pub use commerce::{Ad, Listing};
pub use group::{Chat, ChatMessage, Group, VipAccess, VipStatus};
pub use profile::{PsychProfile, Session};
pub use social::{Comment, Notification, NotificationKind, Post, Relationship, RelationshipStatus};
pub use user::{User, UserProfile};

/// Milliseconds since the Unix epoch. Used for every `timestamp` field.
pub type Millis = i64;

/// Join two foreign keys into the composite key used by edge tables.
///
/// `composite_key("u1", "u2") == "u1_u2"`.
pub fn composite_key(left: &str, right: &str) -> String {
    format!("{left}_{right}")
}
