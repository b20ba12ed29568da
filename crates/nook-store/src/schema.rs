//! SQL schema and the closed set of tables it defines.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::StoreError;

/// Complete schema for the v1 engine.
///
/// Document tables hold one serialized document in `data` under the table's
/// key column. `timestamp` columns mirror the document's own `timestamp`
/// field and exist only for cursor pagination.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- People & graph
-- ============================================================

CREATE TABLE IF NOT EXISTS users (
    email TEXT PRIMARY KEY,
    data TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS relationships (
    id TEXT PRIMARY KEY,
    data TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS notifications (
    id TEXT PRIMARY KEY,
    data TEXT NOT NULL,
    timestamp INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_notifications_timestamp ON notifications(timestamp DESC);

-- ============================================================
-- Content
-- ============================================================

CREATE TABLE IF NOT EXISTS posts (
    id TEXT PRIMARY KEY,
    data TEXT NOT NULL,
    timestamp INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_posts_timestamp ON posts(timestamp DESC);

CREATE TABLE IF NOT EXISTS "groups" (
    id TEXT PRIMARY KEY,
    data TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chats (
    id TEXT PRIMARY KEY,
    data TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS vip_access (
    id TEXT PRIMARY KEY,
    data TEXT NOT NULL
);

-- ============================================================
-- Commerce
-- ============================================================

CREATE TABLE IF NOT EXISTS marketplace (
    id TEXT PRIMARY KEY,
    data TEXT NOT NULL,
    timestamp INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_marketplace_timestamp ON marketplace(timestamp DESC);

CREATE TABLE IF NOT EXISTS ads (
    id TEXT PRIMARY KEY,
    data TEXT NOT NULL,
    timestamp INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_ads_timestamp ON ads(timestamp DESC);

-- ============================================================
-- Fixed-shape records
-- ============================================================

CREATE TABLE IF NOT EXISTS psych_profile (
    user_email TEXT PRIMARY KEY,
    openness REAL NOT NULL,
    conscientiousness REAL NOT NULL,
    extraversion REAL NOT NULL,
    agreeableness REAL NOT NULL,
    neuroticism REAL NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS permissions (
    user_email TEXT PRIMARY KEY,
    analysis_enabled INTEGER NOT NULL DEFAULT 0
);
"#;

/// Every table the engine owns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Users,
    Posts,
    Groups,
    Chats,
    Notifications,
    Relationships,
    VipAccess,
    Marketplace,
    Ads,
    PsychProfile,
    Permissions,
}

impl Table {
    /// All tables in export order.
    pub const ALL: [Table; 11] = [
        Table::Users,
        Table::Posts,
        Table::Groups,
        Table::Chats,
        Table::Notifications,
        Table::Relationships,
        Table::VipAccess,
        Table::Marketplace,
        Table::Ads,
        Table::PsychProfile,
        Table::Permissions,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::Posts => "posts",
            Table::Groups => "groups",
            Table::Chats => "chats",
            Table::Notifications => "notifications",
            Table::Relationships => "relationships",
            Table::VipAccess => "vip_access",
            Table::Marketplace => "marketplace",
            Table::Ads => "ads",
            Table::PsychProfile => "psych_profile",
            Table::Permissions => "permissions",
        }
    }

    /// The primary-key column.
    pub fn key_column(self) -> &'static str {
        match self {
            Table::Users => "email",
            Table::PsychProfile | Table::Permissions => "user_email",
            _ => "id",
        }
    }

    /// True for tables with a `timestamp` column usable for cursor pagination.
    pub fn has_timestamp(self) -> bool {
        matches!(
            self,
            Table::Posts | Table::Notifications | Table::Marketplace | Table::Ads
        )
    }

    /// True for tables holding one serialized document per row.
    pub fn is_document(self) -> bool {
        !matches!(self, Table::PsychProfile | Table::Permissions)
    }

    /// Quoted identifier, safe to splice into SQL (`groups` is a keyword).
    pub(crate) fn ident(self) -> String {
        format!("\"{}\"", self.name())
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Table {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Table::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| StoreError::NotFound(format!("table '{s}'")))
    }
}
