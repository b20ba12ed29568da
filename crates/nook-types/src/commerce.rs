//! Marketplace listings and ads. Both are keyed by `id` and paginated by
//! `timestamp`.

use serde::{Deserialize, Serialize};

use crate::Millis;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,
    pub seller_email: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Price in the smallest currency unit.
    pub price_cents: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub sold: bool,
    pub timestamp: Millis,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Ad {
    pub id: String,
    pub advertiser: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub target_url: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    pub timestamp: Millis,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_true() -> bool {
    true
}
