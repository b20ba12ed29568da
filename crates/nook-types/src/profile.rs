//! Fixed-shape records that are stored as columns rather than documents.

use serde::{Deserialize, Serialize};

use crate::Millis;

/// Personality scores derived by the analysis feature. Keyed by `user_email`.
///
/// Each trait is a score in `0.0..=1.0`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PsychProfile {
    pub user_email: String,
    pub openness: f64,
    pub conscientiousness: f64,
    pub extraversion: f64,
    pub agreeableness: f64,
    pub neuroticism: f64,
    pub updated_at: Millis,
}

impl PsychProfile {
    /// Neutral profile (every trait at 0.5) for a user with no analysis yet.
    pub fn neutral(user_email: impl Into<String>) -> Self {
        Self {
            user_email: user_email.into(),
            openness: 0.5,
            conscientiousness: 0.5,
            extraversion: 0.5,
            agreeableness: 0.5,
            neuroticism: 0.5,
            updated_at: 0,
        }
    }
}

/// The signed-in user of this client, kept in the key/value area.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub email: String,
    pub started_at: Millis,
}
