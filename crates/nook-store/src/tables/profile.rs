//! Fixed-shape tables: personality profiles and the analysis opt-in flag.

use nook_types::PsychProfile;

use crate::bus::ChangeKind;
use crate::queries::profile as queries;
use crate::{Store, Table};

/// Facade over `psych_profile`.
pub struct Profiles<'a> {
    store: &'a Store,
}

impl<'a> Profiles<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// The stored profile, or a neutral one if the user has none yet.
    pub fn get(&self, user_email: &str) -> PsychProfile {
        self.store
            .read(Table::PsychProfile, |conn| queries::get_profile(conn, user_email))
            .flatten()
            .unwrap_or_else(|| PsychProfile::neutral(user_email))
    }

    pub async fn update(&self, profile: &PsychProfile) {
        self.store
            .write_with(Table::PsychProfile, ChangeKind::Upsert, |conn| {
                queries::upsert_profile(conn, profile)
            })
            .await;
    }
}

/// Facade over `permissions`.
pub struct Permissions<'a> {
    store: &'a Store,
}

impl<'a> Permissions<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Analysis is off until the user opts in.
    pub fn is_analysis_enabled(&self, user_email: &str) -> bool {
        self.store
            .read(Table::Permissions, |conn| {
                queries::analysis_enabled(conn, user_email)
            })
            .flatten()
            .unwrap_or(false)
    }

    pub async fn set_analysis_enabled(&self, user_email: &str, enabled: bool) {
        self.store
            .write_with(Table::Permissions, ChangeKind::Upsert, |conn| {
                queries::set_analysis_enabled(conn, user_email, enabled)
            })
            .await;
    }
}
