//! Fixed-shape records: psych profiles and analysis permissions.

use nook_types::PsychProfile;
use rusqlite::{Connection, OptionalExtension};

use crate::Result;

/// Insert or replace a user's profile.
pub fn upsert_profile(conn: &Connection, profile: &PsychProfile) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO psych_profile
         (user_email, openness, conscientiousness, extraversion, agreeableness, neuroticism, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            profile.user_email,
            profile.openness,
            profile.conscientiousness,
            profile.extraversion,
            profile.agreeableness,
            profile.neuroticism,
            profile.updated_at,
        ],
    )?;
    Ok(())
}

/// Get a user's profile.
pub fn get_profile(conn: &Connection, user_email: &str) -> Result<Option<PsychProfile>> {
    let profile = conn
        .query_row(
            "SELECT user_email, openness, conscientiousness, extraversion, agreeableness,
                    neuroticism, updated_at
             FROM psych_profile WHERE user_email = ?1",
            [user_email],
            |row| {
                Ok(PsychProfile {
                    user_email: row.get(0)?,
                    openness: row.get(1)?,
                    conscientiousness: row.get(2)?,
                    extraversion: row.get(3)?,
                    agreeableness: row.get(4)?,
                    neuroticism: row.get(5)?,
                    updated_at: row.get(6)?,
                })
            },
        )
        .optional()?;
    Ok(profile)
}

/// Set the analysis flag for a user.
pub fn set_analysis_enabled(conn: &Connection, user_email: &str, enabled: bool) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO permissions (user_email, analysis_enabled) VALUES (?1, ?2)",
        rusqlite::params![user_email, enabled],
    )?;
    Ok(())
}

/// The analysis flag for a user, if one was ever set.
pub fn analysis_enabled(conn: &Connection, user_email: &str) -> Result<Option<bool>> {
    let enabled = conn
        .query_row(
            "SELECT analysis_enabled FROM permissions WHERE user_email = ?1",
            [user_email],
            |row| row.get::<_, bool>(0),
        )
        .optional()?;
    Ok(enabled)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    #[test]
    fn test_profile_upsert_and_get() {
        let conn = test_db();
        assert!(get_profile(&conn, "a@test.com").expect("get").is_none());

        let mut profile = PsychProfile::neutral("a@test.com");
        upsert_profile(&conn, &profile).expect("insert");

        profile.openness = 0.9;
        profile.updated_at = 42;
        upsert_profile(&conn, &profile).expect("replace");

        let stored = get_profile(&conn, "a@test.com").expect("get").expect("present");
        assert_eq!(stored, profile);
    }

    #[test]
    fn test_analysis_flag() {
        let conn = test_db();
        assert_eq!(analysis_enabled(&conn, "a@test.com").expect("get"), None);

        set_analysis_enabled(&conn, "a@test.com", true).expect("enable");
        assert_eq!(analysis_enabled(&conn, "a@test.com").expect("get"), Some(true));

        set_analysis_enabled(&conn, "a@test.com", false).expect("disable");
        assert_eq!(analysis_enabled(&conn, "a@test.com").expect("get"), Some(false));
    }
}
