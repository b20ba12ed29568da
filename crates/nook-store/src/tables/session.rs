//! Session and failed-login bookkeeping.
//!
//! Kept in the synchronous KV area rather than the engine, so it survives a
//! snapshot reload from another window and is never broadcast.

use std::collections::BTreeMap;

use nook_types::{Millis, Session};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::codec;
use crate::config::LockoutConfig;
use crate::kv::KvArea;
use crate::Store;

const SESSION_KEY: &str = "nook_session";
const FAILURES_KEY: &str = "nook_login_failures";

/// Failed attempts per lowercased email, stored as one KV value so that any
/// address works regardless of the key character set.
type FailureLog = BTreeMap<String, Failures>;

/// Failed attempts for one email inside the current lockout window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Failures {
    first_at: Millis,
    count: u32,
}

/// Facade over the session keys of the KV area.
pub struct Sessions<'a> {
    kv: &'a dyn KvArea,
    lockout: &'a LockoutConfig,
}

impl<'a> Sessions<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self {
            kv: store.kv(),
            lockout: &store.config().lockout,
        }
    }

    pub fn current_session(&self) -> Option<Session> {
        self.read(SESSION_KEY)
    }

    pub fn start_session(&self, email: &str, now: Millis) -> Session {
        let session = Session {
            email: email.to_string(),
            started_at: now,
        };
        self.write(SESSION_KEY, &session);
        self.clear_failed_logins(email);
        session
    }

    pub fn end_session(&self) {
        if let Err(e) = self.kv.remove(SESSION_KEY) {
            warn!("could not clear session: {e}");
        }
    }

    /// Count a failed login. Returns the failures inside the current window.
    pub fn record_failed_login(&self, email: &str, now: Millis) -> u32 {
        let mut log = self.failure_log();
        log.retain(|_, f| !self.expired(f, now));
        let failures = log
            .entry(email.to_ascii_lowercase())
            .and_modify(|f| f.count = f.count.saturating_add(1))
            .or_insert(Failures {
                first_at: now,
                count: 1,
            });
        let count = failures.count;
        self.write(FAILURES_KEY, &log);
        count
    }

    /// Whether `email` has used up its attempts inside the current window.
    pub fn is_locked_out(&self, email: &str, now: Millis) -> bool {
        self.failure_log()
            .get(&email.to_ascii_lowercase())
            .is_some_and(|f| !self.expired(f, now) && f.count >= self.lockout.max_attempts)
    }

    pub fn clear_failed_logins(&self, email: &str) {
        let mut log = self.failure_log();
        if log.remove(&email.to_ascii_lowercase()).is_none() {
            return;
        }
        if log.is_empty() {
            if let Err(e) = self.kv.remove(FAILURES_KEY) {
                warn!(email, "could not clear failed logins: {e}");
            }
        } else {
            self.write(FAILURES_KEY, &log);
        }
    }

    fn failure_log(&self) -> FailureLog {
        self.read(FAILURES_KEY).unwrap_or_default()
    }

    fn expired(&self, failures: &Failures, now: Millis) -> bool {
        let window = i64::try_from(self.lockout.window_secs.saturating_mul(1_000)).unwrap_or(i64::MAX);
        now.saturating_sub(failures.first_at) >= window
    }

    fn read<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.kv.get(key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key, "kv read failed: {e}");
                return None;
            }
        };
        codec::decode_document(&raw)
            .map_err(|e| warn!(key, "dropping unreadable kv value: {e}"))
            .ok()
    }

    fn write<T: Serialize>(&self, key: &str, value: &T) {
        let result = codec::encode_document(value).and_then(|raw| self.kv.set(key, &raw));
        if let Err(e) = result {
            warn!(key, "kv write failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::kv::{FileKvArea, DEFAULT_QUOTA_BYTES};
    use crate::tables::test_support;
    use crate::{MemoryBlockStore, Store, StoreConfig, WindowChannel};

    const MINUTE: i64 = 60_000;

    #[tokio::test]
    async fn test_session_lifecycle() {
        let store = test_support::store().await;
        let sessions = store.sessions();
        assert!(sessions.current_session().is_none());

        let started = sessions.start_session("a@test.com", 1_000);
        assert_eq!(sessions.current_session(), Some(started));

        sessions.end_session();
        assert!(sessions.current_session().is_none());
    }

    #[tokio::test]
    async fn test_lockout_after_max_attempts() {
        let store = test_support::store().await;
        let sessions = store.sessions();
        for attempt in 1..=4 {
            assert_eq!(sessions.record_failed_login("a@test.com", attempt), attempt as u32);
            assert!(!sessions.is_locked_out("a@test.com", attempt));
        }
        sessions.record_failed_login("a@test.com", 5);
        assert!(sessions.is_locked_out("a@test.com", 5));
        assert!(!sessions.is_locked_out("b@test.com", 5));
    }

    #[tokio::test]
    async fn test_lockout_window_expires() {
        let store = test_support::store().await;
        let sessions = store.sessions();
        for _ in 0..5 {
            sessions.record_failed_login("a@test.com", 0);
        }
        assert!(sessions.is_locked_out("a@test.com", 14 * MINUTE));
        assert!(!sessions.is_locked_out("a@test.com", 15 * MINUTE));

        // A failure after the window starts a fresh count.
        assert_eq!(sessions.record_failed_login("a@test.com", 16 * MINUTE), 1);
    }

    #[tokio::test]
    async fn test_successful_login_clears_failures() {
        let store = test_support::store().await;
        let sessions = store.sessions();
        for _ in 0..5 {
            sessions.record_failed_login("A@test.com", 0);
        }
        assert!(sessions.is_locked_out("a@test.com", 0));

        sessions.start_session("a@test.com", 1);
        assert!(!sessions.is_locked_out("a@test.com", 1));
    }

    #[tokio::test]
    async fn test_lockout_on_file_area_for_any_address() {
        let dir = tempfile::tempdir().expect("tempdir");
        let kv = FileKvArea::open(dir.path(), DEFAULT_QUOTA_BYTES).expect("kv");
        let store = Store::new(
            StoreConfig {
                seed_fixtures: false,
                reconcile_interval_secs: 0,
                ..StoreConfig::default()
            },
            Arc::new(MemoryBlockStore::new()),
            Arc::new(kv),
            WindowChannel::default(),
        );
        let sessions = store.sessions();

        let counts: Vec<u32> = (0..5)
            .map(|t| sessions.record_failed_login("Alice+news@test.com", t))
            .collect();
        assert_eq!(counts, [1, 2, 3, 4, 5]);
        assert!(sessions.is_locked_out("alice+news@test.com", 5));
        assert!(!sessions.is_locked_out("bob/o'neil@test.com", 5));

        sessions.clear_failed_logins("alice+news@test.com");
        assert!(!sessions.is_locked_out("alice+news@test.com", 5));
    }

    #[tokio::test]
    async fn test_expired_entries_are_pruned() {
        let store = test_support::store().await;
        let sessions = store.sessions();
        sessions.record_failed_login("a@test.com", 0);
        sessions.record_failed_login("b@test.com", 20 * MINUTE);

        let log = sessions.failure_log();
        assert_eq!(log.keys().collect::<Vec<_>>(), ["b@test.com"]);
    }
}
