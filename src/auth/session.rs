// src/auth/session.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Open sessions and the ids of revoked ones.
///
/// The token carries its own start time; the tracker's entry wins when
/// present so a flush can restart the clock without re-issuing the token.
/// Every entry expires with its token and is pruned on the next insert.
#[derive(Clone, Default)]
pub struct SessionTracker {
    inner: Arc<Mutex<Sessions>>,
}

struct OpenSession {
    uid: String,
    started: i64,
    expires: i64,
}

#[derive(Default)]
struct Sessions {
    open: HashMap<String, OpenSession>,
    /// Session id -> token expiry (Unix millis).
    revoked: HashMap<String, i64>,
}

impl Sessions {
    fn prune(&mut self, now_millis: i64) {
        self.open.retain(|_, s| s.expires > now_millis);
        self.revoked.retain(|_, expires| *expires > now_millis);
    }
}

fn elapsed_seconds(started_millis: i64, now_millis: i64) -> u64 {
    (now_millis.saturating_sub(started_millis).max(0) / 1000) as u64
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Sessions> {
        // A panic while holding the lock cannot leave the maps half-updated.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn open(&self, session_id: &str, uid: &str, started_millis: i64, expires_millis: i64) {
        let mut sessions = self.lock();
        sessions.prune(started_millis);
        sessions.open.insert(
            session_id.to_string(),
            OpenSession {
                uid: uid.to_string(),
                started: started_millis,
                expires: expires_millis,
            },
        );
    }

    /// Seconds since the session started (or was last flushed); restarts the clock.
    pub fn flush(
        &self,
        session_id: &str,
        uid: &str,
        fallback_started: i64,
        expires_millis: i64,
        now_millis: i64,
    ) -> u64 {
        let mut sessions = self.lock();
        sessions.prune(now_millis);
        let previous = sessions.open.insert(
            session_id.to_string(),
            OpenSession {
                uid: uid.to_string(),
                started: now_millis,
                expires: expires_millis,
            },
        );
        let started = previous.map_or(fallback_started, |s| s.started);
        elapsed_seconds(started, now_millis)
    }

    /// Seconds since the session started (or was last flushed); revokes the id.
    pub fn close(
        &self,
        session_id: &str,
        fallback_started: i64,
        expires_millis: i64,
        now_millis: i64,
    ) -> u64 {
        let mut sessions = self.lock();
        sessions.prune(now_millis);
        let started = sessions
            .open
            .remove(session_id)
            .map_or(fallback_started, |s| s.started);
        sessions.revoked.insert(session_id.to_string(), expires_millis);
        elapsed_seconds(started, now_millis)
    }

    /// Revokes every open session of `uid`. Returns how many were open.
    pub fn revoke_user(&self, uid: &str, now_millis: i64) -> usize {
        let mut sessions = self.lock();
        sessions.prune(now_millis);
        let ids: Vec<String> = sessions
            .open
            .iter()
            .filter(|(_, s)| s.uid == uid)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &ids {
            if let Some(session) = sessions.open.remove(id) {
                sessions.revoked.insert(id.clone(), session.expires);
            }
        }
        ids.len()
    }

    pub fn is_revoked(&self, session_id: &str) -> bool {
        self.lock().revoked.contains_key(session_id)
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        let sessions = self.lock();
        sessions.open.len() + sessions.revoked.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: i64 = 3_600_000;

    #[test]
    fn flush_restarts_the_clock() {
        let tracker = SessionTracker::new();
        tracker.open("s1", "u1", 0, HOUR);

        assert_eq!(tracker.flush("s1", "u1", 0, HOUR, 90_000), 90);
        assert_eq!(tracker.close("s1", 0, HOUR, 120_000), 30);
        assert!(tracker.is_revoked("s1"));
    }

    #[test]
    fn unknown_session_uses_token_start() {
        let tracker = SessionTracker::new();
        assert_eq!(tracker.close("s2", 10_000, HOUR, 70_000), 60);
    }

    #[test]
    fn clock_skew_never_goes_negative() {
        let tracker = SessionTracker::new();
        tracker.open("s3", "u1", 50_000, HOUR);
        assert_eq!(tracker.close("s3", 0, HOUR, 40_000), 0);
    }

    #[test]
    fn revoking_a_user_closes_only_their_sessions() {
        let tracker = SessionTracker::new();
        tracker.open("a1", "alice", 0, HOUR);
        tracker.open("a2", "alice", 0, HOUR);
        tracker.open("b1", "bob", 0, HOUR);

        assert_eq!(tracker.revoke_user("alice", 1_000), 2);
        assert!(tracker.is_revoked("a1"));
        assert!(tracker.is_revoked("a2"));
        assert!(!tracker.is_revoked("b1"));
    }

    #[test]
    fn expired_entries_are_dropped() {
        let tracker = SessionTracker::new();
        tracker.open("old", "u1", 0, HOUR);
        tracker.close("gone", 0, HOUR, 1_000);
        assert_eq!(tracker.tracked(), 2);

        tracker.open("new", "u2", 2 * HOUR, 3 * HOUR);
        assert_eq!(tracker.tracked(), 1);
        assert!(!tracker.is_revoked("gone"));
    }
}
