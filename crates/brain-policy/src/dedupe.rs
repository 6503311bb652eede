// dedupe.rs — Best-effort replay detection by envelope id.
//
// The guard keeps a process-local last-seen map, time-bounded to the dedupe
// window (stale entries are pruned on every check), with the persisted
// dedupe rows as the audit record. This is best-effort, not exactly-once:
// two identical concurrent requests can both pass the check before either
// sighting lands, and a multi-instance deployment shares nothing. The
// record-then-decide order means even a denied duplicate refreshes the
// window.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

/// Tracks envelope sightings inside a configurable window.
pub struct DedupeGuard {
    window_seconds: i64,
    seen: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl DedupeGuard {
    /// A guard with the given window. A window of `0` disables the guard:
    /// nothing is tracked and nothing is flagged (audit rows are the
    /// caller's concern).
    pub fn new(window_seconds: i64) -> Self {
        Self {
            window_seconds,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Record a sighting of `envelope_id` at `now` and report whether a
    /// prior sighting falls inside the window.
    pub fn check(&self, envelope_id: &str, now: DateTime<Utc>) -> bool {
        if self.window_seconds <= 0 {
            return false;
        }

        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        seen.retain(|_, last| (now - *last).num_seconds() <= self.window_seconds);

        match seen.insert(envelope_id.to_string(), now) {
            Some(last) => (now - last).num_seconds() <= self.window_seconds,
            None => false,
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn first_sighting_is_not_a_duplicate() {
        let guard = DedupeGuard::new(60);
        assert!(!guard.check("env-1", Utc::now()));
    }

    #[test]
    fn repeat_inside_the_window_is_a_duplicate() {
        let guard = DedupeGuard::new(60);
        let t0 = Utc::now();
        assert!(!guard.check("env-1", t0));
        assert!(guard.check("env-1", t0 + Duration::seconds(10)));
    }

    #[test]
    fn repeat_outside_the_window_evaluates_independently() {
        let guard = DedupeGuard::new(60);
        let t0 = Utc::now();
        assert!(!guard.check("env-1", t0));
        assert!(!guard.check("env-1", t0 + Duration::seconds(70)));
    }

    #[test]
    fn boundary_repeat_at_exactly_the_window_is_a_duplicate() {
        let guard = DedupeGuard::new(60);
        let t0 = Utc::now();
        guard.check("env-1", t0);
        assert!(guard.check("env-1", t0 + Duration::seconds(60)));
    }

    #[test]
    fn a_denied_duplicate_refreshes_the_window() {
        let guard = DedupeGuard::new(60);
        let t0 = Utc::now();
        guard.check("env-1", t0);
        // Duplicate at t+40 refreshes the sighting...
        assert!(guard.check("env-1", t0 + Duration::seconds(40)));
        // ...so t+90 is still inside the window measured from t+40.
        assert!(guard.check("env-1", t0 + Duration::seconds(90)));
    }

    #[test]
    fn zero_window_never_flags_duplicates() {
        let guard = DedupeGuard::new(0);
        let t0 = Utc::now();
        assert!(!guard.check("env-1", t0));
        assert!(!guard.check("env-1", t0));
    }

    #[test]
    fn zero_window_tracks_nothing() {
        let guard = DedupeGuard::new(0);
        let t0 = Utc::now();
        for i in 0..100 {
            guard.check(&format!("env-{i}"), t0);
        }
        // Disabled guard must not accumulate state.
        assert_eq!(guard.tracked(), 0);
    }

    #[test]
    fn stale_sightings_are_pruned_on_check() {
        let guard = DedupeGuard::new(60);
        let t0 = Utc::now();
        guard.check("env-1", t0);
        guard.check("env-2", t0);
        guard.check("env-3", t0 + Duration::seconds(120));
        // The two expired sightings were dropped by the prune.
        assert_eq!(guard.tracked(), 1);
    }

    #[test]
    fn distinct_envelopes_do_not_collide() {
        let guard = DedupeGuard::new(60);
        let t0 = Utc::now();
        assert!(!guard.check("env-1", t0));
        assert!(!guard.check("env-2", t0));
    }
}
