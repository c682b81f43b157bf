//! # Cooldowns
//!
//! Per-user rate limiting for pixel placement.
//!
//! ## Requirements
//!
//! - A user may place at most one pixel per cooldown window
//! - Concurrent requests from one user must never both be admitted
//! - Memory must not grow with every user ever seen
//!
//! ## Implementation
//!
//! - Hash map of user id to the timestamp (ms) of their last admitted placement
//! - Check and record happen under one mutex, so admission is atomic per user
//! - A user with no entry is always eligible
//! - Once the map reaches the prune threshold, entries whose cooldown already
//!   elapsed are dropped. A dropped user is eligible either way, so pruning never
//!   changes a decision. The threshold then grows to twice the surviving entries.
use std::collections::HashMap;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Cooldown active, retry after {retry_after} ms")]
pub struct CooldownActive {
    pub retry_after: u64,
}

pub struct CooldownTracker {
    inner: Mutex<Inner>,
    min_prune_at: usize,
}

struct Inner {
    last_writes: HashMap<String, u64>,
    prune_at: usize,
}

impl CooldownTracker {
    pub fn new(prune_at: usize) -> Self {
        let prune_at = prune_at.max(1);

        Self {
            inner: Mutex::new(Inner {
                last_writes: HashMap::new(),
                prune_at,
            }),
            min_prune_at: prune_at,
        }
    }

    /// Admits `user_id` at `now` and records the write, or reports how long
    /// until they become eligible. Rejections leave the stored timestamp alone.
    ///
    /// Exactly `cooldown` ms after the last admitted write is eligible.
    pub fn check_and_record(
        &self,
        user_id: &str,
        now: u64,
        cooldown: u64,
    ) -> Result<(), CooldownActive> {
        let mut inner = self.inner.lock();

        if let Some(&last) = inner.last_writes.get(user_id) {
            // a clock that went backwards counts as no time elapsed
            let elapsed = now.saturating_sub(last);
            if elapsed < cooldown {
                return Err(CooldownActive {
                    retry_after: cooldown - elapsed,
                });
            }
        }

        if inner.last_writes.len() >= inner.prune_at {
            self.prune(&mut inner, now, cooldown);
        }

        inner.last_writes.insert(user_id.to_string(), now);
        Ok(())
    }

    /// Timestamp of the user's last admitted placement, if still tracked.
    pub fn last_write(&self, user_id: &str) -> Option<u64> {
        self.inner.lock().last_writes.get(user_id).copied()
    }

    pub fn tracked_users(&self) -> usize {
        self.inner.lock().last_writes.len()
    }

    fn prune(&self, inner: &mut Inner, now: u64, cooldown: u64) {
        let before = inner.last_writes.len();
        inner
            .last_writes
            .retain(|_, last| now.saturating_sub(*last) < cooldown);

        inner.prune_at = self.min_prune_at.max(inner.last_writes.len() * 2);

        debug!(
            "Pruned {} cooldown entries, next prune at {}",
            before - inner.last_writes.len(),
            inner.prune_at
        );
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    const COOLDOWN: u64 = 30_000;

    #[test]
    fn test_first_contact_admitted() {
        let tracker = CooldownTracker::new(100);

        assert_eq!(tracker.check_and_record("a", 0, COOLDOWN), Ok(()));
        assert_eq!(tracker.last_write("a"), Some(0));
    }

    #[test]
    fn test_rejected_inside_window() {
        let tracker = CooldownTracker::new(100);
        tracker.check_and_record("a", 1_000, COOLDOWN).unwrap();

        assert_eq!(
            tracker.check_and_record("a", 11_000, COOLDOWN),
            Err(CooldownActive {
                retry_after: 20_000
            })
        );
        assert_eq!(tracker.last_write("a"), Some(1_000));
    }

    #[test]
    fn test_boundary_is_admitted() {
        let tracker = CooldownTracker::new(100);
        tracker.check_and_record("a", 5_000, COOLDOWN).unwrap();

        assert_eq!(
            tracker.check_and_record("a", 5_000 + COOLDOWN - 1, COOLDOWN),
            Err(CooldownActive { retry_after: 1 })
        );
        assert_eq!(tracker.check_and_record("a", 5_000 + COOLDOWN, COOLDOWN), Ok(()));
        assert_eq!(tracker.last_write("a"), Some(5_000 + COOLDOWN));
    }

    #[test]
    fn test_users_are_independent() {
        let tracker = CooldownTracker::new(100);

        tracker.check_and_record("a", 0, COOLDOWN).unwrap();

        assert!(tracker.check_and_record("b", 1, COOLDOWN).is_ok());
        assert!(tracker.check_and_record("a", 2, COOLDOWN).is_err());
    }

    #[test]
    fn test_clock_backwards_rejected() {
        let tracker = CooldownTracker::new(100);
        tracker.check_and_record("a", 50_000, COOLDOWN).unwrap();

        assert_eq!(
            tracker.check_and_record("a", 40_000, COOLDOWN),
            Err(CooldownActive {
                retry_after: COOLDOWN
            })
        );
    }

    #[test]
    fn test_prune_drops_only_expired() {
        let tracker = CooldownTracker::new(3);

        tracker.check_and_record("old1", 0, COOLDOWN).unwrap();
        tracker.check_and_record("old2", 0, COOLDOWN).unwrap();
        tracker.check_and_record("fresh", 40_000, COOLDOWN).unwrap();
        assert_eq!(tracker.tracked_users(), 3);

        tracker.check_and_record("new", 45_000, COOLDOWN).unwrap();

        assert_eq!(tracker.tracked_users(), 2);
        assert_eq!(tracker.last_write("old1"), None);
        assert!(tracker.check_and_record("fresh", 46_000, COOLDOWN).is_err());
    }

    #[test]
    fn test_concurrent_same_user_single_admission() {
        let tracker = Arc::new(CooldownTracker::new(100));

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let tracker = tracker.clone();
                thread::spawn(move || tracker.check_and_record("a", 1_000 + i, COOLDOWN).is_ok())
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|&ok| ok)
            .count();

        assert_eq!(admitted, 1);
    }
}
