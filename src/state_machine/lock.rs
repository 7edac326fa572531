//! Advisory single-writer lease on a workflow instance.
//!
//! Acquisition is a non-blocking, single-attempt ownership check, not a
//! queue: a caller that loses simply receives a contention error naming
//! the remaining wait and must retry. A lease older than its timeout is
//! reclaimed by the next acquirer, trading a double-holder window at the
//! expiry boundary for liveness against stalled holders.

use crate::error::{Result, WorkflowError};
use crate::models::User;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// An explicit lease: owner identity plus acquisition and expiry instants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockLease {
    pub owner_id: String,
    pub owner_name: String,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl LockLease {
    pub fn new(user: &User, timeout: Duration, now: DateTime<Utc>) -> Self {
        Self {
            owner_id: user.id.clone(),
            owner_name: user.display_name(),
            acquired_at: now,
            expires_at: now + timeout,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn remaining_ms_at(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_milliseconds().max(0)
    }

    pub fn is_held_by(&self, user: &User) -> bool {
        self.owner_id == user.id
    }
}

/// Attempt to take or renew the lease in `slot`.
///
/// Owned by nobody, or by the same user, or by a holder whose lease has
/// expired: the slot is (re)written with a fresh lease. Held unexpired by
/// another user: fails with [`WorkflowError::LockContention`].
pub(crate) fn try_acquire(
    slot: &mut Option<LockLease>,
    user: &User,
    timeout: Duration,
    now: DateTime<Utc>,
) -> Result<()> {
    if let Some(lease) = slot.as_ref() {
        if !lease.is_held_by(user) {
            if lease.is_expired_at(now) {
                tracing::warn!(
                    previous_owner = %lease.owner_name,
                    new_owner = %user.display_name(),
                    "Reclaiming expired workflow lease"
                );
            } else {
                return Err(WorkflowError::LockContention {
                    owner: lease.owner_name.clone(),
                    remaining_ms: lease.remaining_ms_at(now),
                });
            }
        }
    }

    *slot = Some(LockLease::new(user, timeout, now));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> (User, User) {
        (
            User::new("a", "alice").with_name("Alice", "A"),
            User::new("b", "bob").with_name("Bob", "B"),
        )
    }

    #[test]
    fn test_acquire_when_unlocked() {
        let (alice, _) = users();
        let mut slot = None;
        let now = Utc::now();

        try_acquire(&mut slot, &alice, Duration::milliseconds(30_000), now).unwrap();
        let lease = slot.unwrap();
        assert_eq!(lease.owner_id, "a");
        assert_eq!(lease.remaining_ms_at(now), 30_000);
    }

    #[test]
    fn test_contention_reports_remaining_wait() {
        let (alice, bob) = users();
        let mut slot = None;
        let now = Utc::now();

        try_acquire(&mut slot, &alice, Duration::milliseconds(30_000), now).unwrap();

        let later = now + Duration::milliseconds(10_000);
        let err = try_acquire(&mut slot, &bob, Duration::milliseconds(30_000), later).unwrap_err();
        match err {
            WorkflowError::LockContention {
                owner,
                remaining_ms,
            } => {
                assert_eq!(owner, "Alice A");
                assert_eq!(remaining_ms, 20_000);
            }
            other => panic!("expected contention, got {other:?}"),
        }
        // Alice still holds the lease
        assert_eq!(slot.unwrap().owner_id, "a");
    }

    #[test]
    fn test_expired_lease_is_reclaimed() {
        let (alice, bob) = users();
        let mut slot = None;
        let now = Utc::now();

        try_acquire(&mut slot, &alice, Duration::milliseconds(100), now).unwrap();

        let after_expiry = now + Duration::milliseconds(101);
        try_acquire(
            &mut slot,
            &bob,
            Duration::milliseconds(30_000),
            after_expiry,
        )
        .unwrap();
        assert_eq!(slot.unwrap().owner_id, "b");
    }

    // The documented double-holder window: exactly at the expiry instant
    // the lease counts as expired and the second caller wins.
    #[test]
    fn test_expiry_boundary_goes_to_the_challenger() {
        let (alice, bob) = users();
        let mut slot = None;
        let now = Utc::now();

        try_acquire(&mut slot, &alice, Duration::milliseconds(100), now).unwrap();

        let at_expiry = now + Duration::milliseconds(100);
        try_acquire(&mut slot, &bob, Duration::milliseconds(100), at_expiry).unwrap();
        assert_eq!(slot.as_ref().unwrap().owner_id, "b");
    }

    #[test]
    fn test_same_user_renews() {
        let (alice, _) = users();
        let mut slot = None;
        let now = Utc::now();

        try_acquire(&mut slot, &alice, Duration::milliseconds(1_000), now).unwrap();
        let first_expiry = slot.as_ref().unwrap().expires_at;

        let later = now + Duration::milliseconds(500);
        try_acquire(&mut slot, &alice, Duration::milliseconds(1_000), later).unwrap();
        assert!(slot.as_ref().unwrap().expires_at > first_expiry);
    }
}
