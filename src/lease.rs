// Core lease data model: the only persistent entity in the system.

use crate::{time::Timestamp, HolderId};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label partitioning independent lock namespaces over the same resource.
///
/// "selling" and "editing-details" leases on one vehicle coexist; each
/// `(resource, lock type)` pair is its own exclusive namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockType(String);

impl LockType {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LockType {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl From<String> for LockType {
    fn from(label: String) -> Self {
        Self(label)
    }
}

impl fmt::Display for LockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a lease covers: an opaque resource id plus a lock type namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeaseKey {
    pub resource: String,
    pub lock_type: LockType,
}

impl LeaseKey {
    pub fn new(resource: impl Into<String>, lock_type: impl Into<LockType>) -> Self {
        Self {
            resource: resource.into(),
            lock_type: lock_type.into(),
        }
    }
}

impl fmt::Display for LeaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource, self.lock_type)
    }
}

/// A time-bounded exclusive grant over a resource key.
///
/// `expires_at` is the authoritative validity boundary: a lease is valid iff
/// `now < expires_at`. Expired rows are logically absent even while still in
/// storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lease {
    pub resource_key: String,
    pub lock_type: LockType,
    #[serde(rename = "holderId")]
    pub holder: HolderId,
    /// First successful acquisition of the current holding period.
    pub acquired_at: Timestamp,
    /// Most recent successful renewal; equals `acquired_at` initially.
    pub renewed_at: Timestamp,
    pub expires_at: Timestamp,
}

impl Lease {
    pub fn new(key: &LeaseKey, holder: &HolderId, now: Timestamp, ttl: Duration) -> Self {
        Self {
            resource_key: key.resource.clone(),
            lock_type: key.lock_type.clone(),
            holder: holder.clone(),
            acquired_at: now,
            renewed_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn key(&self) -> LeaseKey {
        LeaseKey::new(self.resource_key.clone(), self.lock_type.clone())
    }

    pub fn is_valid(&self, now: Timestamp) -> bool {
        now < self.expires_at
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        !self.is_valid(now)
    }

    /// Time remaining until expiry, `None` once expired.
    pub fn remaining(&self, now: Timestamp) -> Option<std::time::Duration> {
        if self.is_valid(now) {
            (self.expires_at - now).to_std().ok()
        } else {
            None
        }
    }

    /// The same holding period extended from `now`.
    ///
    /// `acquired_at` is preserved and `expires_at` never moves backward, so a
    /// renewal delivered out of order cannot shorten the lease.
    pub fn renewed(&self, now: Timestamp, ttl: Duration) -> Self {
        let mut next = self.clone();
        next.renewed_at = now;
        next.expires_at = next.expires_at.max(now + ttl);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{Clock, ManualClock};

    fn key() -> LeaseKey {
        LeaseKey::new("vehicle-17", "selling")
    }

    #[test]
    fn validity_boundary_is_exclusive() {
        let clock = ManualClock::at_epoch();
        let lease = Lease::new(
            &key(),
            &HolderId::new("alice"),
            clock.now(),
            Duration::milliseconds(1000),
        );

        assert!(lease.is_valid(clock.now()));
        clock.set_ms(999);
        assert!(lease.is_valid(clock.now()));
        clock.set_ms(1000);
        assert!(lease.is_expired(clock.now()));
        clock.set_ms(1001);
        assert!(lease.is_expired(clock.now()));
    }

    #[test]
    fn renewal_preserves_acquired_at_and_advances_expiry() {
        let clock = ManualClock::at_epoch();
        let lease = Lease::new(
            &key(),
            &HolderId::new("alice"),
            clock.now(),
            Duration::milliseconds(1000),
        );

        clock.set_ms(500);
        let renewed = lease.renewed(clock.now(), Duration::milliseconds(1000));
        assert_eq!(renewed.acquired_at, lease.acquired_at);
        assert_eq!(renewed.renewed_at, clock.now());
        assert_eq!(renewed.expires_at, lease.expires_at + Duration::milliseconds(500));
    }

    #[test]
    fn renewal_never_moves_expiry_backward() {
        let clock = ManualClock::at_epoch();
        let lease = Lease::new(
            &key(),
            &HolderId::new("alice"),
            clock.now(),
            Duration::milliseconds(5000),
        );

        // A shorter renewal landing later must not shrink the lease.
        clock.set_ms(100);
        let renewed = lease.renewed(clock.now(), Duration::milliseconds(1000));
        assert_eq!(renewed.expires_at, lease.expires_at);
    }

    #[test]
    fn lock_types_are_distinct_keys() {
        let selling = LeaseKey::new("vehicle-17", "selling");
        let editing = LeaseKey::new("vehicle-17", "editing-details");
        assert_ne!(selling, editing);
    }
}
