// Acquisition policy over the lease store.

use crate::{
    error::{Error, Result},
    lease::{Lease, LeaseKey},
    store::{LeaseStore, PutOutcome},
    time::Timestamp,
    HolderId,
};
use std::{sync::Arc, time::Duration};
use tracing::debug;

/// Result of an acquire or renew attempt. A conflict is an expected outcome,
/// not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireOutcome {
    Granted(Lease),
    /// A valid foreign lease is in the way; its holder is what the UI shows
    /// as "locked by".
    Blocked {
        holder: HolderId,
        expires_at: Timestamp,
    },
}

impl AcquireOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }
}

/// The three booleans the UI needs, derived from one read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockView {
    /// A valid foreign lease exists.
    pub is_locked: bool,
    /// Holder of the current valid lease, for display.
    pub locked_by: Option<HolderId>,
    /// A valid lease exists and it is ours.
    pub has_my_lock: bool,
}

impl LockView {
    pub fn unlocked() -> Self {
        Self {
            is_locked: false,
            locked_by: None,
            has_my_lock: false,
        }
    }
}

/// Stateless lease policy: validation plus a single store primitive per
/// operation. Renewal is re-acquisition by the same holder, so acquire and
/// renew cannot diverge.
#[derive(Debug, Clone)]
pub struct LeaseManager {
    store: Arc<dyn LeaseStore>,
    max_lease_duration: Duration,
}

impl LeaseManager {
    pub const DEFAULT_MAX_LEASE_DURATION: Duration = Duration::from_secs(300);

    pub fn new(store: Arc<dyn LeaseStore>) -> Self {
        Self {
            store,
            max_lease_duration: Self::DEFAULT_MAX_LEASE_DURATION,
        }
    }

    pub fn with_max_lease_duration(mut self, max: Duration) -> Self {
        self.max_lease_duration = max;
        self
    }

    fn validate(key: &LeaseKey, ttl: Duration) -> Result<()> {
        if key.resource.is_empty() {
            return Err(Error::EmptyResourceKey);
        }
        if ttl.is_zero() {
            return Err(Error::InvalidLeaseDuration { millis: 0 });
        }
        Ok(())
    }

    /// Try to take (or extend) the lease on `key` for `holder`.
    ///
    /// Requested durations above the configured maximum are clamped, so a
    /// misbehaving client cannot park a lease for hours.
    pub async fn acquire(
        &self,
        key: &LeaseKey,
        holder: &HolderId,
        ttl: Duration,
    ) -> Result<AcquireOutcome> {
        Self::validate(key, ttl)?;
        let ttl = ttl.min(self.max_lease_duration);

        match self.store.put_if_absent_or_expired(key, holder, ttl).await? {
            PutOutcome::Granted(lease) => {
                debug!(key = %key, holder = %holder, expires_at = %lease.expires_at, "lease granted");
                Ok(AcquireOutcome::Granted(lease))
            }
            PutOutcome::Conflict { holder: owner, expires_at } => {
                debug!(key = %key, holder = %holder, owner = %owner, "lease blocked");
                Ok(AcquireOutcome::Blocked {
                    holder: owner,
                    expires_at,
                })
            }
        }
    }

    /// Extend a held lease. Same call path as [`acquire`](Self::acquire):
    /// renewal is re-acquisition by the current holder.
    pub async fn renew(
        &self,
        key: &LeaseKey,
        holder: &HolderId,
        ttl: Duration,
    ) -> Result<AcquireOutcome> {
        self.acquire(key, holder, ttl).await
    }

    /// Release the lease if `holder` still owns it. Returns whether a lease
    /// was actually removed; releasing without holding is a no-op.
    pub async fn release(&self, key: &LeaseKey, holder: &HolderId) -> Result<bool> {
        if key.resource.is_empty() {
            return Err(Error::EmptyResourceKey);
        }
        let released = self.store.delete(key, holder).await?;
        if released {
            debug!(key = %key, holder = %holder, "lease released");
        }
        Ok(released)
    }

    /// Pure read: derive the UI-facing view for `asking_holder`.
    pub async fn inspect(&self, key: &LeaseKey, asking_holder: &HolderId) -> Result<LockView> {
        match self.store.get(key).await? {
            None => Ok(LockView::unlocked()),
            Some(lease) => {
                let mine = lease.holder == *asking_holder;
                Ok(LockView {
                    is_locked: !mine,
                    locked_by: Some(lease.holder),
                    has_my_lock: mine,
                })
            }
        }
    }
}
