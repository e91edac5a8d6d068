// Lease storage: the single source of truth for who holds what.

use crate::{
    error::Result,
    lease::{Lease, LeaseKey},
    time::Timestamp,
    HolderId,
};
use async_trait::async_trait;
use std::time::Duration;

mod memory;
mod remote;

pub use memory::MemoryLeaseStore;
pub use remote::RemoteLeaseStore;

/// Outcome of the store's single atomic write primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    /// The lease is ours: fresh grant, takeover of an expired row, or a
    /// same-holder renewal.
    Granted(Lease),
    /// An unexpired foreign lease is in the way.
    Conflict {
        holder: HolderId,
        expires_at: Timestamp,
    },
}

impl PutOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }
}

/// Shared mapping from `(resource, lock type)` to at most one lease.
///
/// Implementations must be safe for unbounded concurrent callers, and
/// `put_if_absent_or_expired` must check expiry and write the new holder in
/// one atomic step. All timestamps are assigned by the store's own clock;
/// callers supply only a requested duration.
#[async_trait]
pub trait LeaseStore: Send + Sync + std::fmt::Debug {
    /// Current valid lease for the key, if any. Expired rows are treated as
    /// absent; the read has no side effects.
    async fn get(&self, key: &LeaseKey) -> Result<Option<Lease>>;

    /// Atomically grant the lease to `holder` if the slot is absent, expired,
    /// or already held by `holder` (renewal). Same-holder renewals preserve
    /// `acquired_at` and never move `expires_at` backward.
    async fn put_if_absent_or_expired(
        &self,
        key: &LeaseKey,
        holder: &HolderId,
        ttl: Duration,
    ) -> Result<PutOutcome>;

    /// Remove the lease only while `holder` owns it, so a late release from a
    /// prior holding period cannot delete a newer holder's lease. Returns
    /// whether a row was deleted.
    async fn delete(&self, key: &LeaseKey, holder: &HolderId) -> Result<bool>;
}
