use crate::{
    error::{Error, Result},
    lease::{Lease, LeaseKey},
    store::{LeaseStore, PutOutcome},
    time::{Clock, SystemClock},
    HolderId,
};
use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use std::{sync::Arc, time::Duration};

/// In-process lease store backed by a concurrent map.
///
/// The compare-and-set runs inside a single `entry` scope, so the expiry
/// check and the holder write happen under one shard lock with no window in
/// between.
#[derive(Debug)]
pub struct MemoryLeaseStore {
    leases: DashMap<LeaseKey, Lease>,
    clock: Arc<dyn Clock>,
}

impl MemoryLeaseStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            leases: DashMap::new(),
            clock,
        }
    }

    /// Number of stored rows, stale ones included. Feeds the status endpoint.
    pub fn len(&self) -> usize {
        self.leases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leases.is_empty()
    }

    /// Number of currently valid leases.
    pub fn active_count(&self) -> usize {
        let now = self.clock.now();
        self.leases
            .iter()
            .filter(|entry| entry.value().is_valid(now))
            .count()
    }

    /// Drop stale rows. Storage hygiene only; expiry is always re-checked on
    /// read, so correctness never depends on this running.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.leases.len();
        self.leases.retain(|_, lease| lease.is_valid(now));
        before.saturating_sub(self.leases.len())
    }

    fn chrono_ttl(ttl: Duration) -> Result<chrono::Duration> {
        chrono::Duration::from_std(ttl)
            .map_err(|e| Error::Store(format!("lease duration out of range: {e}")))
    }
}

impl Default for MemoryLeaseStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LeaseStore for MemoryLeaseStore {
    async fn get(&self, key: &LeaseKey) -> Result<Option<Lease>> {
        let now = self.clock.now();
        Ok(self
            .leases
            .get(key)
            .filter(|lease| lease.is_valid(now))
            .map(|lease| lease.clone()))
    }

    async fn put_if_absent_or_expired(
        &self,
        key: &LeaseKey,
        holder: &HolderId,
        ttl: Duration,
    ) -> Result<PutOutcome> {
        let ttl = Self::chrono_ttl(ttl)?;
        let now = self.clock.now();

        match self.leases.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let current = occupied.get();
                if current.holder == *holder && current.is_valid(now) {
                    // Renewal: same holding period, monotonic expiry.
                    let renewed = current.renewed(now, ttl);
                    occupied.insert(renewed.clone());
                    Ok(PutOutcome::Granted(renewed))
                } else if current.is_expired(now) {
                    // Stale row: anyone may take over, starting a new
                    // holding period even for the previous holder.
                    let lease = Lease::new(key, holder, now, ttl);
                    occupied.insert(lease.clone());
                    Ok(PutOutcome::Granted(lease))
                } else {
                    Ok(PutOutcome::Conflict {
                        holder: current.holder.clone(),
                        expires_at: current.expires_at,
                    })
                }
            }
            Entry::Vacant(vacant) => {
                let lease = Lease::new(key, holder, now, ttl);
                vacant.insert(lease.clone());
                Ok(PutOutcome::Granted(lease))
            }
        }
    }

    async fn delete(&self, key: &LeaseKey, holder: &HolderId) -> Result<bool> {
        // The guard only protects other holders from a late release. A row
        // still owned by `holder` is removed even if it has already expired;
        // the caller gave it up either way and the row is dead weight.
        Ok(self
            .leases
            .remove_if(key, |_, lease| lease.holder == *holder)
            .is_some())
    }
}
