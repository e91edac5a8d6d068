// Consumer-facing lock facade: the only surface other subsystems touch.

use crate::{
    config::LeaseConfig,
    error::Result,
    heartbeat::{HeartbeatDriver, HeartbeatHandle},
    lease::LeaseKey,
    manager::{AcquireOutcome, LeaseManager, LockView},
    store::LeaseStore,
    HolderId,
};
use parking_lot::Mutex;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Weak,
};
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::debug;

/// Why a held lease stopped being ours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LostReason {
    /// A renewal found another holder; they took over after our lease
    /// expired.
    TakenOver(HolderId),
    /// The store was unreachable for the whole lease lifetime; its clock has
    /// expired us by now.
    Unreachable,
}

/// Lifecycle transitions surfaced to the consuming workflow. `Lost` is the
/// one that must interrupt the user: exclusive access is gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockEvent {
    Acquired,
    Blocked(HolderId),
    Released,
    Lost(LostReason),
}

/// Per-session lock handle for one `(resource, lock type)` pair.
///
/// `acquire_lock` and `release_lock` are idempotent; reactive state is
/// published through a watch channel and refreshed on every operation
/// outcome plus a periodic poll, so a session that never acquires still sees
/// other holders come and go.
#[derive(Debug)]
pub struct LockClient {
    manager: LeaseManager,
    key: LeaseKey,
    holder: HolderId,
    config: LeaseConfig,
    view_tx: watch::Sender<LockView>,
    events_tx: broadcast::Sender<LockEvent>,
    heartbeat: Mutex<Option<HeartbeatHandle>>,
    poller: Mutex<Option<JoinHandle<()>>>,
    enabled: AtomicBool,
}

impl LockClient {
    pub fn new(
        store: Arc<dyn LeaseStore>,
        key: LeaseKey,
        holder: HolderId,
        config: LeaseConfig,
    ) -> Result<Arc<Self>> {
        config.validate()?;
        if key.resource.is_empty() {
            return Err(crate::Error::EmptyResourceKey);
        }

        let manager =
            LeaseManager::new(store).with_max_lease_duration(config.max_lease_duration);
        let (view_tx, _) = watch::channel(LockView::unlocked());
        let (events_tx, _) = broadcast::channel(32);

        let client = Arc::new(Self {
            manager,
            key,
            holder,
            config,
            view_tx,
            events_tx,
            heartbeat: Mutex::new(None),
            poller: Mutex::new(None),
            enabled: AtomicBool::new(true),
        });

        let poller = Self::spawn_poller(Arc::downgrade(&client));
        *client.poller.lock() = Some(poller);
        Ok(client)
    }

    // Periodic view refresh for passive observers. Holds only a weak
    // reference so the task cannot keep a dropped client alive.
    fn spawn_poller(client: Weak<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let poll_interval = match client.upgrade() {
                Some(c) => c.config.poll_interval,
                None => return,
            };
            let mut ticker = interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(client) = client.upgrade() else { break };
                if let Err(err) = client.refresh().await {
                    debug!(key = %client.key, error = %err, "lock state poll failed");
                }
            }
        })
    }

    /// Try to take (or extend) the lock. Idempotent: calling while already
    /// holding is a renewal, not an error. Starts the heartbeat on success;
    /// returns whether the lock is ours.
    pub async fn acquire_lock(&self) -> Result<bool> {
        self.enabled.store(true, Ordering::SeqCst);
        let was_held = self.view().has_my_lock;

        match self
            .manager
            .acquire(&self.key, &self.holder, self.config.lease_duration)
            .await?
        {
            AcquireOutcome::Granted(_) => {
                self.view_tx.send_replace(LockView {
                    is_locked: false,
                    locked_by: Some(self.holder.clone()),
                    has_my_lock: true,
                });
                if !was_held {
                    let _ = self.events_tx.send(LockEvent::Acquired);
                }
                self.ensure_heartbeat();
                Ok(true)
            }
            AcquireOutcome::Blocked { holder: owner, .. } => {
                let was_blocked_by = self.view().locked_by;
                self.stop_heartbeat();
                self.view_tx.send_replace(LockView {
                    is_locked: true,
                    locked_by: Some(owner.clone()),
                    has_my_lock: false,
                });
                if was_blocked_by.as_ref() != Some(&owner) {
                    let _ = self.events_tx.send(LockEvent::Blocked(owner));
                }
                Ok(false)
            }
        }
    }

    /// Give the lock back. Idempotent: releasing without holding is a no-op.
    ///
    /// Local state is cleared and the heartbeat stopped before the store
    /// call, so even a failed release leaves us no longer renewing and the
    /// lease bounded by its expiry.
    pub async fn release_lock(&self) -> Result<()> {
        let was_held = self.view().has_my_lock;
        self.stop_heartbeat();
        self.view_tx.send_replace(LockView::unlocked());
        if was_held {
            let _ = self.events_tx.send(LockEvent::Released);
        }

        self.manager.release(&self.key, &self.holder).await?;
        Ok(())
    }

    /// The consuming context becoming active or inactive. Going inactive
    /// stops the heartbeat and releases, exactly like navigating away.
    pub async fn set_enabled(&self, enabled: bool) -> Result<()> {
        if enabled {
            self.enabled.store(true, Ordering::SeqCst);
            return Ok(());
        }
        self.enabled.store(false, Ordering::SeqCst);
        self.release_lock().await
    }

    /// Re-read the store and publish the current view.
    pub async fn refresh(&self) -> Result<LockView> {
        let view = self.manager.inspect(&self.key, &self.holder).await?;
        self.view_tx.send_replace(view.clone());
        Ok(view)
    }

    pub fn view(&self) -> LockView {
        self.view_tx.borrow().clone()
    }

    /// A valid foreign lease exists.
    pub fn is_locked(&self) -> bool {
        self.view().is_locked
    }

    /// Holder of the current valid lease, for display.
    pub fn locked_by(&self) -> Option<HolderId> {
        self.view().locked_by
    }

    /// A valid lease exists and it is ours.
    pub fn has_my_lock(&self) -> bool {
        self.view().has_my_lock
    }

    /// Reactive lock state; fires on every published change.
    pub fn subscribe(&self) -> watch::Receiver<LockView> {
        self.view_tx.subscribe()
    }

    /// Lifecycle transitions: acquired, blocked, released, lost.
    pub fn events(&self) -> broadcast::Receiver<LockEvent> {
        self.events_tx.subscribe()
    }

    pub fn holder(&self) -> &HolderId {
        &self.holder
    }

    pub fn key(&self) -> &LeaseKey {
        &self.key
    }

    fn ensure_heartbeat(&self) {
        let mut guard = self.heartbeat.lock();
        let running = guard.as_ref().is_some_and(|h| !h.is_finished());
        if !running {
            *guard = Some(HeartbeatDriver::spawn(
                self.manager.clone(),
                self.key.clone(),
                self.holder.clone(),
                self.config.lease_duration,
                self.config.heartbeat_interval,
                self.view_tx.clone(),
                self.events_tx.clone(),
            ));
        }
    }

    fn stop_heartbeat(&self) {
        if let Some(handle) = self.heartbeat.lock().take() {
            handle.stop();
        }
    }
}

impl Drop for LockClient {
    fn drop(&mut self) {
        // Heartbeat stops via its own Drop; the lease itself is reclaimed by
        // expiry if no explicit release happened.
        if let Some(poller) = self.poller.lock().take() {
            poller.abort();
        }
    }
}
