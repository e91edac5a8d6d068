// Background renewal loop keeping a held lease alive.

use crate::{
    client::{LockEvent, LostReason},
    lease::LeaseKey,
    manager::{AcquireOutcome, LeaseManager, LockView},
    HolderId,
};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
    time::{interval, Instant, MissedTickBehavior},
};
use tracing::{debug, warn};

/// Handle to a running heartbeat. Stopping is synchronous: once `stop`
/// returns, no further renewal tick can run.
#[derive(Debug)]
pub struct HeartbeatHandle {
    stopped: Arc<AtomicBool>,
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl HeartbeatHandle {
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        let _ = self.stop_tx.send(true);
        self.task.abort();
    }

    /// True once the loop has exited, whether stopped or self-terminated on
    /// a lost lease.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for HeartbeatHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Periodic renewal driver for one held lease.
///
/// Transient renewal failures are retried on the next tick without telling
/// anyone; the interval is at most a third of the lease duration, so a couple
/// of failed ticks cannot lapse the lease. Only losing the lease itself, to a
/// takeover or to failures spanning the whole lease lifetime, escalates.
pub struct HeartbeatDriver;

impl HeartbeatDriver {
    pub fn spawn(
        manager: LeaseManager,
        key: LeaseKey,
        holder: HolderId,
        lease_duration: Duration,
        heartbeat_interval: Duration,
        view_tx: watch::Sender<LockView>,
        events_tx: broadcast::Sender<LockEvent>,
    ) -> HeartbeatHandle {
        let stopped = Arc::new(AtomicBool::new(false));
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let stop_flag = stopped.clone();
        let task = tokio::spawn(async move {
            let mut ticker = interval(heartbeat_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; the acquire that started
            // us already stamped the lease.
            ticker.tick().await;

            let mut last_renewed = Instant::now();
            loop {
                tokio::select! {
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {}
                }
                if stop_flag.load(Ordering::SeqCst) {
                    break;
                }

                match manager.renew(&key, &holder, lease_duration).await {
                    Ok(AcquireOutcome::Granted(lease)) => {
                        last_renewed = Instant::now();
                        debug!(key = %key, holder = %holder, expires_at = %lease.expires_at, "lease renewed");
                        view_tx.send_replace(LockView {
                            is_locked: false,
                            locked_by: Some(holder.clone()),
                            has_my_lock: true,
                        });
                    }
                    Ok(AcquireOutcome::Blocked { holder: owner, .. }) => {
                        // Someone took over after an expiry; our exclusive
                        // access is gone right now.
                        warn!(key = %key, holder = %holder, owner = %owner, "lease lost to another holder");
                        view_tx.send_replace(LockView {
                            is_locked: true,
                            locked_by: Some(owner.clone()),
                            has_my_lock: false,
                        });
                        let _ = events_tx.send(LockEvent::Lost(LostReason::TakenOver(owner)));
                        break;
                    }
                    Err(err) => {
                        if last_renewed.elapsed() >= lease_duration {
                            // The store has been unreachable for the whole
                            // lease lifetime; its clock has expired us by now.
                            warn!(key = %key, holder = %holder, error = %err, "lease presumed lost, store unreachable");
                            view_tx.send_replace(LockView::unlocked());
                            let _ = events_tx.send(LockEvent::Lost(LostReason::Unreachable));
                            break;
                        }
                        debug!(key = %key, holder = %holder, error = %err, "renewal failed, retrying next tick");
                    }
                }
            }
        });

        HeartbeatHandle {
            stopped,
            stop_tx,
            task,
        }
    }
}
