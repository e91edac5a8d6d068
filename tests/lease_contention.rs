use leasehold::{
    time::ManualClock, AcquireOutcome, HolderId, LeaseKey, LeaseManager, MemoryLeaseStore,
};
use std::{sync::Arc, time::Duration};

fn manager_with_clock() -> (Arc<ManualClock>, LeaseManager) {
    let clock = Arc::new(ManualClock::at_epoch());
    let store = Arc::new(MemoryLeaseStore::with_clock(clock.clone()));
    (clock, LeaseManager::new(store))
}

fn vehicle_key() -> LeaseKey {
    LeaseKey::new("vehicle-17", "selling")
}

#[tokio::test]
async fn at_most_one_concurrent_acquire_wins() {
    let store = Arc::new(MemoryLeaseStore::new());
    let manager = LeaseManager::new(store);

    let mut handles = Vec::new();
    for i in 0..16 {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            let holder = HolderId::new(format!("session-{i}"));
            manager
                .acquire(&vehicle_key(), &holder, Duration::from_secs(30))
                .await
                .unwrap()
                .is_granted()
        }));
    }

    let mut granted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            granted += 1;
        }
    }
    assert_eq!(granted, 1, "exactly one concurrent acquirer may win");
}

#[tokio::test]
async fn self_acquire_is_an_idempotent_renewal() {
    let (clock, manager) = manager_with_clock();
    let alice = HolderId::new("alice");

    let first = match manager
        .acquire(&vehicle_key(), &alice, Duration::from_millis(1000))
        .await
        .unwrap()
    {
        AcquireOutcome::Granted(lease) => lease,
        AcquireOutcome::Blocked { .. } => panic!("fresh acquire blocked"),
    };
    assert_eq!(first.expires_at.timestamp_millis(), 1000);

    clock.set_ms(400);
    let second = match manager
        .acquire(&vehicle_key(), &alice, Duration::from_millis(1000))
        .await
        .unwrap()
    {
        AcquireOutcome::Granted(lease) => lease,
        AcquireOutcome::Blocked { .. } => panic!("self re-acquire blocked"),
    };
    assert_eq!(second.expires_at.timestamp_millis(), 1400);
    assert_eq!(second.acquired_at, first.acquired_at);
}

#[tokio::test]
async fn expiry_enables_takeover() {
    let (clock, manager) = manager_with_clock();
    let alice = HolderId::new("alice");
    let bob = HolderId::new("bob");

    manager
        .acquire(&vehicle_key(), &alice, Duration::from_millis(1000))
        .await
        .unwrap();

    clock.set_ms(999);
    assert!(!manager
        .acquire(&vehicle_key(), &bob, Duration::from_millis(1000))
        .await
        .unwrap()
        .is_granted());

    clock.set_ms(1001);
    let outcome = manager
        .acquire(&vehicle_key(), &bob, Duration::from_millis(1000))
        .await
        .unwrap();
    match outcome {
        AcquireOutcome::Granted(lease) => assert_eq!(lease.holder, bob),
        AcquireOutcome::Blocked { .. } => panic!("expired lease blocked takeover"),
    }
}

#[tokio::test]
async fn stale_release_never_deletes_a_newer_holders_lease() {
    let (clock, manager) = manager_with_clock();
    let alice = HolderId::new("alice");
    let bob = HolderId::new("bob");

    manager
        .acquire(&vehicle_key(), &alice, Duration::from_millis(1000))
        .await
        .unwrap();

    // A foreign release while the lease is valid is a no-op.
    assert!(!manager.release(&vehicle_key(), &bob).await.unwrap());
    let view = manager.inspect(&vehicle_key(), &alice).await.unwrap();
    assert!(view.has_my_lock);

    // Alice's lease lapses and Bob takes over; Alice's late release from the
    // old holding period must not free Bob's lease.
    clock.set_ms(2000);
    manager
        .acquire(&vehicle_key(), &bob, Duration::from_millis(1000))
        .await
        .unwrap();
    assert!(!manager.release(&vehicle_key(), &alice).await.unwrap());

    let view = manager.inspect(&vehicle_key(), &bob).await.unwrap();
    assert!(view.has_my_lock);
}

#[tokio::test]
async fn renewals_only_move_expiry_forward() {
    let (clock, manager) = manager_with_clock();
    let alice = HolderId::new("alice");

    manager
        .acquire(&vehicle_key(), &alice, Duration::from_millis(5000))
        .await
        .unwrap();

    // A renewal computed from an earlier "now" with a shorter duration must
    // not pull the expiry back.
    clock.set_ms(100);
    let renewed = match manager
        .renew(&vehicle_key(), &alice, Duration::from_millis(1000))
        .await
        .unwrap()
    {
        AcquireOutcome::Granted(lease) => lease,
        AcquireOutcome::Blocked { .. } => panic!("renewal blocked"),
    };
    assert_eq!(renewed.expires_at.timestamp_millis(), 5000);
}

// The timed walkthrough: A at t=0, B probing at 200 and 600, A renewing at
// 500, takeover at 1600.
#[tokio::test]
async fn contention_timeline() {
    let (clock, manager) = manager_with_clock();
    let a = HolderId::new("A");
    let b = HolderId::new("B");
    let ttl = Duration::from_millis(1000);

    let granted = match manager.acquire(&vehicle_key(), &a, ttl).await.unwrap() {
        AcquireOutcome::Granted(lease) => lease,
        AcquireOutcome::Blocked { .. } => panic!("fresh acquire blocked"),
    };
    assert_eq!(granted.expires_at.timestamp_millis(), 1000);

    clock.set_ms(200);
    match manager.acquire(&vehicle_key(), &b, ttl).await.unwrap() {
        AcquireOutcome::Blocked { holder, .. } => assert_eq!(holder, a),
        AcquireOutcome::Granted(_) => panic!("B acquired over A's valid lease"),
    }

    clock.set_ms(500);
    let renewed = match manager.renew(&vehicle_key(), &a, ttl).await.unwrap() {
        AcquireOutcome::Granted(lease) => lease,
        AcquireOutcome::Blocked { .. } => panic!("A's renewal blocked"),
    };
    assert_eq!(renewed.expires_at.timestamp_millis(), 1500);

    clock.set_ms(600);
    assert!(!manager
        .acquire(&vehicle_key(), &b, ttl)
        .await
        .unwrap()
        .is_granted());

    clock.set_ms(1600);
    let takeover = match manager.acquire(&vehicle_key(), &b, ttl).await.unwrap() {
        AcquireOutcome::Granted(lease) => lease,
        AcquireOutcome::Blocked { .. } => panic!("B blocked after A's lease lapsed"),
    };
    assert_eq!(takeover.holder, b);
}

#[tokio::test]
async fn lock_types_are_independent_namespaces() {
    let (_clock, manager) = manager_with_clock();
    let alice = HolderId::new("alice");
    let bob = HolderId::new("bob");

    let selling = LeaseKey::new("vehicle-1", "selling");
    let editing = LeaseKey::new("vehicle-1", "editing-details");

    assert!(manager
        .acquire(&selling, &alice, Duration::from_secs(10))
        .await
        .unwrap()
        .is_granted());
    assert!(manager
        .acquire(&editing, &bob, Duration::from_secs(10))
        .await
        .unwrap()
        .is_granted());

    // Each namespace still excludes its own contenders.
    assert!(!manager
        .acquire(&selling, &bob, Duration::from_secs(10))
        .await
        .unwrap()
        .is_granted());
}
