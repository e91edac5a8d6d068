use anyhow::Context;
use leasehold::{
    server::{router, spawn_sweeper, AppState},
    LeaseManager, MemoryLeaseStore,
};
use std::{env, net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn env_duration_ms(var: &str, default_ms: u64) -> Duration {
    env::var(var)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(default_ms))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let bind_addr = env::var("LEASEHOLD_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:7400".to_string());
    let max_lease = env_duration_ms("LEASEHOLD_MAX_LEASE_MS", 300_000);
    let sweep_interval = env_duration_ms("LEASEHOLD_SWEEP_INTERVAL_MS", 60_000);

    info!("leasehold lease service starting");
    info!("bind address: {bind_addr}");
    info!("max lease duration: {}ms", max_lease.as_millis());

    let store = Arc::new(MemoryLeaseStore::new());
    let manager = LeaseManager::new(store.clone()).with_max_lease_duration(max_lease);
    spawn_sweeper(store.clone(), sweep_interval);

    let app = router(AppState::new(store, manager));

    let addr: SocketAddr = bind_addr.parse().context("invalid bind address")?;
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("listening on {addr}");
    info!("API endpoints:");
    info!("  POST /leases/acquire                - acquire or renew a lease");
    info!("  POST /leases/release                - release a held lease");
    info!("  GET  /leases/:resourceKey/:lockType - current lease, 404 if none");
    info!("  GET  /status                        - service status");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
