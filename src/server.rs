// HTTP surface for the lease store deployed as a shared service.

use crate::{
    error::Error,
    lease::LeaseKey,
    manager::{AcquireOutcome, LeaseManager},
    store::{LeaseStore, MemoryLeaseStore},
    wire::{
        AcquireRequest, AcquireResponse, LeaseStatusResponse, ReleaseRequest, ReleaseResponse,
        ServerStatus,
    },
    HolderId,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct AppState {
    pub manager: LeaseManager,
    pub store: Arc<MemoryLeaseStore>,
    pub started: Instant,
}

impl AppState {
    pub fn new(store: Arc<MemoryLeaseStore>, manager: LeaseManager) -> Self {
        Self {
            manager,
            store,
            started: Instant::now(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/leases/acquire", post(acquire))
        .route("/leases/release", post(release))
        .route("/leases/:resource_key/:lock_type", get(get_lease))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Periodic stale-row sweep. Hygiene only: expiry is re-checked on every
/// read, so the service stays correct even if this task never runs.
pub fn spawn_sweeper(store: Arc<MemoryLeaseStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let purged = store.purge_expired();
            if purged > 0 {
                debug!(purged, "swept expired leases");
            }
        }
    })
}

type ApiError = (StatusCode, String);

fn to_api_error(err: Error) -> ApiError {
    match err {
        Error::InvalidLeaseDuration { .. }
        | Error::EmptyResourceKey
        | Error::InvalidHeartbeatInterval { .. }
        | Error::InvalidPollInterval => (StatusCode::BAD_REQUEST, err.to_string()),
        other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    }
}

async fn acquire(
    State(state): State<AppState>,
    Json(request): Json<AcquireRequest>,
) -> Result<Json<AcquireResponse>, ApiError> {
    if request.lease_duration_ms <= 0 {
        return Err(to_api_error(Error::InvalidLeaseDuration {
            millis: request.lease_duration_ms,
        }));
    }
    let key = LeaseKey::new(request.resource_key, request.lock_type);
    let holder = HolderId::new(request.holder_id);
    let ttl = Duration::from_millis(request.lease_duration_ms as u64);

    let outcome = state
        .manager
        .acquire(&key, &holder, ttl)
        .await
        .map_err(to_api_error)?;

    Ok(Json(match outcome {
        AcquireOutcome::Granted(lease) => AcquireResponse {
            granted: true,
            lease: Some(lease),
            conflict_holder_id: None,
            conflict_expires_at: None,
        },
        AcquireOutcome::Blocked { holder, expires_at } => AcquireResponse {
            granted: false,
            lease: None,
            conflict_holder_id: Some(holder.to_string()),
            conflict_expires_at: Some(expires_at),
        },
    }))
}

async fn release(
    State(state): State<AppState>,
    Json(request): Json<ReleaseRequest>,
) -> Result<Json<ReleaseResponse>, ApiError> {
    let key = LeaseKey::new(request.resource_key, request.lock_type);
    let holder = HolderId::new(request.holder_id);

    let released = state
        .manager
        .release(&key, &holder)
        .await
        .map_err(to_api_error)?;
    Ok(Json(ReleaseResponse { released }))
}

async fn get_lease(
    State(state): State<AppState>,
    Path((resource_key, lock_type)): Path<(String, String)>,
) -> Result<Json<LeaseStatusResponse>, ApiError> {
    let key = LeaseKey::new(resource_key, lock_type);
    let lease = state.store.get(&key).await.map_err(to_api_error)?;

    match lease {
        Some(lease) => Ok(Json(LeaseStatusResponse {
            holder_id: lease.holder.to_string(),
            expires_at: lease.expires_at,
            acquired_at: lease.acquired_at,
            renewed_at: lease.renewed_at,
        })),
        None => Err((StatusCode::NOT_FOUND, "no valid lease".to_string())),
    }
}

async fn get_status(State(state): State<AppState>) -> Json<ServerStatus> {
    Json(ServerStatus {
        active_leases: state.store.active_count(),
        stored_rows: state.store.len(),
        uptime_seconds: state.started.elapsed().as_secs(),
    })
}
