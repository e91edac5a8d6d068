// Request/response bodies for the lease service API. Shared between the
// axum server and the HTTP-backed store client.

use crate::{lease::Lease, time::Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcquireRequest {
    pub resource_key: String,
    pub lock_type: String,
    pub holder_id: String,
    pub lease_duration_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcquireResponse {
    pub granted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease: Option<Lease>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict_holder_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict_expires_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseRequest {
    pub resource_key: String,
    pub lock_type: String,
    pub holder_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseResponse {
    pub released: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseStatusResponse {
    pub holder_id: String,
    pub expires_at: Timestamp,
    pub acquired_at: Timestamp,
    pub renewed_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
    pub active_leases: usize,
    pub stored_rows: usize,
    pub uptime_seconds: u64,
}
