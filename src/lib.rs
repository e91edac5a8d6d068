#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Lease-based advisory record locking.
//!
//! Many short-lived client sessions contend for named resources; whoever
//! lands the atomic compare-and-set first holds the lease until renewal
//! stops, an explicit release, or expiry. Lock types partition independent
//! namespaces over the same resource, so "selling" and "editing-details"
//! locks on one record coexist.

pub mod client;
pub mod config;
pub mod error;
pub mod heartbeat;
pub mod lease;
pub mod manager;
pub mod server;
pub mod store;
pub mod time;
pub mod wire;

pub use client::{LockClient, LockEvent, LostReason};
pub use config::LeaseConfig;
pub use error::{Error, Result};
pub use lease::{Lease, LeaseKey, LockType};
pub use manager::{AcquireOutcome, LeaseManager, LockView};
pub use store::{LeaseStore, MemoryLeaseStore, PutOutcome, RemoteLeaseStore};

use serde::{Deserialize, Serialize};

/// Opaque identity of a session or user holding leases. Supplied by the
/// surrounding application's identity layer; the core never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HolderId(String);

impl HolderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random identity, for sessions without an externally supplied
    /// one.
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for HolderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
