use crate::{
    error::{Error, Result},
    lease::{Lease, LeaseKey},
    store::{LeaseStore, PutOutcome},
    wire::{AcquireRequest, AcquireResponse, LeaseStatusResponse, ReleaseRequest, ReleaseResponse},
    HolderId,
};
use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::StatusCode;
use std::time::Duration;

/// Bytes that cannot appear raw inside a single path segment. The service
/// percent-decodes captured segments after routing, so an encoded `/` stays
/// within its segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Lease store backed by a remote lease service.
///
/// The atomic compare-and-set runs server-side against the service's own
/// store and clock; this client just speaks the wire API. Transport failures
/// map to [`Error::Transport`] so the heartbeat treats them as transient.
#[derive(Debug, Clone)]
pub struct RemoteLeaseStore {
    base_url: String,
    http: reqwest::Client,
}

impl RemoteLeaseStore {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl LeaseStore for RemoteLeaseStore {
    async fn get(&self, key: &LeaseKey) -> Result<Option<Lease>> {
        let resource = utf8_percent_encode(&key.resource, PATH_SEGMENT);
        let lock_type = utf8_percent_encode(key.lock_type.as_str(), PATH_SEGMENT);
        let url = self.url(&format!("/leases/{resource}/{lock_type}"));
        let response = self.http.get(url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Error::Store(format!(
                "lease lookup failed with status {}",
                response.status()
            )));
        }

        let status: LeaseStatusResponse = response.json().await?;
        Ok(Some(Lease {
            resource_key: key.resource.clone(),
            lock_type: key.lock_type.clone(),
            holder: HolderId::new(status.holder_id),
            acquired_at: status.acquired_at,
            renewed_at: status.renewed_at,
            expires_at: status.expires_at,
        }))
    }

    async fn put_if_absent_or_expired(
        &self,
        key: &LeaseKey,
        holder: &HolderId,
        ttl: Duration,
    ) -> Result<PutOutcome> {
        let request = AcquireRequest {
            resource_key: key.resource.clone(),
            lock_type: key.lock_type.to_string(),
            holder_id: holder.to_string(),
            lease_duration_ms: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
        };

        let response = self
            .http
            .post(self.url("/leases/acquire"))
            .json(&request)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Store(format!(
                "acquire failed with status {status}: {body}"
            )));
        }

        let body: AcquireResponse = response.json().await?;
        match (body.granted, body.lease, body.conflict_holder_id) {
            (true, Some(lease), _) => Ok(PutOutcome::Granted(lease)),
            (false, _, Some(owner)) => Ok(PutOutcome::Conflict {
                holder: HolderId::new(owner),
                // The conflict expiry is advisory; fall back to "unknown,
                // assume far future" rather than failing the call.
                expires_at: body
                    .conflict_expires_at
                    .unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC),
            }),
            _ => Err(Error::Store(
                "malformed acquire response from lease service".to_string(),
            )),
        }
    }

    async fn delete(&self, key: &LeaseKey, holder: &HolderId) -> Result<bool> {
        let request = ReleaseRequest {
            resource_key: key.resource.clone(),
            lock_type: key.lock_type.to_string(),
            holder_id: holder.to_string(),
        };

        let response = self
            .http
            .post(self.url("/leases/release"))
            .json(&request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::Store(format!(
                "release failed with status {}",
                response.status()
            )));
        }

        let body: ReleaseResponse = response.json().await?;
        Ok(body.released)
    }
}
