use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("lease duration must be positive, got {millis}ms")]
    InvalidLeaseDuration { millis: i64 },

    #[error("resource key must not be empty")]
    EmptyResourceKey,

    #[error("heartbeat interval {interval_ms}ms must be positive and at most a third of the lease duration ({lease_ms}ms)")]
    InvalidHeartbeatInterval { interval_ms: u64, lease_ms: u64 },

    #[error("poll interval must be positive")]
    InvalidPollInterval,

    #[error("lease store error: {0}")]
    Store(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
