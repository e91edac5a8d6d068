use crate::error::{Error, Result};
use std::time::Duration;

/// Timing knobs for the lock client and server.
///
/// Invalid configuration is rejected up front: a non-positive lease duration
/// would make every lease dead on arrival and silently defeat the lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseConfig {
    /// How long a lease stays valid without renewal.
    pub lease_duration: Duration,
    /// Heartbeat renewal cadence. Must stay at or below `lease_duration / 3`
    /// so at least two renewal attempts can fail before the lease lapses.
    pub heartbeat_interval: Duration,
    /// Refresh cadence for passive observers that never acquire.
    pub poll_interval: Duration,
    /// Server-side cap on client-requested durations.
    pub max_lease_duration: Duration,
}

impl Default for LeaseConfig {
    fn default() -> Self {
        let lease_duration = Duration::from_secs(120);
        Self {
            lease_duration,
            heartbeat_interval: lease_duration / 3,
            poll_interval: Duration::from_secs(5),
            max_lease_duration: Duration::from_secs(300),
        }
    }
}

impl LeaseConfig {
    /// Config with the given lease duration and a matching heartbeat cadence.
    pub fn with_lease_duration(lease_duration: Duration) -> Self {
        Self {
            lease_duration,
            heartbeat_interval: lease_duration / 3,
            max_lease_duration: lease_duration.max(Duration::from_secs(300)),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.lease_duration.is_zero() {
            return Err(Error::InvalidLeaseDuration { millis: 0 });
        }
        if self.heartbeat_interval.is_zero() || self.heartbeat_interval > self.lease_duration / 3 {
            return Err(Error::InvalidHeartbeatInterval {
                interval_ms: self.heartbeat_interval.as_millis() as u64,
                lease_ms: self.lease_duration.as_millis() as u64,
            });
        }
        if self.poll_interval.is_zero() {
            return Err(Error::InvalidPollInterval);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(LeaseConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_lease_duration_is_rejected() {
        let config = LeaseConfig {
            lease_duration: Duration::ZERO,
            ..LeaseConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidLeaseDuration { .. })
        ));
    }

    #[test]
    fn heartbeat_slower_than_a_third_of_the_lease_is_rejected() {
        let config = LeaseConfig {
            lease_duration: Duration::from_secs(30),
            heartbeat_interval: Duration::from_secs(20),
            ..LeaseConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidHeartbeatInterval { .. })
        ));
    }

    #[test]
    fn with_lease_duration_derives_heartbeat() {
        let config = LeaseConfig::with_lease_duration(Duration::from_secs(90));
        assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }
}
