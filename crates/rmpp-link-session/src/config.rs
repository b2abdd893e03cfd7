use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LinkError, Result};

/// Longest accepted period. Deadlines are computed as `now + period`.
pub const MAX_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// Timing of the link session.
///
/// Serialized with millisecond fields; every field is optional in a config
/// file and falls back to [`LinkConfig::default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinkConfig {
    /// Quiet time after open (or after an ack) before the next heartbeat probe.
    #[serde(rename = "heartbeat_interval_ms", with = "millis")]
    pub heartbeat_interval: Duration,
    /// How long a probe may go unacknowledged before reconnecting.
    #[serde(rename = "heartbeat_timeout_ms", with = "millis")]
    pub heartbeat_timeout: Duration,
    /// Status-frame silence after which the link is reported stale.
    #[serde(rename = "stale_after_ms", with = "millis")]
    pub stale_after: Duration,
    /// Setpoint resend period while the device reports external control.
    #[serde(rename = "resend_period_ms", with = "millis")]
    pub resend_period: Duration,
    /// Delay before retrying a connect attempt that failed.
    #[serde(rename = "retry_interval_ms", with = "millis")]
    pub retry_interval: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_millis(4000),
            heartbeat_timeout: Duration::from_millis(1000),
            stale_after: Duration::from_millis(1000),
            resend_period: Duration::from_millis(200),
            retry_interval: Duration::from_millis(1000),
        }
    }
}

impl LinkConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| LinkError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Every period must be non-zero and at most [`MAX_PERIOD`].
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("heartbeat_interval_ms", self.heartbeat_interval),
            ("heartbeat_timeout_ms", self.heartbeat_timeout),
            ("stale_after_ms", self.stale_after),
            ("resend_period_ms", self.resend_period),
            ("retry_interval_ms", self.retry_interval),
        ];
        for (name, value) in fields {
            if value.is_zero() {
                return Err(LinkError::InvalidConfig(format!(
                    "{name} must be greater than zero"
                )));
            }
            if value > MAX_PERIOD {
                return Err(LinkError::InvalidConfig(format!(
                    "{name} must not exceed {} ms",
                    MAX_PERIOD.as_millis()
                )));
            }
        }
        Ok(())
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_timing() {
        let config = LinkConfig::default();
        assert_eq!(config.heartbeat_interval, Duration::from_millis(4000));
        assert_eq!(config.heartbeat_timeout, Duration::from_millis(1000));
        assert_eq!(config.stale_after, Duration::from_millis(1000));
        assert_eq!(config.resend_period, Duration::from_millis(200));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = LinkConfig::from_json_str(r#"{"heartbeat_timeout_ms": 250}"#).unwrap();
        assert_eq!(config.heartbeat_timeout, Duration::from_millis(250));
        assert_eq!(config.heartbeat_interval, Duration::from_millis(4000));
    }

    #[test]
    fn empty_json_is_default() {
        assert_eq!(LinkConfig::from_json_str("{}").unwrap(), LinkConfig::default());
    }

    #[test]
    fn unknown_field_rejected() {
        let err = LinkConfig::from_json_str(r#"{"heartbeat_ms": 5}"#).unwrap_err();
        assert!(matches!(err, LinkError::ConfigParse(_)));
    }

    #[test]
    fn zero_period_rejected() {
        let err = LinkConfig::from_json_str(r#"{"resend_period_ms": 0}"#).unwrap_err();
        assert!(matches!(err, LinkError::InvalidConfig(msg) if msg.contains("resend_period_ms")));
    }

    #[test]
    fn oversized_period_rejected() {
        let config = LinkConfig {
            heartbeat_interval: Duration::from_secs(u64::MAX),
            ..LinkConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, LinkError::InvalidConfig(msg) if msg.contains("heartbeat_interval_ms")));

        let err = LinkConfig::from_json_str(r#"{"retry_interval_ms": 86400001}"#).unwrap_err();
        assert!(matches!(err, LinkError::InvalidConfig(msg) if msg.contains("retry_interval_ms")));

        let at_limit = LinkConfig {
            stale_after: MAX_PERIOD,
            ..LinkConfig::default()
        };
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn serializes_in_milliseconds() {
        let value = serde_json::to_value(LinkConfig::default()).unwrap();
        assert_eq!(value["heartbeat_interval_ms"], 4000);
        assert_eq!(value["retry_interval_ms"], 1000);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = LinkConfig::from_json_file("/nonexistent/rmpp-link.json").unwrap_err();
        assert!(matches!(err, LinkError::ConfigRead { .. }));
    }
}
