//! Connection configuration types
//!
//! `ConnectionSettings` is the serde form read from configuration files.
//! `ConnectionConfig` is the validated, materialized form handed to the
//! connection factory, carrying live retry-policy and compression objects.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, warn};

use crate::compression::{CompressionProvider, GzipCompressionProvider, NoCompressionProvider};
use crate::retry::{
    ExponentialBackoffRetry, RetryForever, RetryNTimes, RetryOneTime, RetryPolicy,
    RetryUntilElapsed,
};
use crate::{Error, Result};

/// Materialized connection configuration
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Maximum time to establish a connection to an ensemble member
    pub connection_timeout: Duration,

    /// Session timeout negotiated with the ensemble
    pub session_timeout: Duration,

    /// Retry policy handed to the client unchanged
    pub retry_policy: Arc<dyn RetryPolicy>,

    /// Payload codec handed to the client unchanged
    pub compression_provider: Arc<dyn CompressionProvider>,

    /// Comma separated host:port list, optionally followed by a chroot
    pub ensemble: String,

    /// Allow the client to operate against a read-only member
    pub read_only: bool,

    /// Path prefix applied to every operation (empty for none)
    pub namespace: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        let settings = ConnectionSettings::default();
        Self {
            connection_timeout: settings.connection_timeout,
            session_timeout: settings.session_timeout,
            retry_policy: settings.retry_policy.build(),
            compression_provider: settings.compression.build(),
            ensemble: settings.ensemble,
            read_only: settings.read_only,
            namespace: settings.namespace,
        }
    }
}

/// Connection settings as they appear in a configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Connection timeout
    #[serde(with = "duration_ms")]
    pub connection_timeout: Duration,

    /// Session timeout
    #[serde(with = "duration_ms")]
    pub session_timeout: Duration,

    /// Retry policy
    pub retry_policy: RetryPolicyConfig,

    /// Compression provider
    pub compression: CompressionConfig,

    /// Ensemble connect string
    pub ensemble: String,

    /// Read-only mode allowed
    pub read_only: bool,

    /// Namespace prefix
    pub namespace: String,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            connection_timeout: Duration::from_secs(6),
            session_timeout: Duration::from_secs(6),
            retry_policy: RetryPolicyConfig::default(),
            compression: CompressionConfig::default(),
            ensemble: "localhost:2181".to_string(),
            read_only: false,
            namespace: String::new(),
        }
    }
}

impl ConnectionSettings {
    /// Parse settings from a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!(?path, "Loading connection settings");
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Check ranges and syntax
    pub fn validate(&self) -> Result<()> {
        if self.connection_timeout.is_zero() {
            return Err(invalid("connection_timeout must be greater than zero"));
        }

        if self.session_timeout.is_zero() {
            return Err(invalid("session_timeout must be greater than zero"));
        }

        if self.session_timeout < self.connection_timeout {
            warn!(
                session_timeout_ms = to_millis(self.session_timeout),
                connection_timeout_ms = to_millis(self.connection_timeout),
                "session timeout is shorter than connection timeout"
            );
        }

        if !connect_string_pattern().is_match(&self.ensemble) {
            return Err(invalid(format!(
                "ensemble {:?} is not a comma separated host:port list",
                self.ensemble
            )));
        }

        if !self.namespace.is_empty() && !namespace_pattern().is_match(&self.namespace) {
            return Err(invalid(format!(
                "namespace {:?} must be slash separated segments without leading or trailing slash",
                self.namespace
            )));
        }

        self.retry_policy.validate()
    }

    /// Validate and materialize a `ConnectionConfig`
    pub fn into_config(self) -> Result<ConnectionConfig> {
        self.validate()?;

        Ok(ConnectionConfig {
            connection_timeout: self.connection_timeout,
            session_timeout: self.session_timeout,
            retry_policy: self.retry_policy.build(),
            compression_provider: self.compression.build(),
            ensemble: self.ensemble,
            read_only: self.read_only,
            namespace: self.namespace,
        })
    }
}

/// Retry policy selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RetryPolicyConfig {
    /// Randomized exponential backoff
    ExponentialBackoff {
        #[serde(with = "duration_ms")]
        base_sleep: Duration,
        max_retries: u32,
        #[serde(default, with = "option_duration_ms")]
        max_sleep: Option<Duration>,
    },

    /// Fixed number of retries
    NTimes {
        n: u32,
        #[serde(with = "duration_ms")]
        sleep_between: Duration,
    },

    /// A single retry
    OneTime {
        #[serde(with = "duration_ms")]
        sleep: Duration,
    },

    /// Retry until a deadline
    UntilElapsed {
        #[serde(with = "duration_ms")]
        max_elapsed: Duration,
        #[serde(with = "duration_ms")]
        sleep_between: Duration,
    },

    /// Retry forever
    Forever {
        #[serde(with = "duration_ms")]
        sleep_between: Duration,
    },
}

impl Default for RetryPolicyConfig {
    fn default() -> Self {
        RetryPolicyConfig::ExponentialBackoff {
            base_sleep: Duration::from_secs(1),
            max_retries: 3,
            max_sleep: None,
        }
    }
}

impl RetryPolicyConfig {
    fn validate(&self) -> Result<()> {
        match self {
            RetryPolicyConfig::ExponentialBackoff { base_sleep, .. } if base_sleep.is_zero() => {
                Err(invalid("retry_policy.base_sleep must be greater than zero"))
            }
            RetryPolicyConfig::UntilElapsed { max_elapsed, .. } if max_elapsed.is_zero() => {
                Err(invalid("retry_policy.max_elapsed must be greater than zero"))
            }
            _ => Ok(()),
        }
    }

    /// Build the policy object
    pub fn build(&self) -> Arc<dyn RetryPolicy> {
        match *self {
            RetryPolicyConfig::ExponentialBackoff {
                base_sleep,
                max_retries,
                max_sleep,
            } => Arc::new(ExponentialBackoffRetry::bounded(
                base_sleep,
                max_retries,
                max_sleep.unwrap_or(Duration::MAX),
            )),
            RetryPolicyConfig::NTimes { n, sleep_between } => {
                Arc::new(RetryNTimes::new(n, sleep_between))
            }
            RetryPolicyConfig::OneTime { sleep } => Arc::new(RetryOneTime::new(sleep)),
            RetryPolicyConfig::UntilElapsed {
                max_elapsed,
                sleep_between,
            } => Arc::new(RetryUntilElapsed::new(max_elapsed, sleep_between)),
            RetryPolicyConfig::Forever { sleep_between } => {
                Arc::new(RetryForever::new(sleep_between))
            }
        }
    }
}

/// Compression provider selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompressionConfig {
    /// Gzip with an optional level (0-9)
    Gzip {
        #[serde(default)]
        level: Option<u32>,
    },

    /// Store payloads as-is
    None,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        CompressionConfig::Gzip { level: None }
    }
}

impl CompressionConfig {
    /// Build the provider object
    pub fn build(&self) -> Arc<dyn CompressionProvider> {
        match *self {
            CompressionConfig::Gzip { level: Some(level) } => {
                Arc::new(GzipCompressionProvider::with_level(level))
            }
            CompressionConfig::Gzip { level: None } => Arc::new(GzipCompressionProvider::new()),
            CompressionConfig::None => Arc::new(NoCompressionProvider),
        }
    }
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`
pub fn to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidConfig {
        message: message.into(),
    }
}

// 1..=65535
const PORT: &str = r"(?:6553[0-5]|655[0-2]\d|65[0-4]\d{2}|6[0-4]\d{3}|[1-5]\d{4}|[1-9]\d{0,3})";

fn connect_string_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(&format!(
            r"^[^,/\s:]+(:{port})?(,[^,/\s:]+(:{port})?)*(/\S*)?$",
            port = PORT
        ))
        .expect("connect string pattern is valid")
    })
}

fn namespace_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^/\s]+(/[^/\s]+)*$").expect("namespace pattern is valid")
    })
}

/// Durations are stored as integer milliseconds
mod duration_ms {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(super::to_millis(*duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

mod option_duration_ms {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&super::to_millis(*d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}
