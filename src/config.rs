//! Configuration types for clarity-dl

use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

use crate::error::{Error, Result};

/// Environment variable holding the API key
pub const KEY_ENV_VAR: &str = "CLARITY_AI_API_KEY";
/// Environment variable holding the API secret
pub const SECRET_ENV_VAR: &str = "CLARITY_AI_API_SECRET";

/// Status polling behavior
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Wait before each status query (default: 30 000 ms)
    #[serde(
        rename = "interval_ms",
        default = "default_poll_interval",
        with = "duration_ms_serde"
    )]
    pub interval: Duration,

    /// Upper bound on the total wait for a job (None = wait indefinitely)
    #[serde(
        rename = "deadline_ms",
        default,
        with = "optional_duration_ms_serde"
    )]
    pub deadline: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: default_poll_interval(),
            deadline: None,
        }
    }
}

/// Where and how job results are materialized
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Scratch directory for result files (default: the OS temp directory)
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// Extension appended to the job ID (default: "csv.gz")
    #[serde(default = "default_file_extension")]
    pub file_extension: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            scratch_dir: default_scratch_dir(),
            file_extension: default_file_extension(),
        }
    }
}

/// HTTP client settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Timeout for each JSON request (default: 60 s)
    #[serde(
        rename = "request_timeout_ms",
        default = "default_request_timeout",
        with = "duration_ms_serde"
    )]
    pub request_timeout: Duration,

    /// TCP connect timeout (default: 10 s)
    #[serde(
        rename = "connect_timeout_ms",
        default = "default_connect_timeout",
        with = "duration_ms_serde"
    )]
    pub connect_timeout: Duration,

    /// Timeout for the whole result download (None = no limit)
    ///
    /// Result files can be large, so this is separate from `request_timeout`.
    #[serde(
        rename = "download_timeout_ms",
        default,
        with = "optional_duration_ms_serde"
    )]
    pub download_timeout: Option<Duration>,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            download_timeout: None,
            user_agent: default_user_agent(),
        }
    }
}

/// Main configuration for [`AsyncDownloader`](crate::AsyncDownloader)
///
/// Fields are organized into logical sub-configs:
/// - [`poll`](PollConfig) - wait interval and optional deadline
/// - [`download`](DownloadConfig) - scratch directory and file naming
/// - [`http`](HttpConfig) - timeouts and user agent
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// API base URL (default: "https://api.clarity.ai")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Status polling settings
    #[serde(default)]
    pub poll: PollConfig,

    /// Result file settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            poll: PollConfig::default(),
            download: DownloadConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl Config {
    /// Configuration pointing at a different API host (e.g. a mock server)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Check the configuration for values that can never work
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.base_url)
            .map_err(|e| Error::config("base_url", format!("'{}': {}", self.base_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config(
                "base_url",
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(Error::config(
                "base_url",
                "must not carry a query or fragment",
            ));
        }

        if self.poll.interval.is_zero() {
            return Err(Error::config("poll.interval_ms", "must be greater than zero"));
        }

        let ext = &self.download.file_extension;
        if ext.is_empty() || ext.contains(['/', '\\']) {
            return Err(Error::config(
                "download.file_extension",
                format!("'{ext}' is not a usable file extension"),
            ));
        }

        Ok(())
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// API credentials
///
/// Immutable once built. `Debug` never shows the secret and only the first
/// characters of the key.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    key: String,
    secret: String,
}

impl Credentials {
    /// Build credentials from a key and a secret
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }

    /// Load credentials from `CLARITY_AI_API_KEY` and `CLARITY_AI_API_SECRET`
    pub fn from_env() -> Result<Self> {
        let read = |name: &str| {
            std::env::var(name).map_err(|_| Error::Config {
                message: format!("{name} not set in environment"),
                key: Some(name.to_string()),
            })
        };
        Ok(Self::new(read(KEY_ENV_VAR)?, read(SECRET_ENV_VAR)?))
    }

    /// The API key
    pub fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn secret(&self) -> &str {
        &self.secret
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix: String = self.key.chars().take(4).collect();
        f.debug_struct("Credentials")
            .field("key", &format_args!("{prefix}…"))
            .field("secret", &"<redacted>")
            .finish()
    }
}

fn default_base_url() -> String {
    "https://api.clarity.ai".to_string()
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(30_000)
}

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_file_extension() -> String {
    "csv.gz".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_user_agent() -> String {
    format!("clarity-dl/{}", env!("CARGO_PKG_VERSION"))
}

// Duration serialization helper (milliseconds)
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}

// Optional Duration serialization helper (milliseconds)
mod optional_duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = Option::<u64>::deserialize(deserializer)?;
        Ok(ms.map(Duration::from_millis))
    }
}
