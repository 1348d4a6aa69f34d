//! Client configuration.
//!
//! A config can be built in code, parsed from TOML, and overridden from
//! the environment:
//!
//! ```toml
//! token = "..."
//! base_url = "https://fusion-api.oomol.com/v1"
//! polling_interval = 2.0
//! timeout = 300.0
//! ```

use std::fmt;
use std::path::Path;
use std::time::Duration;

use fusion_protocol::constants::DEFAULT_BASE_URL;
use serde::{Deserialize, Serialize};

use crate::error::FusionError;

/// Environment variable holding the API token.
pub const TOKEN_ENV: &str = "FUSION_TOKEN";

/// Environment variable overriding the API base URL.
pub const BASE_URL_ENV: &str = "FUSION_BASE_URL";

/// Connection settings shared by every call made through one client.
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Bearer token sent to API endpoints.
    #[serde(default)]
    pub token: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Delay between task status queries.
    #[serde(default = "default_polling_interval", with = "float_secs")]
    pub polling_interval: Duration,

    /// Deadline for `wait_for`.
    #[serde(default = "default_timeout", with = "float_secs")]
    pub timeout: Duration,

    /// Per-request timeout for API calls.
    #[serde(default = "default_request_timeout", with = "float_secs")]
    pub request_timeout: Duration,

    /// Per-request timeout for storage uploads.
    #[serde(default = "default_upload_timeout", with = "float_secs")]
    pub upload_timeout: Duration,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_polling_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_upload_timeout() -> Duration {
    Duration::from_secs(300)
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            base_url: default_base_url(),
            polling_interval: default_polling_interval(),
            timeout: default_timeout(),
            request_timeout: default_request_timeout(),
            upload_timeout: default_upload_timeout(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("polling_interval", &self.polling_interval)
            .field("timeout", &self.timeout)
            .field("request_timeout", &self.request_timeout)
            .field("upload_timeout", &self.upload_timeout)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    /// Parses a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, FusionError> {
        toml::from_str(content).map_err(|e| FusionError::Config(e.to_string()))
    }

    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FusionError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| FusionError::Config(format!("{}: {e}", path.display())))?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Overrides token and base URL from `lookup` (non-empty values only).
    pub fn apply_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(TOKEN_ENV).filter(|v| !v.is_empty()) {
            self.token = token;
        }
        if let Some(base_url) = lookup(BASE_URL_ENV).filter(|v| !v.is_empty()) {
            self.base_url = base_url;
        }
        self
    }

    /// [`apply_env`](Self::apply_env) against the process environment.
    pub fn with_process_env(self) -> Self {
        self.apply_env(|key| std::env::var(key).ok())
    }

    pub fn validate(&self) -> Result<(), FusionError> {
        if self.token.trim().is_empty() {
            return Err(FusionError::Config("token is required".into()));
        }
        if self.base_url.trim().is_empty() {
            return Err(FusionError::Config("base_url must not be empty".into()));
        }
        for (name, value) in [
            ("polling_interval", self.polling_interval),
            ("timeout", self.timeout),
            ("request_timeout", self.request_timeout),
            ("upload_timeout", self.upload_timeout),
        ] {
            if value.is_zero() {
                return Err(FusionError::Config(format!("{name} must be positive")));
            }
        }
        Ok(())
    }
}

/// `Duration` as fractional seconds (`2.5` = 2500 ms).
mod float_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}
