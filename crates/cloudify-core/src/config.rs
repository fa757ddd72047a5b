//! Configuration for connecting to a Cloudify manager.
//!
//! The manager URL includes any API prefix (for example
//! `https://manager.example.com/api/v3.1/`); resource paths are joined onto it.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;
use validator::Validate;

/// Connection settings for a Cloudify manager.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ManagerClientConfig {
    /// Manager REST base URL
    #[validate(url)]
    pub manager_url: String,

    /// Whether to verify TLS certificates
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,

    /// Optional path to a PEM-encoded CA certificate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_ca_cert: Option<PathBuf>,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 600))]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

const fn default_tls_verify() -> bool {
    true
}

const fn default_request_timeout_secs() -> u64 {
    crate::client::DEFAULT_REQUEST_TIMEOUT
}

impl ManagerClientConfig {
    /// Create a configuration for the given manager URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValidationError`] if the URL or timeout is invalid.
    pub fn new(manager_url: impl Into<String>) -> Result<Self, Error> {
        let config = Self {
            manager_url: manager_url.into(),
            tls_verify: default_tls_verify(),
            tls_ca_cert: None,
            request_timeout_secs: default_request_timeout_secs(),
        };

        config.validate()?;

        Ok(config)
    }

    /// Set whether to verify TLS certificates.
    #[must_use]
    pub const fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Set custom CA certificate path.
    #[must_use]
    pub fn with_ca_cert(mut self, path: PathBuf) -> Self {
        self.tls_ca_cert = Some(path);
        self
    }

    /// Set request timeout in seconds.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parse the manager URL, making sure it ends with `/` so relative
    /// resource paths are appended rather than replacing the last segment.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn parse_manager_url(&self) -> Result<Url, Error> {
        let mut url = Url::parse(&self.manager_url)
            .map_err(|e| Error::ConfigError(format!("Invalid manager URL: {e}")))?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }
}
