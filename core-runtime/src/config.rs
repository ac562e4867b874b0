//! # Core Configuration Module
//!
//! Provides configuration management for the video pipeline core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the backend location, the polling policy and the
//! injected host bridges. It enforces fail-fast validation so a bad value is
//! reported at startup instead of on the first job.
//!
//! ## Required Settings
//!
//! - `backend_url` - Base URL of the processing backend (`BACKEND_URL`)
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `HttpClient` - HTTP operations (desktop default: reqwest)
//!
//! ## Usage
//!
//! ### Basic Configuration with Desktop Defaults
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .backend_url("http://localhost:8000")
//!     .poll_interval(Duration::from_millis(2500))
//!     .build()?;
//! ```
//!
//! ### Configuration from the Environment
//!
//! ```ignore
//! // Reads BACKEND_URL, POLL_INTERVAL_MS, POLL_MAX_ATTEMPTS,
//! // POLL_TIMEOUT_SECS and TIME_SYNC_INTERVAL_MS (a `.env` file is honoured).
//! let config = core_runtime::config::CoreConfig::from_env()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::HttpClient;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Default delay between two status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2500);

/// Default number of status requests before a job is declared timed out.
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 240;

/// Default cadence of the player time-sync loop.
pub const DEFAULT_TIME_SYNC_INTERVAL: Duration = Duration::from_millis(500);

pub const ENV_BACKEND_URL: &str = "BACKEND_URL";
pub const ENV_POLL_INTERVAL_MS: &str = "POLL_INTERVAL_MS";
pub const ENV_POLL_MAX_ATTEMPTS: &str = "POLL_MAX_ATTEMPTS";
pub const ENV_POLL_TIMEOUT_SECS: &str = "POLL_TIMEOUT_SECS";
pub const ENV_TIME_SYNC_INTERVAL_MS: &str = "TIME_SYNC_INTERVAL_MS";

/// Core configuration for the video pipeline core.
///
/// This struct holds all dependencies and settings required to initialize
/// the core library. Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Base URL of the processing backend
    pub backend_url: Url,

    /// Delay between two status requests
    pub poll_interval: Duration,

    /// Maximum number of status requests per job
    pub max_poll_attempts: u32,

    /// Optional wall-clock bound on polling
    pub poll_timeout: Option<Duration>,

    /// Cadence of the player time-sync loop
    pub time_sync_interval: Duration,

    /// Capacity of the event bus ring buffer
    pub event_buffer_size: usize,

    /// HTTP client for backend requests
    pub http_client: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field(
                "backend_url",
                &crate::logging::redact_url_credentials(self.backend_url.as_str()),
            )
            .field("poll_interval", &self.poll_interval)
            .field("max_poll_attempts", &self.max_poll_attempts)
            .field("poll_timeout", &self.poll_timeout)
            .field("time_sync_interval", &self.time_sync_interval)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("http_client", &"HttpClient { ... }")
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder();
    /// ```
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Builds a configuration from process environment variables.
    ///
    /// A `.env` file in the working directory (or a parent) is loaded first;
    /// variables already present in the environment take precedence.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::builder().load_env()?.build()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Backend URL uses http(s) and can carry path segments
    /// - Poll interval, attempt bound and time-sync interval are non-zero
    /// - Event buffer size is non-zero
    pub fn validate(&self) -> Result<()> {
        validate_backend_url(&self.backend_url)?;

        if self.poll_interval.is_zero() {
            return Err(Error::Config(
                "Poll interval must be greater than zero".to_string(),
            ));
        }

        if self.max_poll_attempts == 0 {
            return Err(Error::Config(
                "Max poll attempts must be greater than zero".to_string(),
            ));
        }

        if matches!(self.poll_timeout, Some(timeout) if timeout.is_zero()) {
            return Err(Error::Config(
                "Poll timeout must be greater than zero when set".to_string(),
            ));
        }

        if self.time_sync_interval.is_zero() {
            return Err(Error::Config(
                "Time sync interval must be greater than zero".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn validate_backend_url(url: &Url) -> Result<()> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Config(format!(
            "Backend URL must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(Error::Config(
            "Backend URL must include a host".to_string(),
        ));
    }

    Ok(())
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required to reach the backend. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default ReqwestHttpClient. \
                 Other hosts: inject a platform HTTP client with .http_client()."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::new().map_err(|e| {
        Error::Internal(format!("Failed to initialize default HttpClient: {}", e))
    })?;
    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

fn parse_env<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| Error::InvalidEnv {
        name: name.to_string(),
        message: format!("'{}': {}", raw, e),
    })
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Use this builder to incrementally set configuration options and then
/// call [`build()`](CoreConfigBuilder::build) to create the final config.
#[derive(Default)]
pub struct CoreConfigBuilder {
    backend_url: Option<String>,
    poll_interval: Option<Duration>,
    max_poll_attempts: Option<u32>,
    poll_timeout: Option<Duration>,
    time_sync_interval: Option<Duration>,
    event_buffer_size: Option<usize>,
    http_client: Option<Arc<dyn HttpClient>>,
}

impl CoreConfigBuilder {
    /// Sets the backend base URL (required).
    pub fn backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = Some(url.into());
        self
    }

    /// Sets the delay between status requests (default: 2.5s).
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Sets the maximum number of status requests per job (default: 240).
    pub fn max_poll_attempts(mut self, attempts: u32) -> Self {
        self.max_poll_attempts = Some(attempts);
        self
    }

    /// Sets a wall-clock bound on polling (default: none).
    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = Some(timeout);
        self
    }

    /// Sets the cadence of the time-sync loop (default: 500ms).
    pub fn time_sync_interval(mut self, interval: Duration) -> Self {
        self.time_sync_interval = Some(interval);
        self
    }

    /// Sets the event bus capacity (default: 100).
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// On desktop with the `desktop-shims` feature a reqwest client is used
    /// when none is provided.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Applies settings from the process environment.
    pub fn load_env(self) -> Result<Self> {
        self.load_from(|name| std::env::var(name).ok())
    }

    /// Applies settings from an arbitrary variable lookup.
    ///
    /// Unset variables leave the builder untouched; set but unparseable
    /// values are reported as [`Error::InvalidEnv`].
    pub fn load_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BACKEND_URL) {
            self.backend_url = Some(url);
        }

        if let Some(raw) = lookup(ENV_POLL_INTERVAL_MS) {
            let ms: u64 = parse_env(ENV_POLL_INTERVAL_MS, &raw)?;
            self.poll_interval = Some(Duration::from_millis(ms));
        }

        if let Some(raw) = lookup(ENV_POLL_MAX_ATTEMPTS) {
            self.max_poll_attempts = Some(parse_env(ENV_POLL_MAX_ATTEMPTS, &raw)?);
        }

        if let Some(raw) = lookup(ENV_POLL_TIMEOUT_SECS) {
            let secs: u64 = parse_env(ENV_POLL_TIMEOUT_SECS, &raw)?;
            self.poll_timeout = Some(Duration::from_secs(secs));
        }

        if let Some(raw) = lookup(ENV_TIME_SYNC_INTERVAL_MS) {
            let ms: u64 = parse_env(ENV_TIME_SYNC_INTERVAL_MS, &raw)?;
            self.time_sync_interval = Some(Duration::from_millis(ms));
        }

        Ok(self)
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(CoreConfig)` on success, or an error if:
    /// - The backend URL is missing or unparseable
    /// - No HttpClient is available for this platform
    /// - Configuration values are invalid
    pub fn build(self) -> Result<CoreConfig> {
        let raw_url = self
            .backend_url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                Error::Config(format!(
                    "Backend URL is required. Use .backend_url() or set {}.",
                    ENV_BACKEND_URL
                ))
            })?;

        let backend_url = Url::parse(raw_url.trim())
            .map_err(|e| Error::Config(format!("Backend URL is not a valid URL: {}", e)))?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let config = CoreConfig {
            backend_url,
            poll_interval: self.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL),
            max_poll_attempts: self.max_poll_attempts.unwrap_or(DEFAULT_MAX_POLL_ATTEMPTS),
            poll_timeout: self.poll_timeout,
            time_sync_interval: self
                .time_sync_interval
                .unwrap_or(DEFAULT_TIME_SYNC_INTERVAL),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            http_client,
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::{BridgeError, HttpRequest, HttpResponse};
    use std::collections::HashMap;

    struct MockHttpClient;

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn execute(
            &self,
            _request: HttpRequest,
        ) -> std::result::Result<HttpResponse, BridgeError> {
            Err(BridgeError::NotAvailable("mock".to_string()))
        }
    }

    fn builder() -> CoreConfigBuilder {
        CoreConfig::builder().http_client(Arc::new(MockHttpClient))
    }

    #[test]
    fn test_builder_with_defaults() {
        let config = builder()
            .backend_url("http://localhost:8000")
            .build()
            .unwrap();

        assert_eq!(config.backend_url.as_str(), "http://localhost:8000/");
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(config.max_poll_attempts, 240);
        assert_eq!(config.poll_timeout, None);
        assert_eq!(config.time_sync_interval, Duration::from_millis(500));
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
    }

    #[test]
    fn test_builder_requires_backend_url() {
        let result = builder().build();

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Backend URL is required"));
    }

    #[test]
    fn test_builder_rejects_blank_backend_url() {
        let result = builder().backend_url("   ").build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_rejects_unparseable_url() {
        let result = builder().backend_url("not a url").build();
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("not a valid URL"));
    }

    #[test]
    fn test_builder_rejects_non_http_scheme() {
        let result = builder().backend_url("ftp://example.com").build();
        assert!(result.unwrap_err().to_string().contains("http or https"));
    }

    #[test]
    fn test_builder_rejects_zero_values() {
        let base = || builder().backend_url("http://localhost:8000");

        assert!(base().poll_interval(Duration::ZERO).build().is_err());
        assert!(base().max_poll_attempts(0).build().is_err());
        assert!(base().poll_timeout(Duration::ZERO).build().is_err());
        assert!(base().time_sync_interval(Duration::ZERO).build().is_err());
        assert!(base().event_buffer_size(0).build().is_err());
    }

    #[test]
    fn test_load_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (ENV_BACKEND_URL, "https://api.example.com/v1"),
            (ENV_POLL_INTERVAL_MS, "100"),
            (ENV_POLL_MAX_ATTEMPTS, "5"),
            (ENV_POLL_TIMEOUT_SECS, "30"),
            (ENV_TIME_SYNC_INTERVAL_MS, "250"),
        ]
        .into_iter()
        .collect();

        let config = builder()
            .load_from(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(config.backend_url.as_str(), "https://api.example.com/v1");
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.max_poll_attempts, 5);
        assert_eq!(config.poll_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.time_sync_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_load_from_keeps_builder_values_when_unset() {
        let config = builder()
            .backend_url("http://localhost:8000")
            .max_poll_attempts(3)
            .load_from(|_| None)
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(config.max_poll_attempts, 3);
    }

    #[test]
    fn test_load_from_rejects_garbage() {
        let result = builder().load_from(|name| {
            (name == ENV_POLL_MAX_ATTEMPTS).then(|| "many".to_string())
        });

        match result {
            Err(Error::InvalidEnv { name, .. }) => assert_eq!(name, ENV_POLL_MAX_ATTEMPTS),
            other => panic!("expected InvalidEnv, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let config = builder()
            .backend_url("https://user:pw@api.example.com")
            .build()
            .unwrap();

        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("pw@"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_missing_http_client_is_capability_error() {
        let result = CoreConfig::builder()
            .backend_url("http://localhost:8000")
            .build();

        assert!(matches!(
            result,
            Err(Error::CapabilityMissing { ref capability, .. }) if capability == "HttpClient"
        ));
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_build_with_desktop_default_client() {
        let config = CoreConfig::builder()
            .backend_url("http://localhost:8000")
            .build()
            .expect("desktop defaults should succeed");

        assert_eq!(config.backend_url.host_str(), Some("localhost"));
    }
}
