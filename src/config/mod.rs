//! Environment-backed configuration.
//!
//! Most settings have defaults. Override with `SEQSCORE_*` environment variables.
//! The upstream API key has no default; [`Config::validate`] rejects a config
//! without one.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::net::IpAddr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_APP_NAME, DEFAULT_MAX_CANDIDATES, DEFAULT_MAX_CONCURRENCY, DEFAULT_MAX_RETRIES,
    DEFAULT_REQUEST_DEADLINE_SECS, DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_UPSTREAM_BASE_URL,
    DEFAULT_UPSTREAM_TIMEOUT_SECS, MAX_CONCURRENCY_LIMIT, MAX_REQUEST_DEADLINE_SECS,
};

/// Server configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `SEQSCORE_*` overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port. Default: `8080`.
    pub port: u16,

    /// IP address to bind to. Default: `127.0.0.1`.
    pub bind_addr: IpAddr,

    /// Upstream provider settings.
    pub upstream: UpstreamConfig,

    /// Candidate scoring tasks allowed in flight per request. Default: `8`.
    pub max_concurrency: usize,

    /// Deadline for a whole `/score` request. Default: `120s`.
    pub request_deadline: Duration,

    /// Model used when a candidate does not name one.
    pub default_model: Option<String>,

    /// Max candidates accepted in one request. Default: `64`.
    pub max_candidates: usize,
}

/// Connection, identity and retry settings for the upstream completion API.
#[derive(Clone)]
pub struct UpstreamConfig {
    /// Base URL; endpoint paths are appended. Default: OpenRouter.
    pub base_url: String,

    /// Bearer token for the provider.
    pub api_key: Option<String>,

    /// Timeout for a single HTTP call. Default: `60s`.
    pub timeout: Duration,

    /// Sent as `X-Title`.
    pub app_name: String,

    /// Sent as `HTTP-Referer` when set.
    pub app_url: Option<String>,

    /// Retries after the first attempt. Default: `3`.
    pub max_retries: u32,

    /// First backoff delay; doubles per retry. Default: `250ms`.
    pub retry_base_delay: Duration,
}

impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("app_name", &self.app_name)
            .field("app_url", &self.app_url)
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay", &self.retry_base_delay)
            .finish()
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_UPSTREAM_BASE_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
            app_name: DEFAULT_APP_NAME.to_string(),
            app_url: None,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            upstream: UpstreamConfig::default(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            request_deadline: Duration::from_secs(DEFAULT_REQUEST_DEADLINE_SECS),
            default_model: None,
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }
}

impl Config {
    const ENV_PORT: &'static str = "SEQSCORE_PORT";
    const ENV_BIND_ADDR: &'static str = "SEQSCORE_BIND_ADDR";
    const ENV_UPSTREAM_BASE_URL: &'static str = "SEQSCORE_UPSTREAM_BASE_URL";
    const ENV_UPSTREAM_API_KEY: &'static str = "SEQSCORE_UPSTREAM_API_KEY";
    const ENV_UPSTREAM_TIMEOUT_SECS: &'static str = "SEQSCORE_UPSTREAM_TIMEOUT_SECS";
    const ENV_APP_NAME: &'static str = "SEQSCORE_APP_NAME";
    const ENV_APP_URL: &'static str = "SEQSCORE_APP_URL";
    const ENV_MAX_RETRIES: &'static str = "SEQSCORE_MAX_RETRIES";
    const ENV_RETRY_BASE_DELAY_MS: &'static str = "SEQSCORE_RETRY_BASE_DELAY_MS";
    const ENV_MAX_CONCURRENCY: &'static str = "SEQSCORE_MAX_CONCURRENCY";
    const ENV_REQUEST_DEADLINE_SECS: &'static str = "SEQSCORE_REQUEST_DEADLINE_SECS";
    const ENV_DEFAULT_MODEL: &'static str = "SEQSCORE_DEFAULT_MODEL";
    const ENV_MAX_CANDIDATES: &'static str = "SEQSCORE_MAX_CANDIDATES";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let upstream_defaults = defaults.upstream;

        let port = Self::parse_port_from_env(defaults.port)?;
        let bind_addr = Self::parse_bind_addr_from_env(defaults.bind_addr)?;

        let upstream = UpstreamConfig {
            base_url: Self::parse_string_from_env(
                Self::ENV_UPSTREAM_BASE_URL,
                upstream_defaults.base_url,
            ),
            api_key: Self::parse_optional_string_from_env(Self::ENV_UPSTREAM_API_KEY),
            timeout: Self::parse_u64_from_env(
                Self::ENV_UPSTREAM_TIMEOUT_SECS,
                upstream_defaults.timeout.as_secs(),
            )
            .map(Duration::from_secs)?,
            app_name: Self::parse_string_from_env(Self::ENV_APP_NAME, upstream_defaults.app_name),
            app_url: Self::parse_optional_string_from_env(Self::ENV_APP_URL),
            max_retries: Self::parse_u64_from_env(
                Self::ENV_MAX_RETRIES,
                u64::from(upstream_defaults.max_retries),
            )
            .map(|v| v.min(u64::from(u32::MAX)) as u32)?,
            retry_base_delay: Self::parse_u64_from_env(
                Self::ENV_RETRY_BASE_DELAY_MS,
                upstream_defaults.retry_base_delay.as_millis() as u64,
            )
            .map(Duration::from_millis)?,
        };

        let max_concurrency =
            Self::parse_u64_from_env(Self::ENV_MAX_CONCURRENCY, defaults.max_concurrency as u64)?
                as usize;
        let request_deadline = Self::parse_u64_from_env(
            Self::ENV_REQUEST_DEADLINE_SECS,
            defaults.request_deadline.as_secs(),
        )
        .map(Duration::from_secs)?;
        let default_model = Self::parse_optional_string_from_env(Self::ENV_DEFAULT_MODEL);
        let max_candidates =
            Self::parse_u64_from_env(Self::ENV_MAX_CANDIDATES, defaults.max_candidates as u64)?
                as usize;

        Ok(Self {
            port,
            bind_addr,
            upstream,
            max_concurrency,
            request_deadline,
            default_model,
            max_candidates,
        })
    }

    /// Validates invariants that defaults alone cannot guarantee.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream.api_key.is_none() {
            return Err(ConfigError::MissingEnvVar {
                name: Self::ENV_UPSTREAM_API_KEY,
            });
        }

        let base = &self.upstream.base_url;
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl {
                name: Self::ENV_UPSTREAM_BASE_URL,
                value: base.clone(),
            });
        }

        if self.max_concurrency == 0 {
            return Err(ConfigError::MustBePositive {
                name: Self::ENV_MAX_CONCURRENCY,
            });
        }
        if self.max_candidates == 0 {
            return Err(ConfigError::MustBePositive {
                name: Self::ENV_MAX_CANDIDATES,
            });
        }
        if self.request_deadline.is_zero() {
            return Err(ConfigError::MustBePositive {
                name: Self::ENV_REQUEST_DEADLINE_SECS,
            });
        }
        if self.max_concurrency > MAX_CONCURRENCY_LIMIT {
            return Err(ConfigError::TooLarge {
                name: Self::ENV_MAX_CONCURRENCY,
                value: self.max_concurrency as u64,
                max: MAX_CONCURRENCY_LIMIT as u64,
            });
        }
        if self.request_deadline.as_secs() > MAX_REQUEST_DEADLINE_SECS {
            return Err(ConfigError::TooLarge {
                name: Self::ENV_REQUEST_DEADLINE_SECS,
                value: self.request_deadline.as_secs(),
                max: MAX_REQUEST_DEADLINE_SECS,
            });
        }
        if self.upstream.timeout.is_zero() {
            return Err(ConfigError::MustBePositive {
                name: Self::ENV_UPSTREAM_TIMEOUT_SECS,
            });
        }

        Ok(())
    }

    /// Returns `"{bind_addr}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        env::var(var_name).unwrap_or(default)
    }

    fn parse_optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_u64_from_env(var_name: &'static str, default: u64) -> Result<u64, ConfigError> {
        match env::var(var_name) {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|e| ConfigError::InvalidNumber {
                    name: var_name,
                    value,
                    source: e,
                }),
            Err(_) => Ok(default),
        }
    }
}
