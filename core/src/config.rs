//! Client configuration.
//!
//! # Design
//! The base URL and the shared password are passed into the client at
//! construction. Nothing in the crate reads the environment on its own;
//! `from_env` exists for hosts that want to load settings once at start-up.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ApiError;

pub const ENV_BASE_URL: &str = "REGISTRY_BASE_URL";
pub const ENV_PASSWORD: &str = "REGISTRY_PASSWORD";
pub const ENV_TIMEOUT_SECS: &str = "REGISTRY_TIMEOUT_SECS";

/// Settings for a `RegistryClient` and its transport.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    /// Combined with a per-call email to form Basic credentials.
    #[serde(default)]
    pub password: String,
    /// Whole-request timeout handed to the transport. `None` waits forever.
    #[serde(default, deserialize_with = "timeout_secs::deserialize")]
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(base_url: &str, password: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            password: password.to_string(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Load settings from `REGISTRY_BASE_URL`, `REGISTRY_PASSWORD` and
    /// `REGISTRY_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let base_url = lookup(ENV_BASE_URL)
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ApiError::Config(format!("{ENV_BASE_URL} is not set")))?;
        let password = lookup(ENV_PASSWORD).unwrap_or_default();

        let mut config = Self::new(base_url.trim(), &password);
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw
                .trim()
                .parse()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| {
                    ApiError::Config(format!(
                        "{ENV_TIMEOUT_SECS} must be a positive integer, got {raw:?}"
                    ))
                })?;
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }
}

mod timeout_secs {
    use std::time::Duration;

    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<u64>::deserialize(deserializer)? {
            Some(0) => Err(D::Error::custom("timeout must be a positive number of seconds")),
            secs => Ok(secs.map(Duration::from_secs)),
        }
    }
}
