use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Default interval between check cycles.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(12 * 60 * 60);

pub const ENV_VDSINA_API_KEY: &str = "VDSINA_API_KEY";
pub const ENV_ONEPROVIDER_API_KEY: &str = "ONEPROVIDER_API_KEY";
pub const ENV_ONEPROVIDER_CLIENT_KEY: &str = "ONEPROVIDER_CLIENT_KEY";
pub const ENV_CHECK_INTERVAL_SECS: &str = "VPSWATCH_CHECK_INTERVAL_SECS";

/// Credentials and scheduling for the monitor. Every field is optional;
/// empty or whitespace-only strings count as absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    pub vdsina_api_key: Option<String>,
    pub oneprovider_api_key: Option<String>,
    pub oneprovider_client_key: Option<String>,
    pub check_interval_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneProviderCredentials {
    pub api_key: String,
    pub client_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().merge_env()
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Overlay non-empty environment variables on top of `self`.
    pub fn merge_env(self) -> Result<Self, ConfigError> {
        self.merge_with(|name| std::env::var(name).ok())
    }

    fn merge_with(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_VDSINA_API_KEY) {
            self.vdsina_api_key = Some(v);
        }
        if let Some(v) = get(ENV_ONEPROVIDER_API_KEY) {
            self.oneprovider_api_key = Some(v);
        }
        if let Some(v) = get(ENV_ONEPROVIDER_CLIENT_KEY) {
            self.oneprovider_client_key = Some(v);
        }
        if let Some(v) = get(ENV_CHECK_INTERVAL_SECS) {
            let secs = v
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidInterval { value: v.clone() })?;
            self.check_interval_secs = Some(secs);
        }
        Ok(self)
    }

    pub fn vdsina(&self) -> Option<&str> {
        non_empty(&self.vdsina_api_key)
    }

    /// OneProvider needs both keys; half a credential set is no credential set.
    pub fn oneprovider(&self) -> Option<OneProviderCredentials> {
        Some(OneProviderCredentials {
            api_key: non_empty(&self.oneprovider_api_key)?.to_string(),
            client_key: non_empty(&self.oneprovider_client_key)?.to_string(),
        })
    }

    /// Unset or zero falls back to [`DEFAULT_CHECK_INTERVAL`].
    pub fn check_interval(&self) -> Duration {
        match self.check_interval_secs {
            Some(secs) if secs > 0 => Duration::from_secs(secs),
            _ => DEFAULT_CHECK_INTERVAL,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
