//! Error types shared by the monitor, the config loader and the providers.

use std::time::Duration;

use thiserror::Error;

/// Fatal construction-time failures. Returned from [`crate::MonitorBuilder::build`]
/// and the [`crate::Config`] loaders; never delivered through the channel.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("delivery channel is required")]
    MissingChannel,

    #[error("message converter is required")]
    MissingConverter,

    #[error("no provider configured: set VDSINA_API_KEY, or both ONEPROVIDER_API_KEY and ONEPROVIDER_CLIENT_KEY")]
    NoProviders,

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid check interval {value:?}: expected whole seconds")]
    InvalidInterval { value: String },

    #[error("provider #{index} has an empty name")]
    EmptyProviderName { index: usize },
}

/// A single provider query failed. Recoverable: the monitor turns it into a
/// notification and moves on to the next provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to execute request: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status code: {status}, body: {body}")]
    Status { status: u16, body: String },

    #[error("API error: {0}")]
    Api(String),

    #[error("failed to parse JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("failed to parse date {value:?}: {source}")]
    InvalidDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Names the upstream call that failed, e.g. "failed to fetch account: ...".
    #[error("failed to fetch {what}: {source}")]
    Fetch {
        what: &'static str,
        #[source]
        source: Box<ProviderError>,
    },
}

impl ProviderError {
    pub(crate) fn fetching(self, what: &'static str) -> Self {
        Self::Fetch { what, source: Box::new(self) }
    }

    /// The underlying error with any [`ProviderError::Fetch`] context peeled off.
    pub fn root(&self) -> &ProviderError {
        match self {
            Self::Fetch { source, .. } => source.root(),
            other => other,
        }
    }
}
