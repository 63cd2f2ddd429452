//! VDSina provider — reads the account shutdown forecast.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::time::Instant;

use super::{parse_upstream_date, read_ok_body, remaining, BillingProvider};
use crate::error::ProviderError;

const VDSINA_API_URL: &str = "https://userapi.vdsina.com/v1";
const QUERY_TIMEOUT: Duration = Duration::from_secs(40);

pub struct VdsinaProvider {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl VdsinaProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, VDSINA_API_URL)
    }

    /// Point the provider at a different API root (staging, mock server).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn fetch_account(&self, deadline: Instant) -> Result<AccountResponse, ProviderError> {
        let resp = self
            .client
            .get(format!("{}/account", self.base_url))
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .timeout(remaining(deadline)?)
            .send()
            .await?;

        let body = read_ok_body(resp).await?;
        let account: AccountResponse = serde_json::from_str(&body)?;

        if account.status == "error" {
            return Err(ProviderError::Api(account.status_msg));
        }
        Ok(account)
    }
}

#[async_trait]
impl BillingProvider for VdsinaProvider {
    fn name(&self) -> &str { "vdsina" }
    fn is_configured(&self) -> bool { !self.api_key.is_empty() }
    fn query_timeout(&self) -> Duration { QUERY_TIMEOUT }

    /// The forecast is the date the account runs out of funds. A missing
    /// forecast means there are no funds left at all, so it is reported as
    /// yesterday (overdue) rather than "nothing due".
    async fn next_payment_date(
        &self,
        deadline: Instant,
    ) -> Result<Option<DateTime<Utc>>, ProviderError> {
        let account = self
            .fetch_account(deadline)
            .await
            .map_err(|e| e.fetching("account"))?;

        match account.data.forecast.as_deref() {
            None | Some("") => Ok(Some(Utc::now() - chrono::Duration::days(1))),
            Some(forecast) => parse_upstream_date(forecast).map(Some),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    status_msg: String,
    #[serde(default)]
    data: AccountData,
}

#[derive(Debug, Default, Deserialize)]
struct AccountData {
    #[serde(default)]
    forecast: Option<String>,
}
