//! OneProvider provider — earliest due date among unpaid invoices.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::time::Instant;

use super::{parse_upstream_date, read_ok_body, remaining, BillingProvider};
use crate::error::ProviderError;

const ONEPROVIDER_API_URL: &str = "https://api.oneprovider.com";
const USER_AGENT: &str = "OneApi/1.0";
const QUERY_TIMEOUT: Duration = Duration::from_secs(30);
const PAGE_LIMIT: u32 = 20;

pub struct OneProvider {
    api_key: String,
    client_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OneProvider {
    pub fn new(api_key: impl Into<String>, client_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, client_key, ONEPROVIDER_API_URL)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        client_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            client_key: client_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn fetch_unpaid_page(
        &self,
        page: u32,
        deadline: Instant,
    ) -> Result<Vec<Invoice>, ProviderError> {
        let resp = self
            .client
            .get(format!("{}/invoices", self.base_url))
            .query(&[
                ("status", "Unpaid".to_string()),
                ("page", page.to_string()),
                ("limit", PAGE_LIMIT.to_string()),
            ])
            .header("Api-Key", &self.api_key)
            .header("Client-Key", &self.client_key)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(remaining(deadline)?)
            .send()
            .await?;

        let body = read_ok_body(resp).await?;
        let parsed: InvoiceResponse = serde_json::from_str(&body)?;

        if let Some(err) = parsed.error {
            return Err(ProviderError::Api(format!("{} (code: {})", err.message, err.code)));
        }
        Ok(parsed.response.invoices)
    }
}

#[async_trait]
impl BillingProvider for OneProvider {
    fn name(&self) -> &str { "oneprovider" }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.client_key.is_empty()
    }

    fn query_timeout(&self) -> Duration { QUERY_TIMEOUT }

    async fn next_payment_date(
        &self,
        deadline: Instant,
    ) -> Result<Option<DateTime<Utc>>, ProviderError> {
        let invoices = self
            .fetch_unpaid_page(1, deadline)
            .await
            .map_err(|e| e.fetching("invoices"))?;
        earliest_unpaid_due_date(&invoices)
    }
}

/// Earliest due date among unpaid invoices; `None` when nothing is unpaid.
fn earliest_unpaid_due_date(invoices: &[Invoice]) -> Result<Option<DateTime<Utc>>, ProviderError> {
    let mut earliest: Option<DateTime<Utc>> = None;
    for invoice in invoices {
        if invoice.status != "Unpaid" || invoice.due_date.is_empty() {
            continue;
        }
        let due = parse_upstream_date(&invoice.due_date)?;
        if earliest.map_or(true, |e| due < e) {
            earliest = Some(due);
        }
    }
    Ok(earliest)
}

#[derive(Debug, Deserialize)]
struct InvoiceResponse {
    #[serde(default)]
    response: InvoicePage,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Default, Deserialize)]
struct InvoicePage {
    #[serde(default)]
    invoices: Vec<Invoice>,
}

#[derive(Debug, Deserialize)]
struct Invoice {
    #[serde(default)]
    status: String,
    #[serde(default)]
    due_date: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: String,
}
