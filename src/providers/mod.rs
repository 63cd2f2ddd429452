//! Billing provider trait — upstream-agnostic interface.
//!
//! Any VPS billing upstream (VDSina, OneProvider, ...) implements this
//! trait. The monitor only ever calls providers through it; providers
//! never see the monitor or each other.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tokio::time::Instant;

use crate::error::ProviderError;

pub mod oneprovider;
pub mod vdsina;

/// Deadline used when a provider does not pick its own.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Date format used by both known upstreams ("2029-02-20").
const UPSTREAM_DATE_FORMAT: &str = "%Y-%m-%d";

// ── Provider Trait ──────────────────────────────────────────────────

/// The billing provider capability.
///
/// Adding a new upstream = implementing this trait in a new file, then
/// registering it on the [`crate::MonitorBuilder`].
#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Stable provider identifier used in notifications (e.g. "vdsina").
    fn name(&self) -> &str;

    /// True iff the provider holds the credentials it needs.
    fn is_configured(&self) -> bool;

    /// Upper bound for a single [`BillingProvider::next_payment_date`] call.
    fn query_timeout(&self) -> Duration {
        DEFAULT_QUERY_TIMEOUT
    }

    /// Next payment due date, or `None` when nothing is outstanding.
    ///
    /// Implementations must not outlive `deadline`; the monitor also
    /// enforces it from the outside.
    async fn next_payment_date(
        &self,
        deadline: Instant,
    ) -> Result<Option<DateTime<Utc>>, ProviderError>;
}

// ── Shared helpers ──────────────────────────────────────────────────

/// Parse an upstream `YYYY-MM-DD` date as midnight UTC.
pub(crate) fn parse_upstream_date(value: &str) -> Result<DateTime<Utc>, ProviderError> {
    NaiveDate::parse_from_str(value, UPSTREAM_DATE_FORMAT)
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
        .map_err(|source| ProviderError::InvalidDate {
            value: value.to_string(),
            source,
        })
}

/// Time left until `deadline`, used as the per-request HTTP timeout.
pub(crate) fn remaining(deadline: Instant) -> Result<Duration, ProviderError> {
    let left = deadline.saturating_duration_since(Instant::now());
    if left.is_zero() {
        return Err(ProviderError::Timeout(Duration::ZERO));
    }
    Ok(left)
}

/// Read a response body and reject anything other than 200 OK.
pub(crate) async fn read_ok_body(resp: reqwest::Response) -> Result<String, ProviderError> {
    let status = resp.status();
    let body = resp.text().await?;
    if status != reqwest::StatusCode::OK {
        return Err(ProviderError::Status {
            status: status.as_u16(),
            body: body.chars().take(500).collect(),
        });
    }
    Ok(body)
}
