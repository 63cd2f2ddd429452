//! Severity classifier — maps a payment due date to a notification tier
//! and renders the message text.
//!
//! Tiers are picked purely from the whole number of days left, truncated
//! toward zero, so "due in 47 hours" is still 1 day and "due 20 hours ago"
//! is still day 0.

use chrono::{DateTime, Utc};

const SECONDS_PER_DAY: i64 = 86_400;
const URGENT_MAX_DAYS: i64 = 2;
const ATTENTION_MAX_DAYS: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Informational,
    Attention,
    Urgent,
    Critical,
}

impl Severity {
    /// First match wins: overdue, then 0-2, then 3-5, then the rest.
    pub fn from_days_until(days: i64) -> Self {
        match days {
            d if d < 0 => Severity::Critical,
            d if d <= URGENT_MAX_DAYS => Severity::Urgent,
            d if d <= ATTENTION_MAX_DAYS => Severity::Attention,
            _ => Severity::Informational,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::Urgent => "WARNING",
            Severity::Attention => "ATTENTION",
            Severity::Informational => "INFO",
        }
    }
}

/// Whole days from `now` until `due`, truncated toward zero.
pub fn days_until(due: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (due - now).num_seconds() / SECONDS_PER_DAY
}

/// Render the payment notification for `provider` as of `now`.
pub fn format_payment_message(provider: &str, due: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let days = days_until(due, now);
    let date = due.format("%Y-%m-%d");
    let severity = Severity::from_days_until(days);
    let label = severity.label();

    match severity {
        Severity::Critical => format!(
            "{label}: Provider {provider} - Payment overdue! Payment date was {date} ({} days ago). Urgent action required!",
            -days
        ),
        Severity::Urgent => format!(
            "{label}: Provider {provider} - Urgent payment required! Payment due date: {date} ({days} day(s) left)"
        ),
        Severity::Attention => format!(
            "{label}: Provider {provider} - Payment due soon! Payment date: {date} ({days} days left)"
        ),
        Severity::Informational => format!(
            "{label}: Provider {provider} - Next payment date: {date} ({days} days left)"
        ),
    }
}
