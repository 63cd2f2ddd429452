//! vpswatch — keeps an eye on VPS billing accounts.
//!
//! A [`Monitor`] periodically asks each configured [`BillingProvider`] for
//! its next payment due date, classifies how close that date is, and offers
//! the resulting text to a caller-owned bounded channel, converted into the
//! caller's own message type.

pub mod config;
pub mod delivery;
pub mod error;
pub mod monitor;
pub mod providers;
pub mod severity;

pub use config::{Config, DEFAULT_CHECK_INTERVAL};
pub use delivery::{Converter, Delivery, Outbox};
pub use error::{ConfigError, ProviderError};
pub use monitor::{CycleReport, Monitor, MonitorBuilder};
pub use providers::BillingProvider;
pub use severity::{days_until, format_payment_message, Severity};
