//! Payment monitor — periodically asks every configured billing provider
//! for its next payment date and pushes tiered notifications to the
//! caller's channel.
//!
//! Runs one cycle as soon as it starts and then one per check interval.
//! Providers are queried one after another in registration order; a
//! failing provider becomes an error notification and never stops the
//! cycle. Cancellation is only observed between cycles.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::{Config, DEFAULT_CHECK_INTERVAL};
use crate::delivery::{Converter, Delivery, Outbox};
use crate::error::{ConfigError, ProviderError};
use crate::providers::oneprovider::OneProvider;
use crate::providers::vdsina::VdsinaProvider;
use crate::providers::BillingProvider;
use crate::severity::format_payment_message;

/// Counters for a single check cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub produced: usize,
    pub delivered: usize,
    pub dropped: usize,
    pub failed: usize,
    pub skipped: usize,
}

// ── Builder ─────────────────────────────────────────────────────────

/// Assembles and validates a [`Monitor`]. Nothing runs until
/// [`Monitor::start`] is called.
pub struct MonitorBuilder<T> {
    providers: Vec<Arc<dyn BillingProvider>>,
    interval: Option<Duration>,
    tx: Option<mpsc::Sender<T>>,
    convert: Option<Converter<T>>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl<T> Default for MonitorBuilder<T> {
    fn default() -> Self {
        Self {
            providers: Vec::new(),
            interval: None,
            tx: None,
            convert: None,
            shutdown: None,
        }
    }
}

impl<T: Send + 'static> MonitorBuilder<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the upstreams that have a complete credential set in
    /// `config` (VDSina first, then OneProvider) and take its interval.
    pub fn from_config(config: &Config) -> Self {
        let mut builder = Self::new();
        if let Some(api_key) = config.vdsina() {
            builder = builder.provider(VdsinaProvider::new(api_key));
        }
        if let Some(creds) = config.oneprovider() {
            builder = builder.provider(OneProvider::new(creds.api_key, creds.client_key));
        }
        builder.check_interval(config.check_interval())
    }

    /// Append a provider. Cycles query providers in the order they were added.
    pub fn provider(self, provider: impl BillingProvider + 'static) -> Self {
        self.shared_provider(Arc::new(provider))
    }

    pub fn shared_provider(mut self, provider: Arc<dyn BillingProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Zero means "use the default" (12 hours).
    pub fn check_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn channel(mut self, tx: mpsc::Sender<T>) -> Self {
        self.tx = Some(tx);
        self
    }

    pub fn converter(mut self, convert: impl Fn(String) -> T + Send + Sync + 'static) -> Self {
        self.convert = Some(Box::new(convert));
        self
    }

    /// Caller-owned cancellation scope: the loop exits once this flips to
    /// `true` or its sender is dropped.
    pub fn shutdown_signal(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn build(self) -> Result<Monitor<T>, ConfigError> {
        let tx = self.tx.ok_or(ConfigError::MissingChannel)?;
        let convert = self.convert.ok_or(ConfigError::MissingConverter)?;
        if self.providers.is_empty() {
            return Err(ConfigError::NoProviders);
        }
        if let Some(index) = self.providers.iter().position(|p| p.name().is_empty()) {
            return Err(ConfigError::EmptyProviderName { index });
        }

        let interval = match self.interval {
            Some(i) if !i.is_zero() => i,
            _ => DEFAULT_CHECK_INTERVAL,
        };

        let (stop_tx, _) = watch::channel(false);

        Ok(Monitor {
            inner: Arc::new(Inner {
                providers: self.providers,
                interval,
                outbox: Outbox::new(tx, convert),
                cycle: Mutex::new(()),
            }),
            stop_tx,
            shutdown: self.shutdown,
        })
    }
}

// ── Monitor ─────────────────────────────────────────────────────────

pub struct Monitor<T> {
    inner: Arc<Inner<T>>,
    stop_tx: watch::Sender<bool>,
    shutdown: Option<watch::Receiver<bool>>,
}

struct Inner<T> {
    providers: Vec<Arc<dyn BillingProvider>>,
    interval: Duration,
    outbox: Outbox<T>,
    /// Held for a whole cycle so the loop and `Monitor::run_cycle` never overlap.
    cycle: Mutex<()>,
}

impl<T: Send + 'static> Monitor<T> {
    pub fn builder() -> MonitorBuilder<T> {
        MonitorBuilder::new()
    }

    /// Shorthand for the usual wiring: providers and interval from `config`,
    /// plus the caller's channel and converter.
    pub fn from_config(
        config: &Config,
        tx: mpsc::Sender<T>,
        convert: impl Fn(String) -> T + Send + Sync + 'static,
    ) -> Result<Self, ConfigError> {
        MonitorBuilder::from_config(config)
            .channel(tx)
            .converter(convert)
            .build()
    }

    /// Spawn the background loop and return immediately.
    ///
    /// Call once. After [`Monitor::stop`] the monitor cannot be restarted;
    /// a later `start` exits without running a cycle.
    pub fn start(&self) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        let stop = self.stop_tx.subscribe();
        let shutdown = self.shutdown.clone();
        tokio::spawn(run_loop(inner, stop, shutdown))
    }

    /// Request the loop to exit. Idempotent; fine to call without `start`.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    /// Run a single check cycle on the current task. Waits for a cycle
    /// already in progress on the background loop to finish first.
    pub async fn run_cycle(&self) -> CycleReport {
        self.inner.run_cycle().await
    }

    pub fn check_interval(&self) -> Duration {
        self.inner.interval
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.inner.providers.iter().map(|p| p.name()).collect()
    }
}

async fn run_loop<T: Send + 'static>(
    inner: Arc<Inner<T>>,
    mut stop: watch::Receiver<bool>,
    mut shutdown: Option<watch::Receiver<bool>>,
) {
    let already_cancelled = *stop.borrow() || shutdown.as_ref().is_some_and(|s| *s.borrow());
    if already_cancelled {
        info!("Payment monitor cancelled before start");
        return;
    }

    info!(
        providers = inner.providers.len(),
        interval_secs = inner.interval.as_secs(),
        "Payment monitor starting"
    );

    // First tick completes immediately, which gives the initial check.
    let mut ticker = time::interval(inner.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancelled(&mut stop) => break,
            _ = shutdown_requested(shutdown.as_mut()) => break,
            _ = ticker.tick() => {
                inner.run_cycle().await;
            }
        }
    }

    info!("Payment monitor stopped");
}

/// Resolves once the flag is `true` or its sender is gone.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        let flagged = *rx.borrow_and_update();
        if flagged || rx.changed().await.is_err() {
            return;
        }
    }
}

async fn shutdown_requested(rx: Option<&mut watch::Receiver<bool>>) {
    match rx {
        Some(rx) => cancelled(rx).await,
        None => std::future::pending().await,
    }
}

impl<T> Inner<T> {
    async fn run_cycle(&self) -> CycleReport {
        let _cycle = self.cycle.lock().await;
        let started = std::time::Instant::now();
        let mut report = CycleReport::default();

        for provider in &self.providers {
            let name = provider.name();
            if !provider.is_configured() {
                debug!(provider = %name, "Provider not configured — skipping");
                report.skipped += 1;
                continue;
            }

            let text = match query(provider.as_ref()).await {
                Ok(Some(due)) => {
                    info!(provider = %name, due = %due.date_naive(), "Next payment date");
                    format_payment_message(name, due, Utc::now())
                }
                Ok(None) => {
                    info!(provider = %name, "No payment due");
                    format!("Provider {name}: no payment due")
                }
                Err(e) => {
                    warn!(provider = %name, error = %e, "Payment date check failed");
                    report.failed += 1;
                    format!("Error checking payment date for provider {name}: {e}")
                }
            };

            report.produced += 1;
            match self.outbox.deliver(text) {
                Delivery::Queued => report.delivered += 1,
                Delivery::Dropped | Delivery::Closed => report.dropped += 1,
            }
        }

        info!(
            produced = report.produced,
            delivered = report.delivered,
            dropped = report.dropped,
            failed = report.failed,
            duration_ms = started.elapsed().as_millis() as u64,
            "Payment check cycle complete"
        );

        report
    }
}

/// Query one provider with a deadline derived from its own timeout.
async fn query(provider: &dyn BillingProvider) -> Result<Option<DateTime<Utc>>, ProviderError> {
    let limit = provider.query_timeout();
    let deadline = Instant::now() + limit;
    match time::timeout_at(deadline, provider.next_payment_date(deadline)).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(limit)),
    }
}
