//! vpswatch — VPS billing monitor daemon.
//!
//! Reads provider credentials from the environment (optionally layered on
//! top of a YAML file named by `VPSWATCH_CONFIG`), checks payment due dates
//! on a fixed interval, and logs every notification until Ctrl+C.

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::info;

use vpswatch::{Config, Monitor};

const CONFIG_PATH_ENV: &str = "VPSWATCH_CONFIG";
const CHANNEL_CAPACITY: usize = 100;

/// What the consumer side receives. Stands in for a chat-bot message.
#[derive(Debug)]
struct MessageToSend {
    text: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vpswatch=info".into()),
        )
        .with_target(false)
        .init();

    info!("vpswatch v{}", env!("CARGO_PKG_VERSION"));

    let config = match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) => Config::load(&path)
            .with_context(|| format!("Failed to load config from {path}"))?
            .merge_env()?,
        Err(_) => Config::from_env()?,
    };

    let (tx, mut rx) = mpsc::channel::<MessageToSend>(CHANNEL_CAPACITY);

    let consumer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            info!(text = %msg.text, "Notification");
        }
    });

    let monitor = Monitor::from_config(&config, tx, |text| MessageToSend { text })
        .context("Invalid monitor configuration")?;

    info!(
        providers = ?monitor.provider_names(),
        interval_secs = monitor.check_interval().as_secs(),
        "Monitor configured"
    );

    let handle = monitor.start();
    info!("Monitor started — press Ctrl+C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    info!("Stopping monitor...");
    monitor.stop();
    handle.await.context("Monitor task panicked")?;

    // Closing the last sender lets the consumer drain and finish.
    drop(monitor);
    consumer.await.context("Consumer task panicked")?;

    info!("Monitor stopped");
    Ok(())
}
