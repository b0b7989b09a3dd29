use alert_mailer::EmailDispatcher;
use monitor_core::{AppConfig, CoreError};
use monitor_service::MonitorService;
use reddit_client::{RedditClient, RedditOAuth2Config};
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str =
    "reddit_monitor=info,monitor_service=info,reddit_client=info,alert_mailer=info,monitor_core=info";

#[tokio::main]
async fn main() -> Result<(), CoreError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    tracing::info!("Starting Reddit monitor");

    let config = AppConfig::load_from_env().map_err(|e| {
        tracing::error!("Configuration error: {}", e);
        e
    })?;

    let channels = config
        .monitor
        .channels
        .iter()
        .map(|c| format!("r/{}", c))
        .collect::<Vec<_>>()
        .join(", ");
    tracing::info!("Monitoring subreddits: {}", channels);
    tracing::info!("Alerts will be sent to: {}", config.email.to.join(", "));

    let fetcher = RedditClient::new(RedditOAuth2Config::from(&config.reddit))?;
    let dispatcher = EmailDispatcher::new(&config.email)?;
    let mut monitor = MonitorService::new(
        Arc::new(fetcher),
        Arc::new(dispatcher),
        config.monitor,
    )?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping after the current cycle");
            let _ = shutdown_tx.send(true);
        }
    });

    monitor.run(shutdown_rx).await.map_err(|e| {
        tracing::error!("Monitor error: {}", e);
        e
    })
}
