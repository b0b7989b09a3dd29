//! The polling loop: fetch each channel, skip what was already seen, alert on
//! keyword matches, remember every evaluated item, sleep, repeat.


use monitor_core::{
    truncate_chars, Alert, AlertDispatcher, Channel, ChannelFetcher, CoreError, DedupLedger,
    ErrorReporter, Item, MonitorSettings,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Initializing,
    Running,
    RetryBackoff,
    Stopped,
}

/// Counters for one pass over all channels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub channels_polled: usize,
    pub channels_failed: usize,
    pub items_fetched: usize,
    pub items_skipped: usize,
    pub matches: usize,
    pub alerts_sent: usize,
    pub alerts_failed: usize,
    pub pruned: usize,
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} channels polled ({} failed), {} items fetched, {} already seen, {} matches, {} alerts sent, {} alerts failed",
            self.channels_polled,
            self.channels_failed,
            self.items_fetched,
            self.items_skipped,
            self.matches,
            self.alerts_sent,
            self.alerts_failed
        )
    }
}

pub struct MonitorService {
    fetcher: Arc<dyn ChannelFetcher>,
    dispatcher: Arc<dyn AlertDispatcher>,
    settings: MonitorSettings,
    permalink_base: Url,
    ledger: DedupLedger,
    state: MonitorState,
    reporter: ErrorReporter,
}

impl MonitorService {
    pub fn new(
        fetcher: Arc<dyn ChannelFetcher>,
        dispatcher: Arc<dyn AlertDispatcher>,
        settings: MonitorSettings,
    ) -> Result<Self, CoreError> {
        settings.validate()?;
        let permalink_base = settings.permalink_url()?;
        let ledger = DedupLedger::with_limits(settings.ledger_soft_cap, settings.ledger_retain);

        Ok(Self {
            fetcher,
            dispatcher,
            settings,
            permalink_base,
            ledger,
            state: MonitorState::Initializing,
            reporter: ErrorReporter::new(),
        })
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn ledger(&self) -> &DedupLedger {
        &self.ledger
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    pub fn reporter(&self) -> &ErrorReporter {
        &self.reporter
    }

    /// Runs until `shutdown` carries `true`.
    ///
    /// Only a failure to establish the fetch session is returned as an error;
    /// everything after that is logged and retried.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), CoreError> {
        self.initialize().await?;

        while !*shutdown.borrow() {
            self.state = MonitorState::Running;

            let wait = match self.run_cycle().await {
                Ok(report) => {
                    info!("Cycle complete: {}", report);
                    info!(
                        "Waiting {} before next check...",
                        describe(self.settings.poll_interval())
                    );
                    self.settings.poll_interval()
                }
                Err(e) => {
                    self.state = MonitorState::RetryBackoff;
                    self.reporter.report_error("Unexpected error", &e);
                    info!(
                        "Waiting {} before retrying...",
                        describe(self.settings.retry_backoff())
                    );
                    self.settings.retry_backoff()
                }
            };

            if wait_or_shutdown(&mut shutdown, wait).await {
                break;
            }
        }

        self.state = MonitorState::Stopped;
        info!("Monitoring stopped by user");
        Ok(())
    }

    async fn initialize(&mut self) -> Result<(), CoreError> {
        self.state = MonitorState::Initializing;
        match self.fetcher.connect().await {
            Ok(()) => {
                info!("Successfully connected to Reddit API");
                Ok(())
            }
            Err(e) => {
                self.reporter.report_error("Error connecting to Reddit", &e);
                self.state = MonitorState::Stopped;
                Err(CoreError::Initialization {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// One pass over every channel in configured order, then a ledger prune.
    ///
    /// A failed fetch only ends that channel's turn. The cycle itself fails
    /// when not a single channel could be polled.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, CoreError> {
        let mut report = CycleReport::default();

        for index in 0..self.settings.channels.len() {
            let channel = self.settings.channels[index].clone();
            match self
                .fetcher
                .fetch_recent(&channel, self.settings.fetch_limit)
                .await
            {
                Ok(items) => {
                    report.channels_polled += 1;
                    self.process_items(&channel, items, &mut report).await;
                }
                Err(e) => {
                    report.channels_failed += 1;
                    self.reporter
                        .report_warning(&format!("Error monitoring r/{}", channel), &e);
                }
            }
        }

        report.pruned = self.ledger.prune_if_oversized();
        debug!("Dedup ledger holds {} identifiers", self.ledger.len());

        if report.channels_polled == 0 {
            return Err(CoreError::AllChannelsFailed {
                channels: report.channels_failed,
            });
        }
        Ok(report)
    }

    async fn process_items(&mut self, channel: &Channel, items: Vec<Item>, report: &mut CycleReport) {
        report.items_fetched += items.len();

        for item in items {
            if self.ledger.contains(&item.id) {
                report.items_skipped += 1;
                continue;
            }

            if self.settings.keywords.matches(&item.title, &item.body) {
                report.matches += 1;
                info!(
                    "Relevant post found in r/{}: {}",
                    channel,
                    truncate_chars(&item.title, 50)
                );

                let alert = Alert::with_excerpt_len(
                    channel,
                    &item,
                    &self.permalink_base,
                    self.settings.excerpt_chars,
                );
                match self.dispatcher.send(&alert).await {
                    Ok(()) => report.alerts_sent += 1,
                    Err(e) => {
                        report.alerts_failed += 1;
                        self.reporter.report_warning(
                            &format!("Error sending alert for post {}", item.id),
                            &e,
                        );
                    }
                }
            }

            self.ledger.add(item.id);
        }
    }
}

/// Sleeps for `wait`, returning early with `true` when shutdown is requested.
async fn wait_or_shutdown(shutdown: &mut watch::Receiver<bool>, wait: Duration) -> bool {
    let timer = sleep(wait);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            _ = &mut timer => return *shutdown.borrow(),
            changed = shutdown.changed() => match changed {
                Ok(()) if *shutdown.borrow() => return true,
                Ok(()) => continue,
                // No one can signal anymore; finish the wait.
                Err(_) => {
                    (&mut timer).await;
                    return false;
                }
            },
        }
    }
}

fn describe(wait: Duration) -> String {
    let secs = wait.as_secs();
    if secs >= 60 && secs % 60 == 0 {
        format!("{} minutes", secs / 60)
    } else {
        format!("{} seconds", secs)
    }
}
