use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::load_trigger_file;
use crate::filter::filter_items;
use crate::sources::RssFeedSource;
use crate::traits::PullFeed;
use crate::types::{FetchConfig, NewsItem, PollReport, Presenter, Result, WatchConfig, WatchRest};
use crate::Fetcher;

/// Polls the configured sources, filters through the trigger file and hands
/// matches to a presenter.
///
/// The trigger file is recompiled on every cycle so edits take effect on the
/// next poll without a restart.
pub struct TriggerWatcher<P: Presenter> {
    config: WatchConfig,
    sources: Vec<Box<dyn PullFeed>>,
    presenter: P,
}

impl<P: Presenter> TriggerWatcher<P> {
    pub fn new(config: WatchConfig, presenter: P) -> Self {
        Self {
            config,
            sources: Vec::new(),
            presenter,
        }
    }

    /// One [`RssFeedSource`] per configured source URL, sharing a fetcher.
    pub fn with_rss_sources(config: WatchConfig, fetch_config: FetchConfig, presenter: P) -> Result<Self> {
        let fetcher = Arc::new(Fetcher::new(fetch_config)?);
        let sources: Vec<Box<dyn PullFeed>> = config
            .sources
            .iter()
            .map(|spec| Box::new(RssFeedSource::new(spec.clone(), Arc::clone(&fetcher))) as Box<dyn PullFeed>)
            .collect();

        Ok(Self {
            config,
            sources,
            presenter,
        })
    }

    pub fn add_source(&mut self, source: Box<dyn PullFeed>) {
        self.sources.push(source);
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn rest(&self) -> WatchRest {
        WatchRest {
            wait_at_least_ms: self.config.poll_interval.as_millis() as u64,
        }
    }

    /// Pull every source once. Failing sources are logged and counted.
    async fn pull_all(&mut self) -> (Vec<NewsItem>, usize) {
        let mut items = Vec::new();
        let mut failed = 0;

        for source in self.sources.iter_mut() {
            match source.pull().await {
                Ok(mut pulled) => items.append(&mut pulled),
                Err(e) => {
                    error!("Failed to pull {}: {}", source.source_id(), e);
                    failed += 1;
                }
            }
        }

        (items, failed)
    }

    /// Run a single poll: compile triggers, pull, filter, present.
    pub async fn poll_once(&mut self) -> Result<PollReport> {
        let triggers = load_trigger_file(&self.config.triggers_path)?.into_active();
        if triggers.is_empty() {
            warn!("No active triggers in {}", self.config.triggers_path.display());
        }

        let (items, failed_sources) = self.pull_all().await;
        let matched = filter_items(&items, &triggers);

        let mut shown = 0;
        for item in &matched {
            if self.presenter.present(item) {
                shown += 1;
            }
        }

        let report = PollReport {
            pulled: items.len(),
            matched: matched.len(),
            shown,
            failed_sources,
        };
        info!(
            "Poll complete: {} pulled, {} matched, {} new, {} sources failed",
            report.pulled, report.matched, report.shown, report.failed_sources
        );
        Ok(report)
    }

    /// Poll forever, sleeping between cycles. A failed cycle is logged and
    /// the loop carries on.
    pub async fn run(&mut self) {
        loop {
            info!("Polling . . .");
            if let Err(e) = self.poll_once().await {
                error!("Poll failed: {}", e);
            }

            let rest = self.rest();
            info!("Sleeping for {}s", rest.wait_at_least_ms / 1000);
            tokio::time::sleep(std::time::Duration::from_millis(rest.wait_at_least_ms)).await;
        }
    }
}
