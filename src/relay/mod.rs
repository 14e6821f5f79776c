use std::time::Duration;

use tracing::{error, info, warn};

use crate::{
    arg_parse::RunMode,
    common::select_new,
    config::AppConfig,
    error::Error,
    feeds::prelude::RssFetcher,
    sender::ItemSender,
    storage::LinkStore,
};

/// Outcome of one send attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryResult {
    pub identifier: String,
    pub delivered: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Number of links persisted.
    Saved(usize),
    /// Nothing delivered, or a dry run.
    Skipped,
    /// The links sent this run are lost; they will be offered again next run.
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunReport {
    pub fetched: usize,
    pub new: usize,
    pub results: Vec<DeliveryResult>,
    pub save: SaveOutcome,
}

impl RunReport {
    fn nothing_sent(fetched: usize, new: usize) -> Self {
        Self {
            fetched,
            new,
            results: Vec::new(),
            save: SaveOutcome::Skipped,
        }
    }

    pub fn delivered(&self) -> usize {
        self.results.iter().filter(|r| r.delivered).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.delivered()
    }

    /// A run succeeds when there was nothing to send or at least one item went out.
    pub fn is_success(&self) -> bool {
        self.results.is_empty() || self.delivered() > 0
    }
}

/// One fetch → select → send → persist pass.
pub struct Relay<S, N> {
    fetcher: RssFetcher,
    store: S,
    sender: N,
    max_news_per_run: usize,
    delay_between_messages: Duration,
    mode: RunMode,
}

impl<S: LinkStore, N: ItemSender> Relay<S, N> {
    pub fn new(config: &AppConfig, store: S, sender: N, mode: RunMode) -> Self {
        Self {
            fetcher: RssFetcher::new(&config.feed_url),
            store,
            sender,
            max_news_per_run: config.max_news_per_run,
            delay_between_messages: config.delay_between_messages,
            mode,
        }
    }

    /// Run once. Only a feed that cannot be fetched or parsed is an error; failed
    /// sends and store problems are logged and show up in the report.
    pub async fn run(&mut self) -> Result<RunReport, Error> {
        let mut sent = self.store.load().await;
        info!(count = sent.len(), "previously sent links");

        let feed = self.fetcher.fetch().await?;
        let to_send = select_new(&feed.items, &sent, feed.fetched_at, self.max_news_per_run);
        let new = feed
            .items
            .iter()
            .filter(|item| !sent.contains(&item.identifier))
            .count();
        info!(new, sending = to_send.len(), "selected items");

        if to_send.is_empty() {
            info!("no new items");
            return Ok(RunReport::nothing_sent(feed.items.len(), new));
        }

        let mut results = Vec::with_capacity(to_send.len());
        for (i, item) in to_send.iter().enumerate() {
            info!(item = i + 1, total = to_send.len(), link = %item.identifier, "sending");
            let delivered = match self.sender.send(item).await {
                Ok(()) => {
                    sent.insert(item.identifier.clone());
                    true
                }
                Err(e) => {
                    warn!(link = %item.identifier, error = %e, "delivery failed, will retry next run");
                    false
                }
            };
            results.push(DeliveryResult {
                identifier: item.identifier.clone(),
                delivered,
            });

            if i + 1 < to_send.len() {
                tokio::time::sleep(self.delay_between_messages).await;
            }
        }

        let any_delivered = results.iter().any(|r| r.delivered);
        let save = if self.mode == RunMode::DryRun || !any_delivered {
            SaveOutcome::Skipped
        } else {
            match self.store.save(&sent).await {
                Ok(count) => SaveOutcome::Saved(count),
                Err(e) => {
                    error!(error = %e, "could not save sent links, this run's sends will repeat");
                    SaveOutcome::Failed
                }
            }
        };

        let report = RunReport {
            fetched: feed.items.len(),
            new,
            results,
            save,
        };
        info!(
            delivered = report.delivered(),
            failed = report.failed(),
            save = ?report.save,
            "run finished"
        );
        Ok(report)
    }
}
