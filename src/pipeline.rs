use anyhow::Result;
use chrono::Utc;
use serde::Serialize;

use std::time::Instant;

use crate::constant::*;
use crate::decision::{decide, Decision, Filters};
use crate::feed::{Feed, FeedSource, FeedStats};
use crate::publisher::{PostSettings, Published, Publisher};
use crate::shortener::Shortener;
use crate::state::PersistedState;
use crate::store::StateStore;
use crate::twitter::Poster;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total_entries: u32,
    pub total_processed: u32,
    pub total_skipped: u32,
    pub total_posted: u32,
    pub feeds_processed: usize,
    #[serde(skip)]
    pub feeds: Vec<FeedStats>,
}

impl RunSummary {
    fn from_feeds(feeds: &[Feed]) -> Self {
        let feeds: Vec<FeedStats> = feeds.iter().map(Feed::stats).collect();
        Self {
            total_entries: feeds.iter().map(|f| f.entries).sum(),
            total_processed: feeds.iter().map(|f| f.processed).sum(),
            total_skipped: feeds.iter().map(|f| f.skipped).sum(),
            total_posted: feeds.iter().map(|f| f.posted).sum(),
            feeds_processed: feeds.len(),
            feeds,
        }
    }

    fn log(&self) {
        match serde_json::to_string_pretty(self) {
            Ok(stats) => tracing::info!("Run Statistics: {}", stats),
            Err(e) => tracing::error!("Failed to serialize run statistics: {}", e),
        }
        for feed in &self.feeds {
            match serde_json::to_string_pretty(feed) {
                Ok(stats) => tracing::info!("Feed Statistics: {}", stats),
                Err(e) => tracing::error!("Failed to serialize stats of {}: {}", feed.name, e),
            }
        }
    }
}

/// One bot run: reset the daily quota, walk the feeds in order, post what passes the
/// decision rules, report, then persist the state (never in dry-run).
pub struct Pipeline {
    feeds: Vec<Feed>,
    source: Box<dyn FeedSource>,
    publisher: Publisher,
    store: Box<dyn StateStore>,
    state: PersistedState,
    filters: Filters,
    dry_run: bool,
}

impl Pipeline {
    pub fn state(&self) -> &PersistedState {
        &self.state
    }

    pub async fn run(&mut self) -> Result<RunSummary> {
        let started = Instant::now();
        tracing::info!("Starting bot run at {}", Utc::now());

        for feed in self.feeds.iter_mut() {
            *feed = Feed::new(feed.name.clone(), feed.url.clone());
        }
        self.state
            .reset_daily_counter_if_needed(Utc::now().date_naive());

        if self.state.daily_limit_reached() {
            tracing::info!("Daily limit reached. No feeds will be processed.");
        } else {
            for index in 0..self.feeds.len() {
                tracing::info!("Processing feed: {}", self.feeds[index].name);
                self.process_feed(index).await;
                if self.state.daily_limit_reached() {
                    break;
                }
            }
        }

        let summary = RunSummary::from_feeds(&self.feeds);
        summary.log();

        if !self.dry_run {
            self.state.prune_posted_links();
            self.store.save(&self.state)?;
        }

        tracing::info!(
            "Finished bot run at {}. Total time: {:.2} seconds.",
            Utc::now(),
            started.elapsed().as_secs_f64()
        );

        Ok(summary)
    }

    async fn process_feed(&mut self, index: usize) {
        let feed = &mut self.feeds[index];

        let entries = match self.source.fetch(&feed.url).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!("Error fetching RSS feed {}: {}", feed.name, e);
                return;
            }
        };

        let last_check = self.state.ensure_feed(&feed.name, Utc::now());

        for entry in &entries {
            feed.total_entries += 1;

            let decision = match decide(&self.filters, &self.state, last_check, entry) {
                Ok(decision) => decision,
                Err(e) => {
                    tracing::error!(
                        "Malformed entry in {}: {} - {}",
                        feed.name,
                        entry.title_preview(TITLE_PREVIEW_CHARS),
                        e
                    );
                    feed.skipped_entries += 1;
                    continue;
                }
            };
            if let Decision::Skip(reason) = decision {
                tracing::info!(
                    "Skipping link from {}: {} - Reason: {}",
                    feed.name,
                    entry.title_preview(TITLE_PREVIEW_CHARS),
                    reason
                );
                feed.skipped_entries += 1;
                continue;
            }

            feed.processed_entries += 1;
            tracing::info!("New post found in {}: {}", feed.name, entry.title);

            match self.publisher.publish(&entry.title, &entry.link).await {
                Ok(published) => {
                    if let Published::Posted { id } = &published {
                        tracing::debug!("Posted {} as {}", entry.link, id);
                    }
                    feed.posted_entries += 1;
                    self.state.record_post(&entry.link);
                }
                Err(e) => {
                    tracing::error!("Failed to post {} from {}: {}", entry.link, feed.name, e);
                }
            }

            if self.state.daily_limit_reached() {
                tracing::info!("Daily limit reached. Stopping.");
                break;
            }
        }

        self.state.mark_checked(&feed.name, Utc::now());
    }
}

pub struct PipelineBuilder {
    feeds: Vec<Feed>,
    source: Option<Box<dyn FeedSource>>,
    shortener: Option<Box<dyn Shortener>>,
    poster: Option<Box<dyn Poster>>,
    store: Option<Box<dyn StateStore>>,
    filters: Filters,
    settings: PostSettings,
    dry_run: bool,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            feeds: vec![],
            source: None,
            shortener: None,
            poster: None,
            store: None,
            filters: Filters::default(),
            settings: PostSettings::default(),
            dry_run: false,
        }
    }

    /// Loads the persisted state from the store; this is the only read of it per run.
    pub fn build(self) -> Result<Pipeline> {
        let source = self
            .source
            .ok_or_else(|| anyhow::anyhow!("Pipeline needs a feed source"))?;
        let shortener = self
            .shortener
            .ok_or_else(|| anyhow::anyhow!("Pipeline needs a URL shortener"))?;
        let poster = self
            .poster
            .ok_or_else(|| anyhow::anyhow!("Pipeline needs a poster"))?;
        let store = self
            .store
            .ok_or_else(|| anyhow::anyhow!("Pipeline needs a state store"))?;

        let state = store.load(Utc::now().date_naive())?;
        let publisher = Publisher::new(shortener, poster, self.settings, self.dry_run);

        Ok(Pipeline {
            feeds: self.feeds,
            source,
            publisher,
            store,
            state,
            filters: self.filters,
            dry_run: self.dry_run,
        })
    }

    pub fn with_feeds(mut self, feeds: impl IntoIterator<Item = Feed>) -> Self {
        self.feeds.extend(feeds);
        self
    }

    pub fn with_source(mut self, source: impl FeedSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn with_shortener(mut self, shortener: impl Shortener + 'static) -> Self {
        self.shortener = Some(Box::new(shortener));
        self
    }

    pub fn with_poster(mut self, poster: impl Poster + 'static) -> Self {
        self.poster = Some(Box::new(poster));
        self
    }

    pub fn with_store(mut self, store: impl StateStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    pub fn with_filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_post_settings(mut self, settings: PostSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}
