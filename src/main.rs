mod client;
mod config;
mod constant;
mod decision;
mod feed;
mod pipeline;
mod publisher;
mod shortener;
mod state;
mod store;
#[cfg(test)]
mod testing;
mod twitter;

use anyhow::Result;
use clap::Parser;

use std::path::PathBuf;

use crate::client::build_http_client;
use crate::config::Config;
use crate::decision::Filters;
use crate::feed::load_feeds;
use crate::feed::fetcher::FeedFetcher;
use crate::pipeline::PipelineBuilder;
use crate::publisher::PostSettings;
use crate::shortener::TinyUrl;
use crate::store::JsonFileStore;
use crate::twitter::TwitterClient;

/// Posts new RSS entries to Twitter, one run per invocation.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Decide and log everything, but neither post nor save state
    #[arg(long)]
    dryrun: bool,

    /// Feed list (JSON object of name -> url), overrides FEEDS_FILE
    #[arg(long)]
    feeds: Option<PathBuf>,

    /// State file, overrides STATE_FILE
    #[arg(long)]
    state: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_env_and_tracing();

    let args = Args::parse();
    tracing::info!("Running with arguments: {:?}", args);

    let mut config = Config::from_env()?;
    if let Some(feeds) = args.feeds {
        config.feeds_file = feeds;
    }
    if let Some(state) = args.state {
        config.state_file = state;
    }
    if !args.dryrun {
        config.require_twitter_credentials()?;
    }

    let feeds = load_feeds(&config.feeds_file)?;
    tracing::info!(
        "Loaded {} feeds from {}",
        feeds.len(),
        config.feeds_file.display()
    );

    let http_client = build_http_client(config.http_timeout())?;

    let mut pipeline = PipelineBuilder::new()
        .with_feeds(feeds)
        .with_source(FeedFetcher::new(http_client.clone()))
        .with_shortener(TinyUrl::new(http_client, &config.shortener_api_url))
        .with_poster(TwitterClient::new(&config))
        .with_store(JsonFileStore::new(&config.state_file))
        .with_filters(Filters::new(
            &config.ignored_domains,
            &config.ignored_terms,
        ))
        .with_post_settings(PostSettings::default())
        .dry_run(args.dryrun)
        .build()?;
    let summary = pipeline.run().await?;
    tracing::info!(
        "Posted {} of {} new entries, {}/{} posts used today",
        summary.total_posted,
        summary.total_processed,
        pipeline.state().daily_post_count,
        constant::MAX_DAILY_POSTS
    );

    Ok(())
}

pub fn setup_env_and_tracing() {
    dotenv::dotenv().ok();
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
