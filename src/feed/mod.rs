pub mod fetcher;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::path::Path;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),
    #[error("invalid feed: {0}")]
    Parse(#[from] feed_rs::parser::ParseFeedError),
}

#[derive(Debug, Error)]
pub enum EntryError {
    #[error("unparseable published date {published:?}: {source}")]
    InvalidDate {
        published: String,
        source: chrono::ParseError,
    },
    #[error("entry has no link")]
    MissingLink,
}

/// Fetches and parses the entries of one feed, in the order the feed lists them.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<Entry>, FetchError>;
}

/// One item of a feed. `published` is kept as text and only parsed when an entry is judged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub title: String,
    pub link: String,
    pub published: String,
}

impl Entry {
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        published: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            published: published.into(),
        }
    }

    pub fn published_at(&self) -> Result<DateTime<Utc>, EntryError> {
        parse_published(&self.published).map_err(|source| EntryError::InvalidDate {
            published: self.published.clone(),
            source,
        })
    }

    pub fn title_preview(&self, chars: usize) -> String {
        self.title.chars().take(chars).collect()
    }
}

/// RFC 2822 first, then RFC 3339, then RFC 2822 with a `UTC` zone and long weekday names tolerated.
fn parse_published(published: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let published = published.trim();
    DateTime::parse_from_rfc2822(published)
        .or_else(|_| DateTime::parse_from_rfc3339(published))
        .or_else(|_| DateTime::parse_from_rfc2822(&normalize_rfc2822(published)))
        .map(|date| date.with_timezone(&Utc))
}

fn normalize_rfc2822(published: &str) -> String {
    let mut text = published;
    if let Some((weekday, rest)) = text.split_once(',') {
        if weekday.chars().all(|c| c.is_ascii_alphabetic()) {
            text = rest.trim_start();
        }
    }

    match text.strip_suffix("UTC") {
        Some(rest) if rest.ends_with(' ') => format!("{rest}+0000"),
        _ => text.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct Feed {
    pub name: String,
    pub url: String,

    // Per-run counters, never persisted
    pub total_entries: u32,
    pub skipped_entries: u32,
    pub processed_entries: u32,
    pub posted_entries: u32,
}

impl Feed {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            total_entries: 0,
            skipped_entries: 0,
            processed_entries: 0,
            posted_entries: 0,
        }
    }

    pub fn stats(&self) -> FeedStats {
        FeedStats {
            name: self.name.clone(),
            entries: self.total_entries,
            processed: self.processed_entries,
            skipped: self.skipped_entries,
            posted: self.posted_entries,
            failed_to_post: self.processed_entries - self.posted_entries,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedStats {
    pub name: String,
    pub entries: u32,
    pub processed: u32,
    pub skipped: u32,
    pub posted: u32,
    pub failed_to_post: u32,
}

pub fn load_feeds(path: &Path) -> Result<Vec<Feed>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read feeds file {}", path.display()))?;
    parse_feeds(&content).with_context(|| format!("Invalid feeds file {}", path.display()))
}

/// Parses a flat `{ "name": "url" }` object, keeping the file's order.
pub fn parse_feeds(content: &str) -> Result<Vec<Feed>> {
    let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(content)?;
    map.into_iter()
        .map(|(name, url)| match url.as_str() {
            Some(url) => Ok(Feed::new(name, url)),
            None => Err(anyhow::anyhow!("Feed {name} must map to a URL string")),
        })
        .collect()
}
