use async_trait::async_trait;

use super::{Entry, FeedSource, FetchError};

/// Reads RSS 2.0, RSS 1.0 (RDF) and Atom documents over HTTP.
pub struct FeedFetcher {
    client: reqwest::Client,
}

impl FeedFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FeedSource for FeedFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<Entry>, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.bytes().await?;
        let feed = feed_rs::parser::parse(&body[..])?;
        tracing::debug!(
            "Fetched {} entries from {} ({})",
            feed.entries.len(),
            feed.title.as_ref().map(|t| t.content.as_str()).unwrap_or_default(),
            url
        );

        Ok(feed.entries.into_iter().map(entry_from_model).collect())
    }
}

/// Takes the first link, and `published` falling back to `updated` for the date.
fn entry_from_model(entry: feed_rs::model::Entry) -> Entry {
    let title = entry.title.map(|t| t.content).unwrap_or_default();
    let link = entry
        .links
        .first()
        .map(|l| l.href.trim().to_string())
        .unwrap_or_default();
    let published = entry
        .published
        .or(entry.updated)
        .map(|date| date.to_rfc2822())
        .unwrap_or_default();

    Entry::new(title.trim(), link, published)
}
