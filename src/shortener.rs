use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Shortener: Send + Sync {
    async fn shorten(&self, url: &str) -> Result<String>;
}

/// TinyURL's plain-text creation endpoint: `GET {api}?url=<long>` answers with the short URL.
pub struct TinyUrl {
    client: reqwest::Client,
    api_url: String,
}

impl TinyUrl {
    pub fn new(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into(),
        }
    }
}

#[async_trait]
impl Shortener for TinyUrl {
    async fn shorten(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[("url", url)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Shortener responded with {}", status);
        }

        let short = response.text().await?.trim().to_string();
        if short.is_empty() {
            anyhow::bail!("Shortener returned an empty URL");
        }
        tracing::debug!("Shortened {} to {}", url, short);

        Ok(short)
    }
}
