use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    // Files
    pub feeds_file: PathBuf,
    pub state_file: PathBuf,

    // Filters, lower-cased
    pub ignored_domains: Vec<String>,
    pub ignored_terms: Vec<String>,

    // Twitter configuration
    pub twitter_api_key: String,
    pub twitter_api_key_secret: String,
    pub twitter_access_token: String,
    pub twitter_access_token_secret: String,

    // Shortener configuration
    pub shortener_api_url: String,

    pub http_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Config> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config> {
        let feeds_file = lookup("FEEDS_FILE")
            .unwrap_or_else(|| "feeds.json".into())
            .into();
        let state_file = lookup("STATE_FILE")
            .unwrap_or_else(|| "state.json".into())
            .into();

        let ignored_domains = lookup("IGNORED_DOMAINS")
            .map(|list| split_list(&list))
            .unwrap_or_default();
        let ignored_terms = lookup("IGNORED_TERMS")
            .map(|list| split_list(&list))
            .unwrap_or_default();

        let twitter_api_key = lookup("TWITTER_API_KEY").unwrap_or_default();
        let twitter_api_key_secret = lookup("TWITTER_API_KEY_SECRET").unwrap_or_default();
        let twitter_access_token = lookup("TWITTER_ACCESS_TOKEN").unwrap_or_default();
        let twitter_access_token_secret =
            lookup("TWITTER_ACCESS_TOKEN_SECRET").unwrap_or_default();

        let shortener_api_url = lookup("SHORTENER_API_URL")
            .unwrap_or_else(|| "https://tinyurl.com/api-create.php".into());

        let http_timeout_secs = lookup("HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|| "30".into())
            .parse()
            .context("HTTP_TIMEOUT_SECS must be a valid u64")?;

        Ok(Config {
            feeds_file,
            state_file,
            ignored_domains,
            ignored_terms,
            twitter_api_key,
            twitter_api_key_secret,
            twitter_access_token,
            twitter_access_token_secret,
            shortener_api_url,
            http_timeout_secs,
        })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Posting for real needs all four OAuth 1.0a values.
    pub fn require_twitter_credentials(&self) -> Result<()> {
        let missing = [
            ("TWITTER_API_KEY", &self.twitter_api_key),
            ("TWITTER_API_KEY_SECRET", &self.twitter_api_key_secret),
            ("TWITTER_ACCESS_TOKEN", &self.twitter_access_token),
            ("TWITTER_ACCESS_TOKEN_SECRET", &self.twitter_access_token_secret),
        ]
        .iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(key, _)| *key)
        .collect::<Vec<_>>();

        if !missing.is_empty() {
            anyhow::bail!("Missing Twitter credentials: {}", missing.join(", "));
        }
        Ok(())
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
