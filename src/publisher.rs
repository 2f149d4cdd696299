use rand::Rng;
use thiserror::Error;

use std::ops::RangeInclusive;
use std::time::Duration;

use crate::constant::*;
use crate::shortener::Shortener;
use crate::twitter::{PostError, Poster};

#[derive(Debug, Clone)]
pub struct PostSettings {
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Pause after a successful post, in seconds, picked uniformly.
    pub cooldown_secs: RangeInclusive<u64>,
}

impl Default for PostSettings {
    fn default() -> Self {
        Self {
            max_attempts: MAX_POST_ATTEMPTS,
            base_delay: Duration::from_secs(BASE_RETRY_DELAY_SECS),
            cooldown_secs: MIN_COOLDOWN_SECS..=MAX_COOLDOWN_SECS,
        }
    }
}

impl PostSettings {
    /// Delay before retrying after the failed attempt `attempt` (0-based): base, 2*base, 4*base...
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }

    fn cooldown(&self) -> Duration {
        let secs = rand::thread_rng().gen_range(self.cooldown_secs.clone());
        Duration::from_secs(secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Published {
    Posted { id: String },
    DryRun,
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to shorten {url}: {error:#}")]
    Shorten { url: String, error: anyhow::Error },
    #[error("failed to post after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: PostError },
}

pub fn compose_message(title: &str, short_url: &str) -> String {
    format!("{title}\n\n{short_url}")
}

/// Shortens the link, posts `"{title}\n\n{short}"` with retries, then cools down.
pub struct Publisher {
    shortener: Box<dyn Shortener>,
    poster: Box<dyn Poster>,
    settings: PostSettings,
    dry_run: bool,
}

impl Publisher {
    pub fn new(
        shortener: Box<dyn Shortener>,
        poster: Box<dyn Poster>,
        settings: PostSettings,
        dry_run: bool,
    ) -> Self {
        Self {
            shortener,
            poster,
            settings,
            dry_run,
        }
    }

    pub async fn publish(&self, title: &str, url: &str) -> Result<Published, PublishError> {
        let short_url = self
            .shortener
            .shorten(url)
            .await
            .map_err(|error| PublishError::Shorten {
                url: url.to_string(),
                error,
            })?;
        let text = compose_message(title, &short_url);
        tracing::info!("Posting tweet: {}...", text);

        if self.dry_run {
            tracing::info!("Running in dryrun mode. Skipping posting.");
            return Ok(Published::DryRun);
        }

        let max_attempts = self.settings.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match self.poster.post(&text).await {
                Ok(id) => {
                    tracing::info!("Successfully posted tweet.");
                    let delay = self.settings.cooldown();
                    tracing::info!(
                        "Waiting for {} seconds before the next action.",
                        delay.as_secs()
                    );
                    tokio::time::sleep(delay).await;
                    return Ok(Published::Posted { id });
                }
                Err(e) => {
                    tracing::warn!(
                        "Error posting tweet (Attempt {}/{}): {}",
                        attempt + 1,
                        max_attempts,
                        e
                    );
                    if attempt + 1 >= max_attempts {
                        return Err(PublishError::Exhausted {
                            attempts: max_attempts,
                            last: e,
                        });
                    }

                    let delay = self.settings.backoff(attempt);
                    tracing::info!("Retrying in {} seconds...", delay.as_secs());
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakePoster, FakeShortener};

    fn publisher(poster: FakePoster, dry_run: bool) -> Publisher {
        Publisher::new(
            Box::new(FakeShortener::default()),
            Box::new(poster),
            PostSettings::immediate(),
            dry_run,
        )
    }

    #[test]
    fn test_backoff_doubles() {
        let settings = PostSettings::default();
        assert_eq!(settings.backoff(0), Duration::from_secs(4));
        assert_eq!(settings.backoff(1), Duration::from_secs(8));
        assert_eq!(settings.backoff(2), Duration::from_secs(16));
    }

    #[test]
    fn test_cooldown_in_range() {
        let settings = PostSettings::default();
        for _ in 0..100 {
            let secs = settings.cooldown().as_secs();
            assert!((30..=120).contains(&secs));
        }
    }

    #[test]
    fn test_compose_message() {
        assert_eq!(
            compose_message("Hello", "https://tinyurl.com/x"),
            "Hello\n\nhttps://tinyurl.com/x"
        );
    }

    #[tokio::test]
    async fn test_publish_success() {
        let poster = FakePoster::default();
        let publisher = publisher(poster.clone(), false);

        let published = publisher.publish("Hello", "http://x/1").await.unwrap();
        assert_eq!(published, Published::Posted { id: "1".into() });
        assert_eq!(poster.posts(), vec!["Hello\n\nshort://http://x/1"]);
    }

    #[tokio::test]
    async fn test_publish_retries_then_succeeds() {
        let poster = FakePoster::failing_first(2);
        let publisher = publisher(poster.clone(), false);

        let published = publisher.publish("Hello", "http://x/1").await.unwrap();
        assert!(matches!(published, Published::Posted { .. }));
        assert_eq!(poster.attempts(), 3);
    }

    #[tokio::test]
    async fn test_publish_gives_up_after_max_attempts() {
        let poster = FakePoster::failing_first(u32::MAX);
        let publisher = publisher(poster.clone(), false);

        let err = publisher.publish("Hello", "http://x/1").await.unwrap_err();
        assert!(matches!(err, PublishError::Exhausted { attempts: 3, .. }));
        assert_eq!(poster.attempts(), 3);
        assert!(poster.posts().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_never_posts() {
        let poster = FakePoster::default();
        let publisher = publisher(poster.clone(), true);

        let published = publisher.publish("Hello", "http://x/1").await.unwrap();
        assert_eq!(published, Published::DryRun);
        assert_eq!(poster.attempts(), 0);
    }

    #[tokio::test]
    async fn test_shortener_failure_is_a_publish_failure() {
        let poster = FakePoster::default();
        let publisher = Publisher::new(
            Box::new(FakeShortener::broken()),
            Box::new(poster.clone()),
            PostSettings::immediate(),
            false,
        );

        let err = publisher.publish("Hello", "http://x/1").await.unwrap_err();
        assert!(matches!(err, PublishError::Shorten { .. }));
        assert_eq!(poster.attempts(), 0);
    }
}
