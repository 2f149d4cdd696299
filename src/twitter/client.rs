use async_trait::async_trait;
use tweety_rs::types::tweet::PostTweetParams;
use tweety_rs::TweetyClient;

use super::{PostError, Poster};
use crate::config::Config;

pub struct TwitterClient {
    client: TweetyClient,
}

impl TwitterClient {
    pub fn new(config: &Config) -> Self {
        let client = TweetyClient::new(
            &config.twitter_api_key,
            &config.twitter_access_token,
            &config.twitter_api_key_secret,
            &config.twitter_access_token_secret,
        );

        Self { client }
    }
}

#[async_trait]
impl Poster for TwitterClient {
    async fn post(&self, text: &str) -> Result<String, PostError> {
        if text.trim().is_empty() {
            return Err(PostError::Rejected("tweet text is empty".to_string()));
        }

        let body_param = PostTweetParams {
            direct_message_deep_link: None,
            for_super_followers_only: None,
            geo: None,
            media: None,
            poll: None,
            quote_tweet_id: None,
            reply: None,
            reply_settings: None,
        };

        let res = self
            .client
            .post_tweet(text, Some(body_param))
            .await
            .map_err(|e| PostError::Transient(e.to_string()))?;
        tracing::info!("Tweet posted with id {}", res.data.id);

        Ok(res.data.id)
    }
}
