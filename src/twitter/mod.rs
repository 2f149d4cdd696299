mod client;

pub use client::TwitterClient;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PostError {
    /// Network trouble, rate limiting and other failures worth another attempt.
    #[error("transient failure: {0}")]
    Transient(String),
    #[error("post rejected: {0}")]
    Rejected(String),
}

/// Publishes a message on the social account and returns the id of the new post.
#[async_trait]
pub trait Poster: Send + Sync {
    async fn post(&self, text: &str) -> Result<String, PostError>;
}
