//! In-memory stand-ins for the external collaborators, shared by the unit tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::feed::{Entry, FeedSource, FetchError};
use crate::publisher::PostSettings;
use crate::shortener::Shortener;
use crate::state::PersistedState;
use crate::store::StateStore;
use crate::twitter::{PostError, Poster};

impl PostSettings {
    pub fn immediate() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::ZERO,
            cooldown_secs: 0..=0,
        }
    }
}

#[derive(Default)]
pub struct FakeShortener {
    broken: bool,
}

impl FakeShortener {
    pub fn broken() -> Self {
        Self { broken: true }
    }
}

#[async_trait]
impl Shortener for FakeShortener {
    async fn shorten(&self, url: &str) -> anyhow::Result<String> {
        if self.broken {
            anyhow::bail!("shortener unavailable");
        }
        Ok(format!("short://{url}"))
    }
}

#[derive(Default)]
struct PosterLog {
    attempts: u32,
    posts: Vec<String>,
}

#[derive(Clone, Default)]
pub struct FakePoster {
    fail_first: u32,
    reject_containing: Option<String>,
    log: Arc<Mutex<PosterLog>>,
}

impl FakePoster {
    pub fn failing_first(fail_first: u32) -> Self {
        Self {
            fail_first,
            ..Self::default()
        }
    }

    pub fn rejecting(needle: &str) -> Self {
        Self {
            reject_containing: Some(needle.to_string()),
            ..Self::default()
        }
    }

    pub fn attempts(&self) -> u32 {
        self.log.lock().unwrap().attempts
    }

    pub fn posts(&self) -> Vec<String> {
        self.log.lock().unwrap().posts.clone()
    }
}

#[async_trait]
impl Poster for FakePoster {
    async fn post(&self, text: &str) -> Result<String, PostError> {
        let mut log = self.log.lock().unwrap();
        log.attempts += 1;
        if log.attempts <= self.fail_first {
            return Err(PostError::Transient("service unavailable".to_string()));
        }
        if let Some(needle) = &self.reject_containing {
            if text.contains(needle.as_str()) {
                return Err(PostError::Rejected("duplicate content".to_string()));
            }
        }
        log.posts.push(text.to_string());
        Ok(log.posts.len().to_string())
    }
}

#[derive(Clone, Default)]
pub struct FakeSource {
    feeds: HashMap<String, Option<Vec<Entry>>>,
    fetched: Arc<Mutex<Vec<String>>>,
}

impl FakeSource {
    pub fn with_entries(mut self, url: &str, entries: Vec<Entry>) -> Self {
        self.feeds.insert(url.to_string(), Some(entries));
        self
    }

    pub fn with_failure(mut self, url: &str) -> Self {
        self.feeds.insert(url.to_string(), None);
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedSource for FakeSource {
    async fn fetch(&self, url: &str) -> Result<Vec<Entry>, FetchError> {
        self.fetched.lock().unwrap().push(url.to_string());
        match self.feeds.get(url) {
            Some(Some(entries)) => Ok(entries.clone()),
            _ => Err(FetchError::Status(reqwest::StatusCode::BAD_GATEWAY)),
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    saved: Arc<Mutex<Option<PersistedState>>>,
    saves: Arc<Mutex<u32>>,
}

impl MemoryStore {
    pub fn with_state(state: PersistedState) -> Self {
        Self {
            saved: Arc::new(Mutex::new(Some(state))),
            ..Self::default()
        }
    }

    pub fn saved(&self) -> Option<PersistedState> {
        self.saved.lock().unwrap().clone()
    }

    pub fn saves(&self) -> u32 {
        *self.saves.lock().unwrap()
    }
}

impl StateStore for MemoryStore {
    fn load(&self, today: NaiveDate) -> anyhow::Result<PersistedState> {
        Ok(self
            .saved()
            .unwrap_or_else(|| PersistedState::new(today)))
    }

    fn save(&self, state: &PersistedState) -> anyhow::Result<()> {
        *self.saved.lock().unwrap() = Some(state.clone());
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }
}

/// Records every event's level and message while installed as the thread's default subscriber.
#[derive(Clone, Default)]
pub struct CapturedLogs {
    events: Arc<Mutex<Vec<(Level, String)>>>,
}

impl CapturedLogs {
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
    }

    pub fn at(&self, level: Level) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

impl<S> Layer<S> for CapturedLogs
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.events
            .lock()
            .unwrap()
            .push((*event.metadata().level(), visitor.message));
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }
}
