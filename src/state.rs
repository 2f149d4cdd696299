use chrono::{DateTime, Duration, NaiveDate, Utc};

use std::collections::{HashMap, HashSet, VecDeque};

use crate::constant::*;

/// Links that were posted, oldest first, with constant-time membership checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostedLinks {
    order: VecDeque<String>,
    index: HashSet<String>,
}

impl PostedLinks {
    pub fn contains(&self, link: &str) -> bool {
        self.index.contains(link)
    }

    pub fn insert(&mut self, link: impl Into<String>) -> bool {
        let link = link.into();
        if !self.index.insert(link.clone()) {
            return false;
        }
        self.order.push_back(link);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Drops the oldest links until at most `limit` remain.
    pub fn prune(&mut self, limit: usize) -> usize {
        let mut removed = 0;
        while self.order.len() > limit {
            if let Some(link) = self.order.pop_front() {
                self.index.remove(&link);
                removed += 1;
            }
        }
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for PostedLinks {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut links = PostedLinks::default();
        for link in iter {
            links.insert(link);
        }
        links
    }
}

/// Memory carried from one run to the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedState {
    pub last_check_time: HashMap<String, DateTime<Utc>>,
    pub posted_links: PostedLinks,
    pub daily_post_count: u32,
    pub last_post_day: NaiveDate,
}

impl PersistedState {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            last_check_time: HashMap::new(),
            posted_links: PostedLinks::default(),
            daily_post_count: 0,
            last_post_day: today,
        }
    }

    pub fn reset_daily_counter_if_needed(&mut self, today: NaiveDate) {
        if today != self.last_post_day {
            tracing::info!(
                "New day {} (last post day {}), resetting daily post count from {}",
                today,
                self.last_post_day,
                self.daily_post_count
            );
            self.daily_post_count = 0;
            self.last_post_day = today;
        }
    }

    pub fn daily_limit_reached(&self) -> bool {
        self.daily_post_count >= MAX_DAILY_POSTS
    }

    /// First sighting of a feed only looks back a short window instead of its whole backlog.
    pub fn ensure_feed(&mut self, feed_name: &str, now: DateTime<Utc>) -> DateTime<Utc> {
        *self
            .last_check_time
            .entry(feed_name.to_string())
            .or_insert_with(|| now - Duration::hours(FIRST_CHECK_LOOKBACK_HOURS))
    }

    #[allow(dead_code)]
    pub fn last_check(&self, feed_name: &str) -> Option<DateTime<Utc>> {
        self.last_check_time.get(feed_name).copied()
    }

    pub fn mark_checked(&mut self, feed_name: &str, at: DateTime<Utc>) {
        self.last_check_time.insert(feed_name.to_string(), at);
    }

    pub fn is_posted(&self, link: &str) -> bool {
        self.posted_links.contains(link)
    }

    pub fn record_post(&mut self, link: &str) {
        self.posted_links.insert(link);
        self.daily_post_count += 1;
    }

    pub fn prune_posted_links(&mut self) {
        let removed = self.posted_links.prune(POSTED_LINKS_LIMIT);
        if removed > 0 {
            tracing::info!("Pruned {} old posted links", removed);
        }
    }
}
