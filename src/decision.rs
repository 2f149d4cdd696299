use chrono::{DateTime, Utc};

use std::fmt;

use crate::feed::{Entry, EntryError};
use crate::state::PersistedState;

/// Content filters applied before any time or quota check.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    ignored_domains: Vec<String>,
    ignored_terms: Vec<String>,
}

impl Filters {
    pub fn new(ignored_domains: &[String], ignored_terms: &[String]) -> Self {
        Self {
            ignored_domains: lowercase_all(ignored_domains),
            ignored_terms: lowercase_all(ignored_terms),
        }
    }

    fn has_ignored_domain(&self, link: &str) -> bool {
        let link = link.to_lowercase();
        self.ignored_domains.iter().any(|d| link.contains(d.as_str()))
    }

    fn has_ignored_term(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        self.ignored_terms.iter().any(|t| title.contains(t.as_str()))
    }
}

fn lowercase_all(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    IgnoredDomain,
    IgnoredTerm,
    PublishedBeforeLastCheck {
        published: DateTime<Utc>,
        last_check: DateTime<Utc>,
    },
    AlreadyPosted,
    DailyLimitReached,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::IgnoredDomain => write!(f, "Link contains an ignored domain"),
            SkipReason::IgnoredTerm => write!(f, "Title contains an ignored term"),
            SkipReason::PublishedBeforeLastCheck {
                published,
                last_check,
            } => write!(
                f,
                "Published before last check (published: {}, last check: {}, delta: {}s)",
                published,
                last_check,
                (*published - *last_check).num_seconds()
            ),
            SkipReason::AlreadyPosted => write!(f, "Already posted"),
            SkipReason::DailyLimitReached => write!(f, "Daily limit reached"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Process,
    Skip(SkipReason),
}

/// Decides whether `entry` gets posted. The first matching rule wins:
/// ignored domain, ignored term, not newer than the last check, already posted, daily cap.
///
/// Links and published dates are only validated once the content filters have passed, so a
/// filtered entry never errors.
pub fn decide(
    filters: &Filters,
    state: &PersistedState,
    last_check: DateTime<Utc>,
    entry: &Entry,
) -> Result<Decision, EntryError> {
    if filters.has_ignored_domain(&entry.link) {
        return Ok(Decision::Skip(SkipReason::IgnoredDomain));
    }

    if filters.has_ignored_term(&entry.title) {
        return Ok(Decision::Skip(SkipReason::IgnoredTerm));
    }

    if entry.link.trim().is_empty() {
        return Err(EntryError::MissingLink);
    }
    let published = entry.published_at()?;
    if published <= last_check {
        return Ok(Decision::Skip(SkipReason::PublishedBeforeLastCheck {
            published,
            last_check,
        }));
    }

    if state.is_posted(&entry.link) {
        return Ok(Decision::Skip(SkipReason::AlreadyPosted));
    }

    if state.daily_limit_reached() {
        return Ok(Decision::Skip(SkipReason::DailyLimitReached));
    }

    Ok(Decision::Process)
}
