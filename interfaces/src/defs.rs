use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A feed the ingester pulls items from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSourceSpec {
    pub uri: String,
}

/// One news item as handed over by the ingester.
///
/// `guid` is whatever identifier the feed published. It is not guaranteed to
/// be unique across feeds; presenters use it to avoid showing an item twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub guid: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub link: String,
    pub published_at: DateTime<Utc>,
}

impl NewsItem {
    pub fn new(
        guid: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        link: impl Into<String>,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            guid: guid.into(),
            title: title.into(),
            description: description.into(),
            link: link.into(),
            published_at,
        }
    }
}

pub struct WatchRest {
    pub wait_at_least_ms: u64,
}

// Object style note:
// Presenters own whatever "already shown" state they need. The trigger
// engine hands them a fresh batch of matches every cycle and keeps nothing
// between calls, so the same item may be offered again on the next poll.

pub trait Presenter {
    /// Show an item. Returns false if the item had been shown before.
    fn present(&mut self, item: &NewsItem) -> bool;
}
