use crate::types::{NewsItem, Result};
use async_trait::async_trait;

/// Trait for pulling news items from a source (RSS feeds, local files, etc.)
#[async_trait]
pub trait PullFeed: Send + Sync {
    /// Unique identifier for this feed source
    fn source_id(&self) -> String;

    /// Fetch the items the source currently publishes.
    ///
    /// Sources do not remember what they returned before; every pull hands
    /// back the full current batch.
    async fn pull(&mut self) -> Result<Vec<NewsItem>>;
}
