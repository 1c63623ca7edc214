use crate::traits::PullFeed;
use crate::types::{AggregatorError, FeedSourceSpec, NewsItem, Result};
use crate::{FeedParser, Fetcher};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// RSS/Atom feed pulled over HTTP
pub struct RssFeedSource {
    pub spec: FeedSourceSpec,
    fetcher: Arc<Fetcher>,
    parser: FeedParser,
}

impl RssFeedSource {
    pub fn new(spec: FeedSourceSpec, fetcher: Arc<Fetcher>) -> Self {
        Self {
            spec,
            fetcher,
            parser: FeedParser::new(),
        }
    }
}

#[async_trait]
impl PullFeed for RssFeedSource {
    fn source_id(&self) -> String {
        self.spec.uri.clone()
    }

    async fn pull(&mut self) -> Result<Vec<NewsItem>> {
        info!("Pulling RSS feed: {}", self.spec.uri);

        let content = self.fetcher.fetch_feed(&self.spec.uri).await?;

        if !FeedParser::is_valid_feed_content(&content) {
            return Err(AggregatorError::Parse(format!(
                "{} did not return an RSS or Atom document",
                self.spec.uri
            )));
        }

        let items = self.parser.parse_items(&content)?;
        info!("Pulled {} items from RSS feed {}", items.len(), self.spec.uri);
        Ok(items)
    }
}
