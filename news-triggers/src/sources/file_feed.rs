use crate::traits::PullFeed;
use crate::types::{NewsItem, Result};
use crate::FeedParser;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// Items read from a local file: either an RSS/Atom document or a JSON array
/// of [`NewsItem`] records.
pub struct FileFeedSource {
    path: PathBuf,
    format: FileFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Feed,
    Json,
}

impl FileFeedSource {
    pub fn feed(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            format: FileFormat::Feed,
        }
    }

    pub fn json(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            format: FileFormat::Json,
        }
    }
}

#[async_trait]
impl PullFeed for FileFeedSource {
    fn source_id(&self) -> String {
        format!("file://{}", self.path.display())
    }

    async fn pull(&mut self) -> Result<Vec<NewsItem>> {
        debug!("Reading {:?} items from {}", self.format, self.path.display());
        let content = tokio::fs::read_to_string(&self.path).await?;

        match self.format {
            FileFormat::Feed => FeedParser::new().parse_items(&content),
            FileFormat::Json => Ok(serde_json::from_str(&content)?),
        }
    }
}
