use crate::types::{AggregatorError, NewsItem, Result};
use crate::utils::html;
use feed_rs::parser;
use tracing::{debug, info, warn};

/// Turns RSS/Atom documents into [`NewsItem`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct FeedParser;

impl FeedParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_items(&self, content: &str) -> Result<Vec<NewsItem>> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| AggregatorError::Parse(format!("Failed to parse feed: {}", e)))?;

        let total = feed.entries.len();
        let items: Vec<NewsItem> = feed
            .entries
            .into_iter()
            .filter_map(|entry| self.parse_entry(entry))
            .collect();

        if items.len() < total {
            warn!("Skipped {} undated feed entries", total - items.len());
        }
        info!("Parsed feed with {} items", items.len());
        Ok(items)
    }

    fn parse_entry(&self, entry: feed_rs::model::Entry) -> Option<NewsItem> {
        let title = entry
            .title
            .map(|t| html::to_plain_text(&t.content))
            .unwrap_or_default();

        // Prefer the summary (RSS <description>), fall back to full content
        let description = entry
            .summary
            .map(|s| s.content)
            .or_else(|| entry.content.and_then(|c| c.body))
            .map(|d| html::to_plain_text(&d))
            .unwrap_or_default();

        let link = entry
            .links
            .first()
            .map(|l| l.href.clone())
            .unwrap_or_default();

        let Some(published_at) = entry.published.or(entry.updated) else {
            debug!("Entry '{}' ({}) has no publication date", title, entry.id);
            return None;
        };

        Some(NewsItem {
            guid: entry.id,
            title,
            description,
            link,
            published_at,
        })
    }

    pub fn is_valid_feed_content(content: &str) -> bool {
        let content_lower = content.to_lowercase();

        let has_feed_indicators = content_lower.contains("<rss")
            || content_lower.contains("<feed")
            || content_lower.contains("<channel")
            || content_lower.contains("xmlns:atom");

        let has_xml_declaration = content.trim_start().starts_with("<?xml");

        has_feed_indicators && (has_xml_declaration || content_lower.contains('<'))
    }
}
