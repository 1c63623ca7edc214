pub mod file_feed;
pub mod rss_feed;

pub use file_feed::FileFeedSource;
pub use rss_feed::RssFeedSource;
