pub mod defs;

pub use defs::{FeedSourceSpec, NewsItem, Presenter, WatchRest};
