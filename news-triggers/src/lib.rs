pub mod types;
pub mod utils;
pub mod trigger;
pub mod config;
pub mod filter;
pub mod parser;
pub mod fetcher;
pub mod traits;
pub mod sources;
pub mod display;
pub mod watcher;

pub use types::*;
pub use trigger::{Trigger, TriggerKind, TriggerList};
pub use config::{compile_config, load_trigger_file, TriggerConfig};
pub use filter::filter_items;
pub use parser::FeedParser;
pub use fetcher::Fetcher;
pub use traits::PullFeed;
pub use sources::{FileFeedSource, RssFeedSource};
pub use display::{ConsolePresenter, SeenGuids};
pub use watcher::TriggerWatcher;
