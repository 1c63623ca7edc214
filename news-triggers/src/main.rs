use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use news_triggers::utils::url::parse_feed_url;
use news_triggers::{
    filter_items, load_trigger_file, ConsolePresenter, FeedSourceSpec, FetchConfig, FileFeedSource, Presenter,
    PullFeed, TriggerWatcher, WatchConfig, DEFAULT_POLL_INTERVAL_SECS, GOOGLE_NEWS_RSS_URL, YAHOO_NEWS_RSS_URL,
};
use tracing::{error, info};

/// Filter news feeds through a trigger file
#[derive(Parser, Debug)]
#[command(name = "news-triggers", version, about)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a trigger file and list the active triggers
    Check {
        #[arg(env = "NEWS_TRIGGERS_FILE", default_value = "triggers.txt")]
        triggers: PathBuf,
    },

    /// Filter local feed files or JSON item dumps
    Filter {
        #[arg(short, long, env = "NEWS_TRIGGERS_FILE", default_value = "triggers.txt")]
        triggers: PathBuf,

        /// RSS/Atom file to read
        #[arg(long = "feed")]
        feeds: Vec<PathBuf>,

        /// JSON file holding an array of items
        #[arg(long = "items")]
        item_files: Vec<PathBuf>,

        /// Print matches as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Poll live feeds and print new matches
    Watch {
        #[arg(short, long, env = "NEWS_TRIGGERS_FILE", default_value = "triggers.txt")]
        triggers: PathBuf,

        /// Feed URL to poll (defaults to Google and Yahoo top stories)
        #[arg(long = "url")]
        urls: Vec<String>,

        /// Seconds between polls
        #[arg(long, env = "NEWS_TRIGGERS_INTERVAL", default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
        interval: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Check { triggers } => {
            let config = load_trigger_file(&triggers)
                .with_context(|| format!("cannot compile {}", triggers.display()))?;

            println!("Defined: {}", config.names().join(", "));
            for (i, trigger) in config.active().iter().enumerate() {
                println!("{:>3}. {}", i + 1, trigger);
            }
        }

        Command::Filter {
            triggers,
            feeds,
            item_files,
            json,
        } => {
            if feeds.is_empty() && item_files.is_empty() {
                bail!("nothing to filter: pass --feed and/or --items");
            }

            let active = load_trigger_file(&triggers)
                .with_context(|| format!("cannot compile {}", triggers.display()))?
                .into_active();

            let mut sources: Vec<FileFeedSource> = feeds.into_iter().map(FileFeedSource::feed).collect();
            sources.extend(item_files.into_iter().map(FileFeedSource::json));

            let mut items = Vec::new();
            for source in sources.iter_mut() {
                let mut pulled = source
                    .pull()
                    .await
                    .with_context(|| format!("cannot read {}", source.source_id()))?;
                items.append(&mut pulled);
            }

            let matched = filter_items(&items, &active);
            info!("{} of {} items matched", matched.len(), items.len());

            if json {
                println!("{}", serde_json::to_string_pretty(&matched)?);
            } else {
                let mut presenter = ConsolePresenter::stdout();
                for item in &matched {
                    presenter.present(item);
                }
            }
        }

        Command::Watch {
            triggers,
            urls,
            interval,
        } => {
            let urls = if urls.is_empty() {
                vec![GOOGLE_NEWS_RSS_URL.to_string(), YAHOO_NEWS_RSS_URL.to_string()]
            } else {
                urls
            };
            for url in &urls {
                parse_feed_url(url).with_context(|| format!("bad feed URL: {}", url))?;
            }

            let config = WatchConfig {
                triggers_path: triggers,
                sources: urls.into_iter().map(|uri| FeedSourceSpec { uri }).collect(),
                poll_interval: Duration::from_secs(interval),
            };
            info!(
                "Watching {} feeds every {}s with triggers from {}",
                config.sources.len(),
                interval,
                config.triggers_path.display()
            );

            let mut watcher =
                TriggerWatcher::with_rss_sources(config, FetchConfig::default(), ConsolePresenter::stdout())?;

            tokio::select! {
                _ = watcher.run() => {}
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        error!("Failed to listen for shutdown signal: {}", e);
                    }
                }
            }
            info!("Shutting down after showing {} items", watcher.presenter().seen().len());
        }
    }

    Ok(())
}
