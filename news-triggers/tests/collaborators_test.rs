use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use news_triggers::utils::url::parse_feed_url;
use news_triggers::{
    AggregatorError, ConsolePresenter, FeedParser, FeedSourceSpec, FetchConfig, Fetcher, NewsItem, Presenter,
    PullFeed, Result, RssFeedSource, SeenGuids, TriggerWatcher, WatchConfig,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .try_init()
            .ok();
    });
}

const RSS_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Top Stories</title>
    <link>https://news.example.com</link>
    <description>Example feed</description>
    <item>
      <guid>story-1</guid>
      <title>Election &amp; Results</title>
      <link>https://news.example.com/1</link>
      <description>&lt;p&gt;Polls &lt;b&gt;closed&lt;/b&gt; at 8pm&lt;/p&gt;</description>
      <pubDate>Tue, 05 Nov 2024 20:00:00 GMT</pubDate>
    </item>
    <item>
      <guid>story-2</guid>
      <title>Weather today</title>
      <link>https://news.example.com/2</link>
      <pubDate>Tue, 05 Nov 2024 15:30:00 -0500</pubDate>
    </item>
    <item>
      <guid>story-3</guid>
      <title>Undated item</title>
      <link>https://news.example.com/3</link>
    </item>
  </channel>
</rss>"#;

const ATOM_SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Example</title>
  <id>urn:example:feed</id>
  <updated>2024-01-02T10:00:00Z</updated>
  <entry>
    <id>urn:example:entry-1</id>
    <title>Launch window opens</title>
    <link href="https://atom.example.com/launch"/>
    <updated>2024-01-02T10:00:00Z</updated>
    <summary>The rocket is on the pad.</summary>
  </entry>
</feed>"#;

fn sample_item(guid: &str, title: &str) -> NewsItem {
    NewsItem::new(
        guid,
        title,
        "",
        format!("https://news.example.com/{}", guid),
        Utc.with_ymd_and_hms(2024, 11, 5, 20, 0, 0).unwrap(),
    )
}

#[test]
fn test_parse_rss_items() {
    init_tracing();

    let items = FeedParser::new().parse_items(RSS_SAMPLE).unwrap();
    assert_eq!(items.len(), 2, "undated entry should be skipped");

    let first = &items[0];
    assert_eq!(first.guid, "story-1");
    assert_eq!(first.title, "Election & Results");
    assert_eq!(first.link, "https://news.example.com/1");
    assert!(first.description.contains("closed"));
    assert!(!first.description.contains('<'));
    assert_eq!(first.published_at, Utc.with_ymd_and_hms(2024, 11, 5, 20, 0, 0).unwrap());

    let second = &items[1];
    assert_eq!(second.description, "");
    assert_eq!(second.published_at, Utc.with_ymd_and_hms(2024, 11, 5, 20, 30, 0).unwrap());
}

#[test]
fn test_parse_atom_falls_back_to_updated() {
    let items = FeedParser::new().parse_items(ATOM_SAMPLE).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].guid, "urn:example:entry-1");
    assert_eq!(items[0].link, "https://atom.example.com/launch");
    assert_eq!(items[0].description, "The rocket is on the pad.");
    assert_eq!(items[0].published_at, Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap());
}

#[test]
fn test_parse_rejects_garbage() {
    let result = FeedParser::new().parse_items("this is not a feed");
    assert!(matches!(result, Err(AggregatorError::Parse(_))));
}

#[test]
fn test_feed_content_sniffing() {
    assert!(FeedParser::is_valid_feed_content(RSS_SAMPLE));
    assert!(FeedParser::is_valid_feed_content(ATOM_SAMPLE));
    assert!(!FeedParser::is_valid_feed_content("<html><body>hi</body></html>"));
    assert!(!FeedParser::is_valid_feed_content("plain text"));
}

#[test]
fn test_html_cleanup() {
    use news_triggers::utils::html::to_plain_text;

    assert_eq!(to_plain_text("<p>Hello<br/>world</p>"), "Hello world");
    assert_eq!(to_plain_text("Fish &amp; chips &#8211; &#x41;&nbsp;la carte"), "Fish & chips – A la carte");
    assert_eq!(to_plain_text("AT&T rocks"), "AT&T rocks");
    assert_eq!(to_plain_text("&bogus; stays"), "&bogus; stays");
}

#[test]
fn test_seen_guids() {
    let mut seen = SeenGuids::new();
    assert!(seen.is_empty());
    assert!(seen.insert_if_absent("a"));
    assert!(!seen.insert_if_absent("a"));
    assert!(seen.insert_if_absent("b"));
    assert!(seen.contains("a"));
    assert!(!seen.contains("c"));
    assert_eq!(seen.len(), 2);
}

#[test]
fn test_console_presenter_shows_each_guid_once() {
    let mut presenter = ConsolePresenter::new(Vec::new());
    let mut story = sample_item("g1", "Big news");
    story.description = "Details here".to_string();

    assert!(presenter.present(&story));
    assert!(!presenter.present(&story));
    assert!(presenter.present(&sample_item("g2", "Other news")));
    assert_eq!(presenter.seen().len(), 2);

    let output = String::from_utf8(presenter.into_inner()).unwrap();
    assert_eq!(output.matches("Big news").count(), 1);
    assert!(output.contains("Details here"));
    assert!(output.contains("https://news.example.com/g2"));
    assert_eq!(output.matches("*************************").count(), 2);
}

/// Writer whose first `failures` writes fail
struct FlakyWriter {
    failures: usize,
    buf: Vec<u8>,
}

impl Write for FlakyWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "terminal went away"));
        }
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_console_presenter_failed_write_is_not_marked_seen() {
    let mut presenter = ConsolePresenter::new(FlakyWriter { failures: 1, buf: Vec::new() });
    let story = sample_item("g1", "Big news");

    assert!(!presenter.present(&story));
    assert!(!presenter.seen().contains("g1"));
    assert!(presenter.seen().is_empty());

    // The next poll offers it again and this time it goes through
    assert!(presenter.present(&story));
    assert!(presenter.seen().contains("g1"));
    assert!(!presenter.present(&story));

    let output = String::from_utf8(presenter.into_inner().buf).unwrap();
    assert_eq!(output.matches("Big news").count(), 1);
}

struct StaticSource {
    items: Vec<NewsItem>,
}

#[async_trait]
impl PullFeed for StaticSource {
    fn source_id(&self) -> String {
        "static".to_string()
    }

    async fn pull(&mut self) -> Result<Vec<NewsItem>> {
        Ok(self.items.clone())
    }
}

struct BrokenSource;

#[async_trait]
impl PullFeed for BrokenSource {
    fn source_id(&self) -> String {
        "broken".to_string()
    }

    async fn pull(&mut self) -> Result<Vec<NewsItem>> {
        Err(AggregatorError::General("connection refused".to_string()))
    }
}

#[derive(Default)]
struct CollectingPresenter {
    seen: SeenGuids,
    shown: Vec<String>,
}

impl Presenter for CollectingPresenter {
    fn present(&mut self, item: &NewsItem) -> bool {
        if !self.seen.insert_if_absent(&item.guid) {
            return false;
        }
        self.shown.push(item.title.clone());
        true
    }
}

fn trigger_file(name: &str, content: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("news-triggers-{}-{}.txt", name, std::process::id()));
    std::fs::write(&path, content).unwrap();
    path
}

fn watch_config(triggers_path: PathBuf) -> WatchConfig {
    WatchConfig {
        triggers_path,
        sources: Vec::new(),
        poll_interval: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn test_watcher_polls_filters_and_dedupes() {
    init_tracing();

    let path = trigger_file("poll", "t1, TITLE, election\nADD, t1\n");
    let mut watcher = TriggerWatcher::new(watch_config(path.clone()), CollectingPresenter::default());
    watcher.add_source(Box::new(StaticSource {
        items: vec![sample_item("1", "Election night"), sample_item("2", "Weather")],
    }));
    watcher.add_source(Box::new(BrokenSource));
    watcher.add_source(Box::new(StaticSource {
        items: vec![sample_item("3", "More election coverage"), sample_item("1", "Election night")],
    }));
    assert_eq!(watcher.source_count(), 3);
    assert_eq!(watcher.rest().wait_at_least_ms, 5000);

    let report = watcher.poll_once().await.unwrap();
    assert_eq!(report.pulled, 4);
    assert_eq!(report.matched, 3);
    assert_eq!(report.shown, 2);
    assert_eq!(report.failed_sources, 1);
    assert_eq!(
        watcher.presenter().shown,
        vec!["Election night".to_string(), "More election coverage".to_string()]
    );

    // Nothing new on the second cycle
    let report = watcher.poll_once().await.unwrap();
    assert_eq!(report.matched, 3);
    assert_eq!(report.shown, 0);

    // Edits to the trigger file are picked up on the next poll
    std::fs::write(&path, "t1, TITLE, weather\nADD, t1\n").unwrap();
    let report = watcher.poll_once().await.unwrap();
    assert_eq!(report.matched, 1);
    assert_eq!(report.shown, 1);

    std::fs::remove_file(&path).unwrap();
}

#[tokio::test]
async fn test_watcher_cycle_fails_on_bad_trigger_file() {
    init_tracing();

    let path = trigger_file("bad", "t1, AND, a, b\nADD, t1\n");
    let mut watcher = TriggerWatcher::new(watch_config(path.clone()), CollectingPresenter::default());
    watcher.add_source(Box::new(StaticSource {
        items: vec![sample_item("1", "Anything")],
    }));

    let result = watcher.poll_once().await;
    assert!(matches!(result, Err(AggregatorError::Config(_))));
    assert!(watcher.presenter().shown.is_empty());

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_default_watch_config() {
    let config = WatchConfig::default();
    assert_eq!(config.poll_interval, Duration::from_secs(120));
    assert_eq!(
        config.sources,
        vec![
            FeedSourceSpec { uri: "http://news.google.com/news?output=rss".to_string() },
            FeedSourceSpec { uri: "http://news.yahoo.com/rss/topstories".to_string() },
        ]
    );
    assert_eq!(config.triggers_path, PathBuf::from("triggers.txt"));
}

#[test]
fn test_parse_feed_url() {
    let url = parse_feed_url("https://news.example.com/rss?edition=us").unwrap();
    assert_eq!(url.host_str(), Some("news.example.com"));
    assert!(parse_feed_url("http://news.google.com/news?output=rss").is_ok());

    assert!(matches!(parse_feed_url("not a url"), Err(AggregatorError::InvalidUrl(_))));
    assert!(matches!(parse_feed_url("/relative/feed.xml"), Err(AggregatorError::InvalidUrl(_))));
    match parse_feed_url("ftp://news.example.com/feed.xml") {
        Err(AggregatorError::UnsupportedScheme { scheme, .. }) => assert_eq!(scheme, "ftp"),
        other => panic!("expected UnsupportedScheme, got {:?}", other),
    }
}

const MIB: usize = 1024 * 1024;

fn fixed_response(status: &str, body: &[u8]) -> Vec<u8> {
    let mut response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/rss+xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        body.len()
    )
    .into_bytes();
    response.extend_from_slice(body);
    response
}

/// A 200 response with no Content-Length, sent in `chunk_size` pieces
fn chunked_response(body: &[u8], chunk_size: usize) -> Vec<u8> {
    let mut response = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n".to_vec();
    for chunk in body.chunks(chunk_size) {
        response.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
        response.extend_from_slice(chunk);
        response.extend_from_slice(b"\r\n");
    }
    response.extend_from_slice(b"0\r\n\r\n");
    response
}

/// Serve one canned response per connection, in order, on a local port.
/// Returns the feed URL and a counter of accepted connections.
async fn serve(responses: Vec<Vec<u8>>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    tokio::spawn(async move {
        for response in responses {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            counter.fetch_add(1, Ordering::SeqCst);

            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }

            // The client may hang up early on oversized bodies
            let _ = socket.write_all(&response).await;
            let _ = socket.shutdown().await;
        }
    });

    (format!("http://{}/feed.xml", addr), hits)
}

fn local_fetch_config(max_retries: u32) -> FetchConfig {
    FetchConfig {
        timeout_seconds: 10,
        max_retries,
        retry_delay_seconds: 1,
        max_feed_size_mb: 1,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_fetcher_reports_server_error() {
    init_tracing();

    let (url, hits) = serve(vec![fixed_response("500 Internal Server Error", b"oops")]).await;
    let fetcher = Fetcher::new(local_fetch_config(0)).unwrap();

    match fetcher.fetch_feed(&url).await {
        Err(AggregatorError::General(message)) => assert!(message.contains("500"), "{}", message),
        other => panic!("expected an HTTP status error, got {:?}", other),
    }
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_fetcher_retries_then_succeeds() {
    init_tracing();

    let (url, hits) = serve(vec![
        fixed_response("503 Service Unavailable", b"busy"),
        fixed_response("200 OK", RSS_SAMPLE.as_bytes()),
    ])
    .await;
    let fetcher = Fetcher::new(local_fetch_config(2)).unwrap();

    let body = fetcher.fetch_feed(&url).await.unwrap();
    assert_eq!(body, RSS_SAMPLE);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_fetcher_rejects_oversized_chunked_body() {
    init_tracing();

    let body = vec![b'x'; 3 * MIB];
    let (url, hits) = serve(vec![chunked_response(&body, 64 * 1024)]).await;
    let fetcher = Fetcher::new(local_fetch_config(2)).unwrap();

    match fetcher.fetch_feed(&url).await {
        Err(AggregatorError::FeedTooLarge { bytes, limit_mb }) => {
            assert!(bytes > MIB as u64);
            assert_eq!(limit_mb, 1);
        }
        other => panic!("expected FeedTooLarge, got {:?}", other.map(|b| b.len())),
    }
    // Oversized feeds are not retried
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_fetcher_rejects_declared_length_over_limit() {
    init_tracing();

    // 1.9 MiB, which a whole-MiB comparison would round down to the limit
    let body = vec![b'x'; MIB + 9 * MIB / 10];
    let (url, _) = serve(vec![fixed_response("200 OK", &body)]).await;
    let fetcher = Fetcher::new(local_fetch_config(0)).unwrap();

    match fetcher.fetch_feed(&url).await {
        Err(AggregatorError::FeedTooLarge { bytes, .. }) => {
            assert!(bytes > MIB as u64 && bytes <= body.len() as u64, "{}", bytes)
        }
        other => panic!("expected FeedTooLarge, got {:?}", other.map(|b| b.len())),
    }
}

#[tokio::test]
async fn test_fetcher_accepts_body_at_limit() {
    init_tracing();

    let body = vec![b'x'; MIB];
    let (url, _) = serve(vec![chunked_response(&body, 100_000)]).await;
    let fetcher = Fetcher::new(local_fetch_config(0)).unwrap();

    let fetched = fetcher.fetch_feed(&url).await.unwrap();
    assert_eq!(fetched.len(), MIB);
}

#[tokio::test]
async fn test_rss_feed_source_pulls_over_http() {
    init_tracing();

    let (url, _) = serve(vec![
        fixed_response("200 OK", RSS_SAMPLE.as_bytes()),
        fixed_response("200 OK", b"<html><body>Not a feed</body></html>"),
    ])
    .await;
    let fetcher = Arc::new(Fetcher::new(local_fetch_config(0)).unwrap());
    let mut source = RssFeedSource::new(FeedSourceSpec { uri: url.clone() }, fetcher);
    assert_eq!(source.source_id(), url);

    let items = source.pull().await.unwrap();
    let guids: Vec<&str> = items.iter().map(|i| i.guid.as_str()).collect();
    assert_eq!(guids, vec!["story-1", "story-2"]);

    assert!(matches!(source.pull().await, Err(AggregatorError::Parse(_))));
}
