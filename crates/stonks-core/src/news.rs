use std::sync::Arc;

use serde::Deserialize;
use time::format_description::well_known::Rfc2822;
use time::OffsetDateTime;

use crate::adapters::Transport;
use crate::data_source::SourceError;
use crate::http_client::{HttpClient, HttpRequest};
use crate::{NewsItem, ServiceConfig, Symbol};

const FEED_URL: &str = "https://news.google.com/rss/search";
const DEFAULT_SOURCE: &str = "Google News";

/// Headlines from the Google News RSS search feed.
#[derive(Clone)]
pub struct NewsFeed {
    transport: Transport,
    user_agent: String,
}

impl NewsFeed {
    pub fn new(http_client: Arc<dyn HttpClient>, config: &ServiceConfig) -> Self {
        Self {
            transport: Transport::new(http_client, config),
            user_agent: config.user_agent.clone(),
        }
    }

    /// Feed entries for `ticker`; empty on any failure.
    pub async fn fetch_news(&self, ticker: &str) -> Vec<NewsItem> {
        match self.fetch(ticker).await {
            Ok(items) => items,
            Err(error) => {
                tracing::warn!(ticker, code = error.code(), "news lookup failed: {}", error.message());
                Vec::new()
            }
        }
    }

    async fn fetch(&self, ticker: &str) -> Result<Vec<NewsItem>, SourceError> {
        let symbol = Symbol::parse(ticker)
            .map_err(|error| SourceError::configuration(error.to_string()))?;
        let url = format!(
            "{FEED_URL}?q={}+stock&hl=en-US&gl=US&ceid=US:en",
            urlencoding::encode(symbol.as_str())
        );
        let request = HttpRequest::get(url).with_header("user-agent", self.user_agent.as_str());

        let response = self.transport.send(request).await.map_err(|error| {
            SourceError::upstream(format!("news feed transport error: {}", error.message()))
        })?;
        if !response.is_success() {
            return Err(SourceError::status_of("news feed", response.status));
        }

        parse_feed(&response.body, OffsetDateTime::now_utc())
    }
}

/// Decode an RSS document; `now` stamps entries with unreadable dates.
pub fn parse_feed(xml: &str, now: OffsetDateTime) -> Result<Vec<NewsItem>, SourceError> {
    let rss: Rss = quick_xml::de::from_str(xml)
        .map_err(|e| SourceError::parse(format!("failed to parse news feed: {e}")))?;

    Ok(rss
        .channel
        .items
        .into_iter()
        .filter_map(|item| {
            let title = item.title?;
            let (headline, source) = split_title(&title);
            let published_at = item
                .pub_date
                .as_deref()
                .and_then(|raw| OffsetDateTime::parse(raw.trim(), &Rfc2822).ok())
                .unwrap_or(now);

            Some(NewsItem {
                headline,
                url: item.link.unwrap_or_default(),
                source,
                published_at,
                summary: item.description.unwrap_or_default(),
            })
        })
        .collect())
}

/// Split `"Headline - Source"` on the last separator.
pub fn split_title(title: &str) -> (String, String) {
    match title.rsplit_once(" - ") {
        Some((headline, source)) if !source.trim().is_empty() => {
            (headline.trim().to_owned(), source.trim().to_owned())
        }
        _ => (title.trim().to_owned(), String::from(DEFAULT_SOURCE)),
    }
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_support::StubHttpClient;
    use crate::retry::RetryConfig;
    use time::macros::datetime;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>"AAPL stock" - Google News</title>
    <link>https://news.google.com/</link>
    <item>
      <title>Apple shares climb after earnings beat - Reuters</title>
      <link>https://news.google.com/articles/a1</link>
      <pubDate>Thu, 02 May 2024 20:30:00 GMT</pubDate>
      <description>&lt;a href="https://example.test"&gt;Apple shares climb&lt;/a&gt;</description>
      <source url="https://www.reuters.com">Reuters</source>
    </item>
    <item>
      <title>Buy-side notes - iPhone - The Verge</title>
      <link>https://news.google.com/articles/a2</link>
      <pubDate>not a date</pubDate>
    </item>
    <item>
      <title>Untitled market wrap</title>
      <link>https://news.google.com/articles/a3</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn splits_on_last_separator_with_default_source() {
        assert_eq!(
            split_title("A - B - Source"),
            (String::from("A - B"), String::from("Source"))
        );
        assert_eq!(
            split_title("No separator"),
            (String::from("No separator"), String::from("Google News"))
        );
    }

    #[test]
    fn parses_items_and_falls_back_to_now() {
        let now = datetime!(2024-06-01 12:00 UTC);
        let items = parse_feed(FEED, now).expect("feed parses");

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].headline, "Apple shares climb after earnings beat");
        assert_eq!(items[0].source, "Reuters");
        assert_eq!(items[0].published_at, datetime!(2024-05-02 20:30 UTC));
        assert!(items[0].summary.starts_with("<a href="));

        assert_eq!(items[1].headline, "Buy-side notes - iPhone");
        assert_eq!(items[1].source, "The Verge");
        assert_eq!(items[1].published_at, now);

        assert_eq!(items[2].source, "Google News");
        assert!(items[2].summary.is_empty());
    }

    #[test]
    fn empty_channel_is_not_an_error() {
        let items = parse_feed(
            "<rss><channel><title>x</title></channel></rss>",
            OffsetDateTime::UNIX_EPOCH,
        )
        .expect("parses");
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn fetch_failures_return_empty() {
        let client = Arc::new(
            StubHttpClient::new()
                .json("news.google.com/rss/search?q=AAPL+stock", "<html>not rss")
                .status("q=MSFT", 503),
        );
        let config = ServiceConfig::default().with_retry(RetryConfig::no_retry());
        let feed = NewsFeed::new(client.clone(), &config);

        assert!(feed.fetch_news("AAPL").await.is_empty());
        assert!(feed.fetch_news("MSFT").await.is_empty());
        assert!(feed.fetch_news("").await.is_empty());
        assert_eq!(client.requests().len(), 2);
    }

    #[tokio::test]
    async fn fetch_builds_search_url() {
        let client = Arc::new(StubHttpClient::new().json("news.google.com", FEED));
        let feed = NewsFeed::new(client.clone(), &ServiceConfig::default());

        let items = feed.fetch_news("aapl").await;
        assert_eq!(items.len(), 3);
        assert_eq!(
            client.requests()[0].url,
            "https://news.google.com/rss/search?q=AAPL+stock&hl=en-US&gl=US&ceid=US:en"
        );
    }
}
