use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use regex::{Captures, Regex};
use reqwest::header::USER_AGENT;
use tracing::{debug, info, warn};

use crate::error::FeedError;

pub const ENTRIES_PER_FEED: usize = 5;
pub const MAX_TOPICS: usize = 10;

const FEED_USER_AGENT: &str = "clipsmith-feed-reader/0.1";

pub const FALLBACK_TOPICS: &[&str] = &[
    "Python Programming Tips for Beginners",
    "Machine Learning Basics Explained",
    "How to Start Coding in 2024",
    "Best Programming Languages to Learn",
    "Understanding Artificial Intelligence",
    "Web Development Fundamentals",
    "Cybersecurity Best Practices",
    "Cloud Computing Explained Simply",
    "Mobile App Development Trends",
    "Data Science Career Guide",
];

static ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:item|entry)\b[^>]*>(.*?)</(?:item|entry)>").expect("valid entry regex")
});
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title>").expect("valid title regex"));
static CDATA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("valid cdata regex"));
static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#([xX][0-9a-fA-F]+|[0-9]+);").expect("valid entity regex"));

/// Trending topic titles pulled from RSS/Atom feeds.
pub struct TopicSource {
    client: reqwest::Client,
    feeds: Vec<String>,
    keywords: Vec<String>,
}

impl TopicSource {
    pub fn new(feeds: Vec<String>, keywords: Vec<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self {
            client,
            feeds,
            keywords: keywords.into_iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    /// Up to ten keyword-matching titles in first-seen order, or the built-in fallbacks. Never empty.
    pub async fn fetch_topics(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut topics = Vec::new();

        for url in &self.feeds {
            let titles = match self.fetch_feed(url).await {
                Ok(titles) => titles,
                Err(e) => {
                    warn!("Skipping feed: {}", e);
                    continue;
                }
            };
            for title in titles {
                if matches_keywords(&title, &self.keywords) && seen.insert(title.clone()) {
                    debug!("Trending topic: {}", title);
                    topics.push(title);
                }
            }
            if topics.len() >= MAX_TOPICS {
                break;
            }
        }
        topics.truncate(MAX_TOPICS);

        if topics.is_empty() {
            warn!("No trending topics found, using fallback list");
            return FALLBACK_TOPICS.iter().map(|t| t.to_string()).collect();
        }
        info!("Found {} trending topics", topics.len());
        topics
    }

    async fn fetch_feed(&self, url: &str) -> Result<Vec<String>, FeedError> {
        let request_error = |source: reqwest::Error| FeedError::Request {
            url: url.to_string(),
            source,
        };
        let body = self
            .client
            .get(url)
            .header(USER_AGENT, FEED_USER_AGENT)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(request_error)?
            .text()
            .await
            .map_err(request_error)?;

        let titles = entry_titles(&body, ENTRIES_PER_FEED);
        if titles.is_empty() {
            return Err(FeedError::NoEntries {
                url: url.to_string(),
            });
        }
        Ok(titles)
    }
}

/// Titles of the first `limit` `<item>`/`<entry>` elements.
pub fn entry_titles(xml: &str, limit: usize) -> Vec<String> {
    ENTRY_RE
        .captures_iter(xml)
        .take(limit)
        .filter_map(|entry| {
            let raw = TITLE_RE.captures(entry.get(1)?.as_str())?.get(1)?.as_str();
            let title = decode_text(raw);
            (!title.is_empty()).then_some(title)
        })
        .collect()
}

/// Case-insensitive substring match; `keywords` are expected lowercase.
pub fn matches_keywords(title: &str, keywords: &[String]) -> bool {
    let title = title.to_lowercase();
    keywords.iter().any(|k| title.contains(k.as_str()))
}

fn decode_text(raw: &str) -> String {
    let text = CDATA_RE.replace_all(raw, "$1");
    let text = NUMERIC_ENTITY_RE.replace_all(&text, |caps: &Captures| {
        let code = &caps[1];
        let value = match code.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse().ok(),
        };
        value
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });
    let text = text
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn rss(titles: &[&str]) -> String {
        let items: String = titles
            .iter()
            .map(|t| format!("<item><title>{}</title><link>http://x</link></item>", t))
            .collect();
        format!(
            "<?xml version=\"1.0\"?><rss><channel><title>Tech News</title>{}</channel></rss>",
            items
        )
    }

    fn keywords() -> Vec<String> {
        vec!["python".into(), "cloud".into(), "ai".into()]
    }

    async fn serve(server: &MockServer, route: &str, body: String) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    #[test]
    fn parses_rss_items_and_ignores_channel_title() {
        let titles = entry_titles(&rss(&["One", "Two"]), 5);
        assert_eq!(titles, vec!["One", "Two"]);
    }

    #[test]
    fn parses_atom_entries_with_cdata_and_entities() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
            <title>Blog</title>
            <entry><title type="html"><![CDATA[Rust & Python]]></title></entry>
            <entry><title>AT&amp;T moves to the &quot;cloud&quot; &#8212; again</title></entry>
        </feed>"#;
        assert_eq!(
            entry_titles(xml, 5),
            vec!["Rust & Python", "AT&T moves to the \"cloud\" \u{2014} again"]
        );
    }

    #[test]
    fn only_first_five_entries_are_read() {
        let xml = rss(&["a", "b", "c", "d", "e", "f", "g"]);
        assert_eq!(entry_titles(&xml, ENTRIES_PER_FEED).len(), 5);
    }

    #[test]
    fn keyword_match_is_case_insensitive_substring() {
        assert!(matches_keywords("New PYTHON release", &keywords()));
        assert!(matches_keywords("Cloudflare outage", &keywords()));
        assert!(!matches_keywords("Gardening tips", &keywords()));
    }

    #[tokio::test]
    async fn merges_feeds_skipping_failures_and_duplicates() {
        let server = MockServer::start().await;
        serve(
            &server,
            "/a",
            rss(&["Python 3.13 released", "Gardening tips", "Cloud costs rising"]),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        serve(&server, "/b", rss(&["Cloud costs rising", "Python 3.13 tooling"])).await;

        let source = TopicSource::new(
            vec![
                format!("{}/a", server.uri()),
                format!("{}/broken", server.uri()),
                format!("{}/b", server.uri()),
            ],
            keywords(),
        );
        assert_eq!(
            source.fetch_topics().await,
            vec![
                "Python 3.13 released",
                "Cloud costs rising",
                "Python 3.13 tooling"
            ]
        );
    }

    #[tokio::test]
    async fn caps_at_ten_topics() {
        let server = MockServer::start().await;
        let mut feeds = Vec::new();
        for feed in 0..3 {
            let titles: Vec<String> = (0..5).map(|i| format!("Python news {}-{}", feed, i)).collect();
            let refs: Vec<&str> = titles.iter().map(String::as_str).collect();
            let route = format!("/feed{}", feed);
            serve(&server, &route, rss(&refs)).await;
            feeds.push(format!("{}{}", server.uri(), route));
        }

        let topics = TopicSource::new(feeds, keywords()).fetch_topics().await;
        assert_eq!(topics.len(), MAX_TOPICS);
        assert_eq!(topics[0], "Python news 0-0");
        assert_eq!(topics[9], "Python news 1-4");
    }

    #[tokio::test]
    async fn never_empty_when_every_feed_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source = TopicSource::new(
            vec![
                format!("{}/missing", server.uri()),
                "http://127.0.0.1:9/unreachable".to_string(),
            ],
            keywords(),
        );
        let topics = source.fetch_topics().await;
        assert_eq!(topics.len(), FALLBACK_TOPICS.len());
        assert_eq!(topics[0], FALLBACK_TOPICS[0]);
    }

    #[tokio::test]
    async fn sends_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("user-agent", FEED_USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_string(rss(&["AI everywhere"])))
            .expect(1)
            .mount(&server)
            .await;

        let topics = TopicSource::new(vec![server.uri()], keywords()).fetch_topics().await;
        assert_eq!(topics, vec!["AI everywhere"]);
    }
}
