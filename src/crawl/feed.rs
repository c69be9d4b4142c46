// src/crawl/feed.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;

use crate::crawl::types::{FeedItem, FeedSource};

const FEED_USER_AGENT: &str = "newsdesk-crawler/0.1 (+https://github.com/newsdesk/newsdesk-crawler)";

/// Topic search feed for the personalized path.
pub fn topic_query_url(topic: &str) -> String {
    format!(
        "https://news.google.com/rss/search?q={}&hl=en-US&gl=US&ceid=US:en",
        urlencoding::encode(topic)
    )
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    guid: Option<GuidTag>,
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    source: Option<SourceTag>,
    enclosure: Option<Enclosure>,
    #[serde(rename = "media:content", default)]
    media_content: Vec<MediaContent>,
}
#[derive(Debug, Deserialize)]
struct GuidTag {
    #[serde(rename = "$text")]
    value: Option<String>,
}
#[derive(Debug, Deserialize)]
struct SourceTag {
    #[serde(rename = "$text")]
    name: Option<String>,
}
#[derive(Debug, Deserialize)]
struct Enclosure {
    #[serde(rename = "@url")]
    url: Option<String>,
    #[serde(rename = "@type")]
    kind: Option<String>,
}
#[derive(Debug, Deserialize)]
struct MediaContent {
    #[serde(rename = "@url")]
    url: Option<String>,
}

/// Feed dates are RFC 2822 ("Mon, 03 Aug 2026 12:00:00 GMT"); a few sources
/// emit RFC 3339 instead, so try both before giving up.
fn parse_feed_date(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(ts)
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(ts).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse an RSS 2.0 document into feed items, preserving document order.
/// Entries without a link are dropped (they cannot be deduplicated or enriched).
pub fn parse_rss(body: &str) -> Result<Vec<FeedItem>> {
    let xml_clean = scrub_html_entities_for_xml(body);
    let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;

    let mut out = Vec::with_capacity(rss.channel.item.len());
    for it in rss.channel.item {
        let Some(link) = it.link.filter(|l| !l.trim().is_empty()) else {
            continue;
        };
        let media_image = it
            .media_content
            .iter()
            .find_map(|m| m.url.clone())
            .or_else(|| {
                it.enclosure.as_ref().and_then(|e| {
                    let is_image = e.kind.as_deref().is_some_and(|k| k.starts_with("image"));
                    if is_image {
                        e.url.clone()
                    } else {
                        None
                    }
                })
            });

        out.push(FeedItem {
            guid: it.guid.and_then(|g| g.value).filter(|g| !g.is_empty()),
            title: it.title.unwrap_or_default(),
            summary: it.description,
            link,
            published: it.pub_date.as_deref().and_then(parse_feed_date),
            source: it.source.and_then(|s| s.name).filter(|s| !s.is_empty()),
            media_image,
        });
    }
    Ok(out)
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

/// HTTP-backed feed source shared by the topic and source crawl paths.
pub struct HttpFeed {
    http: reqwest::Client,
}

impl HttpFeed {
    pub fn new(timeout_secs: u64) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(FEED_USER_AGENT)
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("reqwest client");
        Self { http }
    }
}

#[async_trait]
impl FeedSource for HttpFeed {
    async fn fetch(&self, url: &str) -> Result<Vec<FeedItem>> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .context("feed http get()")?
            .error_for_status()
            .context("feed http status")?;
        let body = resp.text().await.context("feed http .text()")?;
        parse_rss(&body)
    }
}
