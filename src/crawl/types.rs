// src/crawl/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};

/// One raw entry parsed from a syndicated feed, pre-enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    /// Feed-provided guid text, when present.
    pub guid: Option<String>,
    pub title: String,
    /// Raw summary/description, possibly HTML.
    pub summary: Option<String>,
    /// Canonical article URL. Entries without a link are dropped at parse time.
    pub link: String,
    /// Parsed publication time; `None` when the feed date was missing or unparseable.
    pub published: Option<DateTime<Utc>>,
    /// Nested `<source>` element text, e.g. the originating outlet.
    pub source: Option<String>,
    /// First image URL found in enclosure/media elements, when present.
    pub media_image: Option<String>,
}

impl FeedItem {
    /// Dedup identifier: guid text when the feed provides one, else the link.
    pub fn ident(&self) -> &str {
        self.guid.as_deref().unwrap_or(&self.link)
    }
}

/// One fully enriched entry as persisted in the snapshot. Field names follow
/// the snapshot consumer's contract (camelCase JSON).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub source: String,
    pub url: String,
    pub published_at: String,
}

#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch a feed URL and return its entries in feed order.
    async fn fetch(&self, url: &str) -> Result<Vec<FeedItem>>;
}
