// src/crawl/topic.rs
//! Per-topic fetch: walk the feed in order, dedup and recency-filter, then fan
//! enrichment out through a bounded, order-preserving stream.

use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use metrics::counter;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::config::CrawlConfig;
use crate::crawl::types::{EnrichedItem, FeedItem, FeedSource};
use crate::crawl::{feed, format_published, is_recent, strip_html};
use crate::enrich::image::{resolve_image, ImageSource};
use crate::enrich::summary::{summarize, Summarizer};

/// Source label used when the feed does not attribute an outlet.
pub const DEFAULT_SOURCE: &str = "Google News";

/// Enrichment collaborators for one run, borrowed into each topic batch.
pub struct Enrichers<'a> {
    pub images: &'a dyn ImageSource,
    pub summaries: &'a dyn Summarizer,
}

/// Fetch one topic and return its enriched batch in feed order.
///
/// A feed failure yields an empty batch (reported, not fatal); a single item's
/// enrichment failure degrades to fallback values inside the enrichment calls.
pub async fn fetch_topic(
    source: &dyn FeedSource,
    enrich: &Enrichers<'_>,
    cfg: &CrawlConfig,
    topic: &str,
    now: DateTime<Utc>,
) -> Vec<EnrichedItem> {
    let url = feed::topic_query_url(topic);
    let entries = match source.fetch(&url).await {
        Ok(v) => v,
        Err(e) => {
            warn!(error = ?e, topic, "topic feed fetch failed");
            counter!("crawl_feed_errors_total").increment(1);
            return Vec::new();
        }
    };
    counter!("crawl_entries_total").increment(entries.len() as u64);

    let window = Duration::hours(cfg.window_hours as i64);
    let mut seen: HashSet<String> = HashSet::new();
    let mut accepted: Vec<FeedItem> = Vec::new();
    let mut dedup_out = 0u64;

    for entry in entries {
        if accepted.len() >= cfg.topic_cap {
            break;
        }
        let id = entry.ident().to_string();
        if seen.contains(&id) {
            dedup_out += 1;
            continue;
        }
        if !is_recent(entry.published, now, window) {
            continue;
        }
        seen.insert(id);
        accepted.push(entry);
    }
    counter!("crawl_dedup_total").increment(dedup_out);
    debug!(topic, accepted = accepted.len(), dedup = dedup_out, "topic walk done");

    // Bounded fan-out; `buffered` keeps output order equal to input order even
    // though completion order may differ.
    let enriched: Vec<EnrichedItem> = stream::iter(accepted)
        .map(|entry| enrich_entry(entry, topic, enrich))
        .buffered(cfg.enrich_concurrency.max(1))
        .collect()
        .await;

    counter!("crawl_kept_total").increment(enriched.len() as u64);
    enriched
}

/// The two enrichment calls per item are independent; run them concurrently.
async fn enrich_entry(entry: FeedItem, topic: &str, e: &Enrichers<'_>) -> EnrichedItem {
    let context = strip_html(entry.summary.as_deref().unwrap_or_default());
    let (image_url, description) = tokio::join!(
        resolve_image(e.images, &entry.link, topic, &entry.title),
        summarize(e.summaries, &entry.title, &context),
    );

    EnrichedItem {
        id: entry.ident().to_string(),
        title: entry.title.clone(),
        description,
        image_url,
        source: entry.source.unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
        url: entry.link,
        published_at: entry
            .published
            .map(format_published)
            .unwrap_or_else(|| "Just now".to_string()),
    }
}
