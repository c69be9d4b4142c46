// src/crawl/mod.rs
pub mod feed;
pub mod sources;
pub mod topic;
pub mod types;

use chrono::{DateTime, Duration, Utc};
use metrics::{describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::crawl::topic::Enrichers;
use crate::crawl::types::{EnrichedItem, FeedSource};
use crate::enrich::image::ImageResolver;
use crate::enrich::summary;
use crate::output;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("crawl_entries_total", "Raw entries parsed from feeds.");
        describe_counter!(
            "crawl_kept_total",
            "Entries kept after recency filtering and dedup."
        );
        describe_counter!("crawl_dedup_total", "Entries removed as duplicates.");
        describe_counter!("crawl_feed_errors_total", "Feed fetch/parse errors.");
        describe_counter!(
            "enrich_image_fallback_total",
            "Items that fell back to the placeholder image."
        );
        describe_counter!(
            "enrich_summary_fallback_total",
            "Items that fell back to the digest summary."
        );
        describe_gauge!("crawl_last_run_ts", "Unix ts when a crawl last persisted.");
    });
}

/// Strip markup from a feed-supplied summary: decode entities, drop tags,
/// collapse whitespace. Best-effort normalization; never fails.
pub fn strip_html(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    let out = re_tags.replace_all(&decoded, " ").to_string();

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// Strict recency predicate: true only for a parseable timestamp inside the
/// window. Undated entries are excluded; they tend to be stale or ad-like.
pub fn is_recent(published: Option<DateTime<Utc>>, now: DateTime<Utc>, window: Duration) -> bool {
    match published {
        Some(p) => p >= now - window,
        None => false,
    }
}

/// Display form used in the snapshot.
pub fn format_published(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Crawl every topic sequentially, merging batches under a single global dedup
/// set. First-seen occurrence wins: first topic processed, first item within it.
pub async fn collect_topics(
    topics: &[String],
    feed: &dyn FeedSource,
    enrich: &Enrichers<'_>,
    cfg: &crate::config::CrawlConfig,
    now: DateTime<Utc>,
) -> Vec<EnrichedItem> {
    ensure_metrics_described();

    let mut all = Vec::new();
    let mut seen_global: HashSet<String> = HashSet::new();

    for t in topics {
        let batch = topic::fetch_topic(feed, enrich, cfg, t, now).await;
        info!(topic = %t, kept = batch.len(), "topic batch done");
        for item in batch {
            if seen_global.insert(item.id.clone()) {
                all.push(item);
            }
        }
    }
    all
}

/// Write the snapshot unless the run produced nothing; an empty result must not
/// clobber the previous valid snapshot. Returns the number of items persisted.
pub fn persist_snapshot(cfg: &AppConfig, items: &[EnrichedItem]) -> anyhow::Result<usize> {
    if items.is_empty() {
        warn!("no items collected; keeping previous snapshot");
        return Ok(0);
    }
    output::write_snapshot(&cfg.snapshot_path(), items)?;
    gauge!("crawl_last_run_ts").set(Utc::now().timestamp().max(0) as f64);
    info!(items = items.len(), path = %cfg.snapshot_path().display(), "snapshot written");
    Ok(items.len())
}

/// Personalized run: topics from the preferences document, full enrichment.
pub async fn run_topics(cfg: &AppConfig) -> anyhow::Result<usize> {
    let topics = cfg.load_topics();
    if topics.is_empty() {
        warn!("topic list is empty; nothing to crawl");
        return Ok(0);
    }
    info!(?topics, "starting topic crawl");

    let feed = feed::HttpFeed::new(cfg.crawl.feed_timeout_secs);
    let images = ImageResolver::new();
    let summaries = summary::from_env();
    let enrich = Enrichers {
        images: &images,
        summaries: summaries.as_ref(),
    };

    let items = collect_topics(&topics, &feed, &enrich, &cfg.crawl, Utc::now()).await;
    persist_snapshot(cfg, &items)
}

/// Non-personalized run over the configured source list.
pub async fn run_sources(cfg: &AppConfig) -> anyhow::Result<usize> {
    ensure_metrics_described();

    let srcs = cfg.load_sources();
    if srcs.is_empty() {
        warn!("source list is empty; nothing to crawl");
        return Ok(0);
    }
    info!(count = srcs.len(), "starting source crawl");

    let feed = feed::HttpFeed::new(cfg.crawl.feed_timeout_secs);
    let items = sources::collect_sources(&srcs, &feed, &cfg.crawl, Utc::now()).await;
    persist_snapshot(cfg, &items)
}
