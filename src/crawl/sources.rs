// src/crawl/sources.rs
//! Non-personalized crawl over the configured source list: cheap feed-native
//! extraction, no scraping and no generated summaries.

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::config::CrawlConfig;
use crate::crawl::types::{EnrichedItem, FeedSource};
use crate::crawl::{format_published, is_recent};

/// Stock placeholder when a feed entry carries no usable image.
const STOCK_IMAGE: &str =
    "https://images.unsplash.com/photo-1504711434969-e33886168f5c?auto=format&fit=crop&q=80&w=1000";

/// Characters of raw summary kept as the description.
const DESCRIPTION_CHARS: usize = 200;

/// Walk each configured source in order, keeping up to `source_cap` recent
/// entries per source. A failing source is reported and skipped.
pub async fn collect_sources(
    sources: &[(String, String)],
    feed: &dyn FeedSource,
    cfg: &CrawlConfig,
    now: DateTime<Utc>,
) -> Vec<EnrichedItem> {
    let window = Duration::hours(cfg.window_hours as i64);
    let mut out = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for (name, url) in sources {
        info!(source = %name, "fetching source feed");
        let entries = match feed.fetch(url).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = ?e, source = %name, "source feed fetch failed");
                counter!("crawl_feed_errors_total").increment(1);
                continue;
            }
        };
        counter!("crawl_entries_total").increment(entries.len() as u64);

        let mut kept = 0usize;
        for entry in entries {
            if kept >= cfg.source_cap {
                break;
            }
            if !is_recent(entry.published, now, window) {
                continue;
            }
            let id = entry.ident().to_string();
            if !seen.insert(id.clone()) {
                counter!("crawl_dedup_total").increment(1);
                continue;
            }

            out.push(EnrichedItem {
                id,
                title: entry.title.clone(),
                description: format!(
                    "{}...",
                    truncate_chars(entry.summary.as_deref().unwrap_or_default(), DESCRIPTION_CHARS)
                ),
                image_url: entry
                    .media_image
                    .clone()
                    .unwrap_or_else(|| STOCK_IMAGE.to_string()),
                source: name.clone(),
                url: entry.link,
                published_at: entry
                    .published
                    .map(format_published)
                    .unwrap_or_else(|| "Just now".to_string()),
            });
            kept += 1;
        }
        counter!("crawl_kept_total").increment(kept as u64);
    }

    out
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
