// tests/crawl_sources.rs
use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};

use newsdesk_crawler::config::CrawlConfig;
use newsdesk_crawler::crawl::sources::collect_sources;
use newsdesk_crawler::crawl::types::{FeedItem, FeedSource};

fn item(id: &str, age_hours: i64, media: Option<&str>) -> FeedItem {
    FeedItem {
        guid: Some(id.to_string()),
        title: format!("Story {id}"),
        summary: Some("summary ".repeat(40)),
        link: format!("https://example.test/{id}"),
        published: Some(Utc::now() - Duration::hours(age_hours)),
        source: None,
        media_image: media.map(String::from),
    }
}

/// One healthy source with more recent entries than the cap, one dead source.
struct TwoSources;

#[async_trait]
impl FeedSource for TwoSources {
    async fn fetch(&self, url: &str) -> Result<Vec<FeedItem>> {
        if url.contains("dead") {
            anyhow::bail!("unreachable")
        }
        Ok(vec![
            item("a", 1, Some("https://img.example.test/a.jpg")),
            item("b", 2, None),
            item("stale", 48, None),
            item("c", 3, None),
            item("d", 4, None),
            item("e", 5, None),
            item("f", 6, None),
        ])
    }
}

#[tokio::test]
async fn per_source_cap_and_failures_do_not_cross_sources() {
    let sources = vec![
        ("Dead Wire".to_string(), "https://dead.example.test/rss".to_string()),
        ("Live Wire".to_string(), "https://live.example.test/rss".to_string()),
    ];
    let cfg = CrawlConfig::default();

    let out = collect_sources(&sources, &TwoSources, &cfg, Utc::now()).await;

    // The dead source contributes nothing; the live one is capped at 5 recent.
    assert_eq!(out.len(), cfg.source_cap);
    assert!(out.iter().all(|i| i.source == "Live Wire"));
    assert!(out.iter().all(|i| i.id != "stale"));
    // Ids in feed order, stale entry skipped without consuming the cap.
    assert_eq!(
        out.iter().map(|i| i.id.as_str()).collect::<Vec<_>>(),
        vec!["a", "b", "c", "d", "e"]
    );

    // Feed-native image when present, stock placeholder otherwise.
    assert_eq!(out[0].image_url, "https://img.example.test/a.jpg");
    assert!(out[1].image_url.contains("unsplash.com"));

    // Long summaries are clipped with a trailing ellipsis.
    assert!(out[0].description.ends_with("..."));
    assert!(out[0].description.chars().count() <= 203);
}
