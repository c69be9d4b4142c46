// tests/crawl_dedup.rs
use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};

use newsdesk_crawler::config::CrawlConfig;
use newsdesk_crawler::crawl::collect_topics;
use newsdesk_crawler::crawl::topic::Enrichers;
use newsdesk_crawler::crawl::types::{FeedItem, FeedSource};
use newsdesk_crawler::enrich::image::ImageSource;
use newsdesk_crawler::enrich::summary::FixedSummarizer;

struct NullImages;

#[async_trait]
impl ImageSource for NullImages {
    async fn scrape(&self, _article_url: &str) -> Option<String> {
        None
    }
}

fn item(id: &str, title: &str) -> FeedItem {
    FeedItem {
        guid: Some(id.to_string()),
        title: title.to_string(),
        summary: None,
        link: format!("https://example.test/{id}"),
        published: Some(Utc::now() - Duration::hours(1)),
        source: None,
        media_image: None,
    }
}

/// Serves a different batch depending on which topic the query URL encodes.
struct PerTopicFeed;

#[async_trait]
impl FeedSource for PerTopicFeed {
    async fn fetch(&self, url: &str) -> Result<Vec<FeedItem>> {
        if url.contains("q=Alpha") {
            Ok(vec![item("shared", "From alpha"), item("a2", "Alpha two")])
        } else {
            Ok(vec![item("shared", "From beta"), item("b2", "Beta two")])
        }
    }
}

fn enrichers<'a>(
    images: &'a NullImages,
    summaries: &'a FixedSummarizer,
) -> Enrichers<'a> {
    Enrichers {
        images,
        summaries,
    }
}

#[tokio::test]
async fn duplicate_identifiers_within_a_topic_are_dropped() {
    struct DupFeed;

    #[async_trait]
    impl FeedSource for DupFeed {
        async fn fetch(&self, _url: &str) -> Result<Vec<FeedItem>> {
            Ok(vec![
                item("x", "First occurrence"),
                item("x", "Repeat occurrence"),
                item("y", "Distinct"),
            ])
        }
    }

    let images = NullImages;
    let summaries = FixedSummarizer { text: "s".into() };
    let enrich = enrichers(&images, &summaries);
    let topics = vec!["World".to_string()];

    let out = collect_topics(&topics, &DupFeed, &enrich, &CrawlConfig::default(), Utc::now()).await;
    assert_eq!(
        out.iter().map(|i| i.id.as_str()).collect::<Vec<_>>(),
        vec!["x", "y"]
    );
    assert_eq!(out[0].title, "First occurrence");
}

#[tokio::test]
async fn accepted_items_never_exceed_the_topic_cap() {
    struct BigFeed;

    #[async_trait]
    impl FeedSource for BigFeed {
        async fn fetch(&self, _url: &str) -> Result<Vec<FeedItem>> {
            Ok((0..30)
                .map(|i| item(&format!("id{i}"), &format!("Story {i}")))
                .collect())
        }
    }

    let images = NullImages;
    let summaries = FixedSummarizer { text: "s".into() };
    let enrich = enrichers(&images, &summaries);
    let topics = vec!["World".to_string()];
    let cfg = CrawlConfig::default();

    let out = collect_topics(&topics, &BigFeed, &enrich, &cfg, Utc::now()).await;
    assert_eq!(out.len(), cfg.topic_cap);
    assert_eq!(out[0].id, "id0");
    assert_eq!(out[9].id, "id9");
}

#[tokio::test]
async fn global_dedup_keeps_the_first_topic_occurrence() {
    let images = NullImages;
    let summaries = FixedSummarizer { text: "s".into() };
    let enrich = enrichers(&images, &summaries);
    let topics = vec!["Alpha".to_string(), "Beta".to_string()];

    let out =
        collect_topics(&topics, &PerTopicFeed, &enrich, &CrawlConfig::default(), Utc::now()).await;

    let shared: Vec<_> = out.iter().filter(|i| i.id == "shared").collect();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].title, "From alpha");
    // Both topics' unique items survive, in topic iteration order.
    assert_eq!(
        out.iter().map(|i| i.id.as_str()).collect::<Vec<_>>(),
        vec!["shared", "a2", "b2"]
    );
}
