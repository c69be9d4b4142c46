// src/enrich/image.rs
//! Representative-image resolution: scrape the article page for social-card
//! metadata, with a deterministic placeholder when scraping comes up empty.

use async_trait::async_trait;
use metrics::counter;
use once_cell::sync::OnceCell;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::debug;

/// Realistic client identity; aggregator pages serve bot UAs a stub without metadata.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const PAGE_TIMEOUT: Duration = Duration::from_secs(8);

/// Ordered metadata selectors; first acceptable match wins.
const META_SELECTORS: &[(&str, &str)] = &[
    ("property", "og:image"),
    ("name", "twitter:image"),
    ("property", "twitter:image"),
    ("name", "og:image"),
    ("itemprop", "image"),
];

/// Substrings marking a non-article image (platform chrome, branding, avatars).
const REJECT_SUBSTRINGS: &[&str] = &[
    "logo", "icon", "google", "default", "fallback", "avatar", "profile",
];

/// Best-effort page scrape. `None` means "use the fallback"; errors never escape.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn scrape(&self, article_url: &str) -> Option<String>;
}

pub struct ImageResolver {
    http: reqwest::Client,
}

impl ImageResolver {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .connect_timeout(Duration::from_secs(4))
            .timeout(PAGE_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .expect("reqwest client");
        Self { http }
    }

    /// Fetch a page; returns (final URL after redirects, body).
    async fn fetch_page(&self, url: &str) -> Option<(String, String)> {
        let resp = self.http.get(url).send().await.ok()?;
        if !resp.status().is_success() {
            return None;
        }
        let final_url = resp.url().to_string();
        let body = resp.text().await.ok()?;
        Some((final_url, body))
    }
}

impl Default for ImageResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageSource for ImageResolver {
    async fn scrape(&self, article_url: &str) -> Option<String> {
        let (final_url, mut body) = self.fetch_page(article_url).await?;

        // Aggregator redirect pages embed the destination instead of 30x-ing.
        if is_redirect_wrapper(&final_url) {
            if let Some(dest) = embedded_destination(&body) {
                debug!(dest = %dest, "unwrapping aggregator redirect page");
                if let Some((_, dest_body)) = self.fetch_page(&dest).await {
                    body = dest_body;
                }
            }
        }

        first_acceptable_image(&body)
    }
}

/// Resolve an image for an article, falling back to a stable placeholder.
/// This never fails: scrape errors are absorbed into the fallback branch.
pub async fn resolve_image(
    source: &dyn ImageSource,
    article_url: &str,
    topic: &str,
    title: &str,
) -> String {
    match source.scrape(article_url).await {
        Some(url) => url,
        None => {
            counter!("enrich_image_fallback_total").increment(1);
            fallback_image(topic, title)
        }
    }
}

pub fn is_redirect_wrapper(final_url: &str) -> bool {
    final_url.contains("google.com") && final_url.contains("rss/articles")
}

/// Destination URL embedded in a redirect-wrapper body, e.g. `url="https://..."`.
pub fn embedded_destination(body: &str) -> Option<String> {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| Regex::new(r#"url="([^"]+)""#).unwrap());
    re.captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Scan meta tags for the ordered selector list; selector priority beats
/// document order, and a rejected candidate falls through to the next selector.
pub fn first_acceptable_image(html: &str) -> Option<String> {
    for (key, value) in META_SELECTORS {
        if let Some(content) = first_meta_content(html, key, value) {
            let url = normalize_protocol(&content);
            if acceptable(&url) {
                return Some(url);
            }
        }
    }
    None
}

fn first_meta_content(html: &str, attr_key: &str, attr_value: &str) -> Option<String> {
    static RE_META: OnceCell<Regex> = OnceCell::new();
    static RE_ATTR: OnceCell<Regex> = OnceCell::new();
    let re_meta = RE_META.get_or_init(|| Regex::new(r"(?is)<meta\b[^>]*>").unwrap());
    let re_attr = RE_ATTR.get_or_init(|| {
        Regex::new(r#"([a-zA-Z][a-zA-Z0-9:-]*)\s*=\s*["']([^"']*)["']"#).unwrap()
    });

    for tag in re_meta.find_iter(html) {
        let mut matched = false;
        let mut content: Option<String> = None;
        for caps in re_attr.captures_iter(tag.as_str()) {
            let k = caps[1].to_ascii_lowercase();
            let v = &caps[2];
            if k == attr_key && v.eq_ignore_ascii_case(attr_value) {
                matched = true;
            } else if k == "content" && !v.trim().is_empty() {
                content = Some(v.trim().to_string());
            }
        }
        if matched {
            if let Some(c) = content {
                return Some(c);
            }
        }
    }
    None
}

fn acceptable(url: &str) -> bool {
    let lower = url.to_lowercase();
    !REJECT_SUBSTRINGS.iter().any(|s| lower.contains(s))
}

fn normalize_protocol(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("//") {
        format!("https://{rest}")
    } else {
        url.to_string()
    }
}

/// Deterministic placeholder: the same title always maps to the same image,
/// different titles are likely to differ (hash-derived seed, not cryptographic).
pub fn fallback_image(topic: &str, title: &str) -> String {
    let keyword = topic_slug(topic);
    let seed = fallback_seed(title);
    format!("https://source.unsplash.com/featured/1200x800?{keyword}&sig={seed}")
}

fn topic_slug(topic: &str) -> String {
    topic.to_lowercase().replace(' ', "-")
}

fn fallback_seed(title: &str) -> u32 {
    let digest = Sha256::digest(title.as_bytes());
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]) % 1000
}
