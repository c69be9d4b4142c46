// src/config.rs
//! Runtime configuration: crawl tuning from the environment plus the shared
//! JSON documents under the data directory (preferences, sources, visuals).
//! The crawler and the admin surface coordinate only through these files.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

const ENV_DATA_DIR: &str = "NEWSDESK_DATA_DIR";

/// Sentinel topic used when the preferences document yields nothing.
pub const DEFAULT_TOPIC: &str = "World";

#[derive(Clone, Copy, Debug)]
pub struct CrawlConfig {
    /// Recency window in hours; older entries are dropped.
    pub window_hours: u64,
    /// Accepted raw items per topic before enrichment (cost control).
    pub topic_cap: usize,
    /// Kept entries per source on the non-personalized path.
    pub source_cap: usize,
    /// Width of the per-item enrichment fan-out. Each item issues two outbound
    /// calls, so the effective ceiling is twice this.
    pub enrich_concurrency: usize,
    pub feed_timeout_secs: u64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            window_hours: 24,
            topic_cap: 10,
            source_cap: 5,
            enrich_concurrency: 5,
            feed_timeout_secs: 10,
        }
    }
}

impl CrawlConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            window_hours: env_parse("NEWSDESK_WINDOW_HOURS", d.window_hours),
            topic_cap: env_parse("NEWSDESK_TOPIC_CAP", d.topic_cap),
            source_cap: env_parse("NEWSDESK_SOURCE_CAP", d.source_cap),
            enrich_concurrency: env_parse("NEWSDESK_ENRICH_CONCURRENCY", d.enrich_concurrency),
            feed_timeout_secs: env_parse("NEWSDESK_FEED_TIMEOUT_SECS", d.feed_timeout_secs),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(v) => v.parse().unwrap_or_else(|_| {
            warn!(key, value = %v, "unparseable env override; using default");
            default
        }),
        Err(_) => default,
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub crawl: CrawlConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let data_dir = std::env::var(ENV_DATA_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));
        Self {
            data_dir,
            crawl: CrawlConfig::from_env(),
        }
    }

    /// Config rooted at an explicit directory with default tuning.
    pub fn with_data_dir<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            data_dir: dir.into(),
            crawl: CrawlConfig::default(),
        }
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.data_dir.join("user_preferences.json")
    }
    pub fn sources_path(&self) -> PathBuf {
        self.data_dir.join("sources.json")
    }
    pub fn visuals_path(&self) -> PathBuf {
        self.data_dir.join("visual_settings.json")
    }
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join("news_data.json")
    }

    /// Topic list from the preferences document. Absence, unreadability, or a
    /// missing key default to the sentinel topic; an explicitly empty list is
    /// honored (and the run will refuse to persist nothing).
    pub fn load_topics(&self) -> Vec<String> {
        #[derive(Deserialize)]
        struct Preferences {
            topics: Option<Vec<String>>,
        }

        let fallback = || vec![DEFAULT_TOPIC.to_string()];
        let raw = match fs::read_to_string(self.preferences_path()) {
            Ok(s) => s,
            Err(_) => return fallback(),
        };
        let prefs: Preferences = match serde_json::from_str(&raw) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "unreadable preferences document; using default topic");
                return fallback();
            }
        };
        match prefs.topics {
            Some(topics) => clean_list(topics),
            None => fallback(),
        }
    }

    /// Name → feed URL pairs in document order.
    pub fn load_sources(&self) -> Vec<(String, String)> {
        let Some(doc) = read_json_doc(&self.sources_path()) else {
            return Vec::new();
        };
        let Value::Object(map) = doc else {
            warn!("sources document is not an object; ignoring");
            return Vec::new();
        };
        map.into_iter()
            .filter_map(|(name, v)| v.as_str().map(|url| (name, url.to_string())))
            .collect()
    }
}

/// Trim entries, drop empties, and drop repeats while preserving order.
fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for it in items {
        let t = it.trim();
        if !t.is_empty() && seen.insert(t.to_string()) {
            out.push(t.to_string());
        }
    }
    out
}

pub fn read_json_doc(path: &Path) -> Option<Value> {
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}

/// Atomic document write: temp file in the target directory, then rename.
pub fn write_json_doc(path: &Path, value: &Value) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    let mut f = fs::File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
    f.write_all(json.as_bytes())?;
    fs::rename(&tmp, path).with_context(|| format!("renaming over {}", path.display()))?;
    Ok(())
}

pub fn default_visuals() -> Value {
    serde_json::json!({
        "theme": "dark",
        "layout": "grid",
        "refresh_rate": 60,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crawl_defaults() {
        let c = CrawlConfig::default();
        assert_eq!(c.window_hours, 24);
        assert_eq!(c.topic_cap, 10);
        assert_eq!(c.source_cap, 5);
        assert_eq!(c.enrich_concurrency, 5);
    }

    #[serial_test::serial]
    #[test]
    fn env_overrides_apply_and_bad_values_fall_back() {
        std::env::set_var("NEWSDESK_TOPIC_CAP", "3");
        std::env::set_var("NEWSDESK_WINDOW_HOURS", "not-a-number");
        let c = CrawlConfig::from_env();
        assert_eq!(c.topic_cap, 3);
        assert_eq!(c.window_hours, 24);
        std::env::remove_var("NEWSDESK_TOPIC_CAP");
        std::env::remove_var("NEWSDESK_WINDOW_HOURS");
    }

    #[test]
    fn topics_default_when_document_is_missing_or_broken() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = AppConfig::with_data_dir(tmp.path());
        assert_eq!(cfg.load_topics(), vec!["World".to_string()]);

        std::fs::write(cfg.preferences_path(), "{ not json").unwrap();
        assert_eq!(cfg.load_topics(), vec!["World".to_string()]);

        std::fs::write(cfg.preferences_path(), r#"{"topics": [" Tech ", "", "Tech"]}"#).unwrap();
        assert_eq!(cfg.load_topics(), vec!["Tech".to_string()]);
    }

    #[test]
    fn sources_round_trip_in_document_order() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = AppConfig::with_data_dir(tmp.path());
        let doc = serde_json::json!({
            "BBC": "https://feeds.bbci.co.uk/news/rss.xml",
            "AP": "https://example.test/ap.rss",
        });
        write_json_doc(&cfg.sources_path(), &doc).unwrap();
        let srcs = cfg.load_sources();
        assert_eq!(srcs.len(), 2);
        assert_eq!(srcs[0].0, "BBC");
        assert_eq!(srcs[1].0, "AP");
    }
}
