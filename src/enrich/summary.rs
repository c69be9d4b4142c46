// src/enrich/summary.rs
//! Abstractive summary generation via OpenRouter, with a deterministic digest
//! fallback. The provider sits behind a trait; the fallback decision is an
//! explicit branch in `summarize`, never a hidden catch-all.

use async_trait::async_trait;
use metrics::counter;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "deepseek/deepseek-r1:free";

const SYSTEM_ROLE: &str =
    "You are a world-class news editor who writes engaging 60-second news digests.";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Number of context characters quoted in the fallback digest.
const FALLBACK_CONTEXT_CHARS: usize = 150;

/// Generate a summary for (title, context). `None` means the service could not
/// produce one; the caller applies the fallback. One remote call per invocation,
/// never more.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn generate(&self, title: &str, context: &str) -> Option<String>;
    fn provider_name(&self) -> &'static str;
}

pub type DynSummarizer = Arc<dyn Summarizer>;

/// Build a summarizer from the environment. Missing credentials degrade to the
/// disabled provider so every item gets the deterministic digest.
pub fn from_env() -> DynSummarizer {
    match std::env::var("OPENROUTER_API_KEY") {
        Ok(key) if !key.trim().is_empty() => Arc::new(OpenRouterSummarizer::new(key, None)),
        _ => {
            warn!("OPENROUTER_API_KEY not set; summaries will use the digest fallback");
            Arc::new(DisabledSummarizer)
        }
    }
}

/// Apply the fallback branch: a non-empty summary is guaranteed for any input.
pub async fn summarize(provider: &dyn Summarizer, title: &str, context: &str) -> String {
    match provider.generate(title, context).await {
        Some(text) => text,
        None => {
            counter!("enrich_summary_fallback_total").increment(1);
            fallback_digest(title, context)
        }
    }
}

pub struct OpenRouterSummarizer {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenRouterSummarizer {
    pub fn new(api_key: String, model_override: Option<&str>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("newsdesk-crawler/0.1 (+https://github.com/newsdesk/newsdesk-crawler)")
            .connect_timeout(Duration::from_secs(4))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client");
        let model = model_override.unwrap_or(DEFAULT_MODEL).to_string();
        Self {
            http,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl Summarizer for OpenRouterSummarizer {
    async fn generate(&self, title: &str, context: &str) -> Option<String> {
        if self.api_key.is_empty() {
            return None;
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let prompt = build_prompt(title, context);
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: SYSTEM_ROLE,
                },
                Msg {
                    role: "user",
                    content: &prompt,
                },
            ],
        };

        let resp = self
            .http
            .post(OPENROUTER_URL)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .ok()?;

        if !resp.status().is_success() {
            return None;
        }
        let body: Resp = resp.json().await.ok()?;
        let content = body.choices.first().map(|c| c.message.content.as_str())?;
        let cleaned = strip_reasoning(content).trim().to_string();
        if cleaned.is_empty() {
            None
        } else {
            Some(cleaned)
        }
    }

    fn provider_name(&self) -> &'static str {
        "openrouter"
    }
}

/// Returns `None` always; used when no credential is configured.
pub struct DisabledSummarizer;

#[async_trait]
impl Summarizer for DisabledSummarizer {
    async fn generate(&self, _title: &str, _context: &str) -> Option<String> {
        None
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Fixed-output provider for tests and local runs.
#[derive(Clone)]
pub struct FixedSummarizer {
    pub text: String,
}

#[async_trait]
impl Summarizer for FixedSummarizer {
    async fn generate(&self, _title: &str, _context: &str) -> Option<String> {
        Some(self.text.clone())
    }
    fn provider_name(&self) -> &'static str {
        "fixed"
    }
}

fn build_prompt(title: &str, context: &str) -> String {
    format!(
        "Article Title: {title}\n\
         Raw Summary: {context}\n\n\
         Task: Write a highly engaging, professional news paragraph for this story.\n\
         Requirements:\n\
         1. The content must be a single cohesive paragraph.\n\
         2. It should take about 45-60 seconds to read thoughtfully.\n\
         3. Start with a strong hook and cover the 3 most important aspects of the story.\n\
         4. Maintain a premium, executive summary tone.\n\
         5. Do NOT include any intro, outro text, or bullet points. Just the single paragraph text."
    )
}

/// Reasoning models may echo their chain of thought inside tag pairs; drop it.
pub fn strip_reasoning(s: &str) -> String {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| Regex::new(r"(?s)<thought>.*?</thought>").unwrap());
    re.replace_all(s, "").to_string()
}

/// Deterministic three-line digest; never fails, never calls out.
pub fn fallback_digest(title: &str, context: &str) -> String {
    let prefix: String = context.chars().take(FALLBACK_CONTEXT_CHARS).collect();
    format!("• {title}\n• {prefix}...\n• Read more in the full article below.")
}
