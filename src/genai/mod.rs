use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::{Client, Url};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use tracing::warn;

use crate::config::OpenAi;
use crate::genai::model::{
    ChatCompletionResp, ImageGenerationResp, ParsedCompletion, ParsedImage,
};
use crate::model::{Language, Tier, UsageRecord};
use crate::usage::UsageLog;

pub mod model;

const OPENAI_API_BASE: &str = "https://api.openai.com/";
const SERVICE: &str = "openai";
const OP_TEXT: &str = "chat.completion";
const OP_IMAGE: &str = "image.generation";

/// Text generated by the provider, with token usage when reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedText {
    pub text: String,
    pub tokens: Option<i64>,
}

/// Seam for the external generative service. The orchestration layers only
/// see this trait; tests substitute a recording fake.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate_text(&self, tier: Tier, language: Language) -> Result<GeneratedText>;

    async fn generate_image(&self, text: &str, tier: Tier, language: Language) -> Result<String>;
}

#[derive(Clone)]
pub struct GenAiClient {
    http: Client,
    base_url: Url,
    api_key: String,
    text_model: String,
    image_model: String,
    max_retries: u32,
    base_delay_ms: u64,
    usage: UsageLog,
}

impl fmt::Debug for GenAiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenAiClient")
            .field("base_url", &self.base_url)
            .field("text_model", &self.text_model)
            .field("image_model", &self.image_model)
            .finish_non_exhaustive()
    }
}

impl GenAiClient {
    pub fn from_config(cfg: &OpenAi, usage: UsageLog) -> Self {
        let base_url = Url::parse(OPENAI_API_BASE).expect("valid default OpenAI URL");
        Self::with_base_url(cfg, usage, base_url)
    }

    pub fn with_base_url(cfg: &OpenAi, usage: UsageLog, base_url: Url) -> Self {
        let http = Client::builder()
            .user_agent("musebot/0.1")
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url,
            api_key: cfg.api_key.clone(),
            text_model: cfg.text_model.clone(),
            image_model: cfg.image_model.clone(),
            max_retries: cfg.max_retries,
            base_delay_ms: cfg.base_delay_ms,
            usage,
        }
    }

    /// Backoff before retry `n` (0-based): base, 2x base, 4x base, ...
    fn backoff_delay(&self, retry: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms << retry)
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let endpoint = self.base_url.join(path).context("invalid API base URL")?;
        let res = self
            .http
            .post(endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await
            .context("failed to reach generation provider")?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("provider error {}: {}", status, body));
        }
        res.json::<Value>()
            .await
            .context("invalid provider response JSON")
    }

    async fn attempt_text(&self, tier: Tier, language: Language) -> Result<GeneratedText> {
        let body = build_text_request(&self.text_model, tier, language);
        let raw = self.post_json("v1/chat/completions", &body).await?;
        let resp: ChatCompletionResp =
            serde_json::from_value(raw).context("unexpected completion schema")?;
        match resp.validate() {
            ParsedCompletion::Text { content, tokens } => Ok(GeneratedText {
                text: content,
                tokens,
            }),
            ParsedCompletion::Invalid(reason) => Err(anyhow!("invalid completion: {}", reason)),
        }
    }

    async fn attempt_image(&self, text: &str, tier: Tier) -> Result<String> {
        let body = build_image_request(&self.image_model, text, tier);
        let raw = self.post_json("v1/images/generations", &body).await?;
        let resp: ImageGenerationResp =
            serde_json::from_value(raw).context("unexpected image schema")?;
        match resp.validate() {
            ParsedImage::Url(url) => Ok(url),
            ParsedImage::Invalid(reason) => Err(anyhow!("invalid image response: {}", reason)),
        }
    }

    fn report(&self, operation: &'static str, tokens: Option<i64>, images: Option<i64>, result: &Result<()>) {
        self.usage.record_api(UsageRecord {
            service: SERVICE,
            operation,
            tokens,
            images,
            success: result.is_ok(),
            error: result.as_ref().err().map(|e| format!("{e:#}")),
        });
    }
}

#[async_trait]
impl GenerationBackend for GenAiClient {
    async fn generate_text(&self, tier: Tier, language: Language) -> Result<GeneratedText> {
        let mut last_err = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(self.backoff_delay(attempt - 1)).await;
            }
            match self.attempt_text(tier, language).await {
                Ok(generated) => {
                    self.report(OP_TEXT, generated.tokens, None, &Ok(()));
                    return Ok(generated);
                }
                Err(err) => {
                    warn!(?err, attempt, %tier, %language, "text generation attempt failed");
                    self.report(OP_TEXT, None, None, &Err(anyhow!("{err:#}")));
                    last_err = Some(err);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow!("text generation failed")))
    }

    async fn generate_image(&self, text: &str, tier: Tier, language: Language) -> Result<String> {
        let mut last_err = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(self.backoff_delay(attempt - 1)).await;
            }
            match self.attempt_image(text, tier).await {
                Ok(url) => {
                    self.report(OP_IMAGE, None, Some(1), &Ok(()));
                    return Ok(url);
                }
                Err(err) => {
                    warn!(?err, attempt, %tier, %language, "image generation attempt failed");
                    self.report(OP_IMAGE, None, None, &Err(anyhow!("{err:#}")));
                    last_err = Some(err);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow!("image generation failed")))
    }
}

/// Fixed complexity descriptor per tier, interpolated into the text request.
fn complexity_descriptor(tier: Tier) -> &'static str {
    match tier {
        Tier::Beginner => "a simple single-subject exercise that practices one foundational skill",
        Tier::Intermediate => {
            "a moderately challenging composition combining two or three techniques"
        }
        Tier::Advanced => {
            "a complex multi-element scene demanding deliberate composition and lighting"
        }
    }
}

fn language_directive(language: Language) -> &'static str {
    match language {
        Language::En => "Write the prompt in English.",
        Language::Ro => "Write the prompt in Romanian.",
    }
}

/// Style descriptor appended to the image keywords per tier.
fn style_descriptor(tier: Tier) -> &'static str {
    match tier {
        Tier::Beginner => "simple line art, clean shapes",
        Tier::Intermediate => "detailed pencil sketch, balanced composition",
        Tier::Advanced => "dramatic lighting, intricate detail",
    }
}

pub fn build_text_request(model: &str, tier: Tier, language: Language) -> Value {
    json!({
        "model": model,
        "messages": [
            {
                "role": "system",
                "content": "You are a drawing coach. Reply with exactly one short drawing prompt, no preamble."
            },
            {
                "role": "user",
                "content": format!(
                    "Compose today's drawing prompt: {}. {}",
                    complexity_descriptor(tier),
                    language_directive(language)
                )
            }
        ]
    })
}

pub fn build_image_request(model: &str, text: &str, tier: Tier) -> Value {
    let mut parts = image_keywords(text);
    parts.push(style_descriptor(tier).to_string());
    json!({
        "model": model,
        "prompt": parts.join(", "),
        "n": 1,
        "size": "1024x1024"
    })
}

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "the", "and", "or", "of", "in", "on", "at", "to", "with", "for", "from", "by",
        "is", "are", "be", "it", "its", "that", "this", "your", "you", "one", "using", "into",
    ]
    .into_iter()
    .collect()
});

/// Compact keyword set for the image prompt: lowercase, punctuation stripped,
/// stop words removed, first 10 distinct tokens in order of appearance.
pub fn image_keywords(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut keywords = Vec::new();
    for raw in text.split_whitespace() {
        let token: String = raw
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        if token.is_empty() || STOP_WORDS.contains(token.as_str()) {
            continue;
        }
        if seen.insert(token.clone()) {
            keywords.push(token);
            if keywords.len() == 10 {
                break;
            }
        }
    }
    keywords
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_strip_punctuation_and_stop_words() {
        let kw = image_keywords("Draw a quiet harbor at dawn, with three small boats.");
        assert_eq!(
            kw,
            vec!["draw", "quiet", "harbor", "dawn", "three", "small", "boats"]
        );
    }

    #[test]
    fn keywords_are_distinct_and_capped_at_ten() {
        let kw = image_keywords(
            "fox fox river river stone moss fern owl pine cloud lake hill valley ridge",
        );
        assert_eq!(kw.len(), 10);
        assert_eq!(kw[0], "fox");
        assert_eq!(kw[1], "river");
        assert!(!kw.contains(&"valley".to_string()));
    }

    #[test]
    fn text_request_varies_by_tier_and_language() {
        let body = build_text_request("gpt-4o-mini", Tier::Advanced, Language::Ro);
        assert_eq!(body["model"], "gpt-4o-mini");
        let user = body["messages"][1]["content"].as_str().unwrap();
        assert!(user.contains("complex multi-element scene"));
        assert!(user.contains("Romanian"));
    }

    #[test]
    fn image_request_appends_style_descriptor() {
        let body = build_image_request("dall-e-3", "Draw a quiet harbor at dawn.", Tier::Beginner);
        let prompt = body["prompt"].as_str().unwrap();
        assert!(prompt.starts_with("draw, quiet, harbor, dawn"));
        assert!(prompt.ends_with("simple line art, clean shapes"));
        assert_eq!(body["n"], 1);
    }

    #[test]
    fn backoff_doubles_from_base() {
        let cfg = OpenAi {
            api_key: "k".into(),
            text_model: "t".into(),
            image_model: "i".into(),
            max_retries: 3,
            base_delay_ms: 1000,
        };
        let (usage, _rx) = UsageLog::channel();
        let client = GenAiClient::from_config(&cfg, usage);
        assert_eq!(client.backoff_delay(0), Duration::from_millis(1000));
        assert_eq!(client.backoff_delay(1), Duration::from_millis(2000));
        assert_eq!(client.backoff_delay(2), Duration::from_millis(4000));
    }
}
