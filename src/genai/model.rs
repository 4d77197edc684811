//! Provider response DTOs and their validation into tagged parse results.
//!
//! Provider payloads are deserialized leniently (everything optional) and
//! then validated into a tagged result, so callers pattern-match on the
//! outcome instead of relying on errors for shape mismatches.
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResp {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    pub usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ChatMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatUsage {
    pub total_tokens: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ImageGenerationResp {
    #[serde(default)]
    pub data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
pub struct ImageDatum {
    pub url: Option<String>,
}

/// Validated shape of a chat-completion response.
#[derive(Debug, PartialEq, Eq)]
pub enum ParsedCompletion {
    Text {
        content: String,
        tokens: Option<i64>,
    },
    Invalid(&'static str),
}

/// Validated shape of an image-generation response.
#[derive(Debug, PartialEq, Eq)]
pub enum ParsedImage {
    Url(String),
    Invalid(&'static str),
}

impl ChatCompletionResp {
    pub fn validate(self) -> ParsedCompletion {
        let tokens = self.usage.and_then(|u| u.total_tokens);
        let content = self
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content);
        match content {
            None => ParsedCompletion::Invalid("no completion content"),
            Some(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    ParsedCompletion::Invalid("empty completion content")
                } else {
                    ParsedCompletion::Text {
                        content: trimmed.to_string(),
                        tokens,
                    }
                }
            }
        }
    }
}

impl ImageGenerationResp {
    pub fn validate(self) -> ParsedImage {
        let url = self.data.into_iter().next().and_then(|d| d.url);
        match url {
            Some(url) if !url.trim().is_empty() => ParsedImage::Url(url),
            Some(_) => ParsedImage::Invalid("empty image url"),
            None => ParsedImage::Invalid("no image data"),
        }
    }
}
