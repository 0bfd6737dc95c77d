//! Language-model seam.
//!
//! Everything in this crate talks to the model through [`LanguageModel`], so
//! tests can replay canned responses. [`AnthropicClient`] is the production
//! implementation over the Anthropic messages API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AiError, Result};

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Text of the first content block
    pub text: String,
    pub model: String,
    pub usage: Option<TokenUsage>,
}

/// A single-turn text completion
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// `operation` names the caller in error messages ("categorization", ...)
    async fn complete(
        &self,
        operation: &'static str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<Completion>;

    /// Model name recorded in request logs
    fn model(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl AnthropicClient {
    /// Fails with [`AiError::MissingApiKey`] if `api_key` is blank
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AiError::MissingApiKey);
        }
        Ok(Self {
            http: reqwest::Client::new(),
            api_key: api_key.trim().to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Msg<'a>>,
}

#[derive(Deserialize)]
struct Resp {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl LanguageModel for AnthropicClient {
    async fn complete(
        &self,
        operation: &'static str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<Completion> {
        let body = Req {
            model: &self.model,
            max_tokens,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
        };

        tracing::debug!(
            operation,
            model = %self.model,
            max_tokens,
            prompt_chars = prompt.len(),
            "anthropic request"
        );
        let resp = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AiError::Api {
                operation,
                status: status.as_u16(),
                body,
            });
        }

        let out: Resp = resp.json().await?;
        let text = out
            .content
            .into_iter()
            .next()
            .and_then(|b| b.text)
            .unwrap_or_default();
        Ok(Completion {
            text,
            model: out.model.unwrap_or_else(|| self.model.clone()),
            usage: out.usage,
        })
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_key_is_missing() {
        assert!(matches!(AnthropicClient::new("  "), Err(AiError::MissingApiKey)));
        let c = AnthropicClient::new("sk-ant-x").unwrap().with_base_url("http://localhost:9/");
        assert_eq!(c.base_url, "http://localhost:9");
        assert_eq!(c.model(), DEFAULT_MODEL);
    }
}
